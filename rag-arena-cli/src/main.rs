//! rag-arena: ask one question of a naive and an advanced RAG pipeline.

mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rag_arena::cohere::CohereRerankProvider;
use rag_arena::openai::{OpenAIEmbeddingProvider, OpenAIGenerationProvider};
use rag_arena::{
    Arena, ArenaConfig, Document, FixedWidthChunker, IndexSnapshot, PromptTemplate, Providers,
    RerankProvider, Retriever, Segmenter, load_documents,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Compare fixed-width chunk retrieval with sentence-window retrieval and reranking
#[derive(Parser, Debug)]
#[command(name = "rag-arena", version, about, long_about = None)]
struct Cli {
    /// JSON configuration file; missing fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory of `*.txt` documents to index
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory for index snapshots; indexes are reused when present
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Re-embed documents even if a snapshot exists
    #[arg(long)]
    reindex: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// OpenAI API key for embeddings and generation
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    /// Cohere API key for reranking; without it reranking is skipped
    #[arg(long, env = "COHERE_API_KEY", hide_env_values = true)]
    cohere_api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Answer a question with both retrievers
    Compare {
        /// The question to ask
        question: String,
    },
    /// Answer a question with one retriever
    Ask {
        /// Which retriever to use
        #[arg(short, long, value_enum, default_value_t = RetrieverArg::Advanced)]
        retriever: RetrieverArg,
        /// The question to ask
        question: String,
    },
    /// Show how a document is chunked and windowed, without any API calls
    Inspect {
        /// Text file to inspect
        file: PathBuf,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum RetrieverArg {
    Naive,
    Advanced,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).await?;

    match &cli.command {
        Command::Inspect { file } => inspect(&config, file).await,
        Command::Compare { question } => {
            let arena = build_arena(&cli, &config)?;
            let documents = load_documents(&cli.data_dir).await?;
            prepare(arena.naive(), &documents, &cli).await?;
            prepare(arena.advanced(), &documents, &cli).await?;

            let comparison = arena.compare(question).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&comparison)?);
            } else {
                report::print_comparison(&comparison);
            }
            Ok(())
        }
        Command::Ask { retriever, question } => {
            let arena = build_arena(&cli, &config)?;
            let retriever: &dyn Retriever = match retriever {
                RetrieverArg::Naive => arena.naive(),
                RetrieverArg::Advanced => arena.advanced(),
            };
            let documents = load_documents(&cli.data_dir).await?;
            prepare(retriever, &documents, &cli).await?;

            let answer = retriever.answer(question).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&answer)?);
            } else {
                report::print_answer(&answer);
            }
            Ok(())
        }
    }
}

async fn load_config(path: Option<&Path>) -> Result<ArenaConfig> {
    let Some(path) = path else {
        return Ok(ArenaConfig::default());
    };
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading config {}", path.display()))?;
    let config: ArenaConfig =
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    config.validate()?;
    info!(path = %path.display(), "loaded configuration");
    Ok(config)
}

fn build_arena(cli: &Cli, config: &ArenaConfig) -> Result<Arena> {
    let openai_key = cli
        .openai_api_key
        .clone()
        .context("an OpenAI API key is required (--openai-api-key or OPENAI_API_KEY)")?;

    let reranker: Option<Arc<dyn RerankProvider>> = match &cli.cohere_api_key {
        Some(key) => Some(Arc::new(CohereRerankProvider::new(key.clone())?)),
        None => {
            warn!("no Cohere API key configured, advanced retrieval will skip reranking");
            None
        }
    };

    let providers = Providers {
        embedder: Arc::new(OpenAIEmbeddingProvider::new(openai_key.clone())?),
        reranker,
        naive_generator: Arc::new(
            OpenAIGenerationProvider::new(openai_key.clone())?.with_template(PromptTemplate::Naive),
        ),
        advanced_generator: Arc::new(
            OpenAIGenerationProvider::new(openai_key)?.with_template(PromptTemplate::Advanced),
        ),
    };
    Ok(Arena::new(config, providers)?)
}

/// Restore `retriever` from the snapshot cache, or index `documents` and
/// refresh the cache.
async fn prepare(retriever: &dyn Retriever, documents: &[Document], cli: &Cli) -> Result<()> {
    let Some(dir) = &cli.cache_dir else {
        retriever.index_documents(documents).await?;
        return Ok(());
    };
    let path = dir.join(format!("{}.json", retriever.kind()));

    if !cli.reindex && tokio::fs::try_exists(&path).await.unwrap_or(false) {
        retriever.restore(IndexSnapshot::load(&path).await?).await?;
        info!(retriever = %retriever.kind(), path = %path.display(), "restored index snapshot");
        return Ok(());
    }

    retriever.index_documents(documents).await?;
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating cache directory {}", dir.display()))?;
    retriever.snapshot().await.save(&path).await?;
    info!(retriever = %retriever.kind(), path = %path.display(), "saved index snapshot");
    Ok(())
}

async fn inspect(config: &ArenaConfig, file: &Path) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let source = file.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let document = Document::new(source, text);

    let chunker = FixedWidthChunker::new(config.naive.chunk_size, config.naive.chunk_overlap)?;
    let chunks = chunker.chunk(&document);
    let sentences = Segmenter::new(config.advanced.window_radius).records(&document);
    report::print_inspection(&document, config, &chunks, &sentences);
    Ok(())
}
