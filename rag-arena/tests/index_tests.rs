//! Integration tests for the embedding index.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use common::{FailingEmbedder, HashEmbedder, quick_retry};
use proptest::prelude::*;
use rag_arena::{
    ChunkRecord, Document, EmbeddingConfig, EmbeddingIndex, EmbeddingProvider, IndexSnapshot,
    RagError, Record, Result, RetryConfig, Segmenter, SnapshotEntry,
};

fn chunk(i: usize, text: &str) -> Record {
    Record::Chunk(ChunkRecord {
        text: text.to_string(),
        source: "doc.txt".into(),
        char_offset: i,
        chunk_index: i,
    })
}

/// Generate a non-zero embedding of the given dimension.
fn arb_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim)
        .prop_filter("non-zero embedding", |v| v.iter().any(|x| x.abs() > 1e-4))
}

/// **Search ordering**
/// *For any* stored vectors, a search returns at most `k` hits in
/// non-increasing score order with ranks `0..len`.
mod prop_search_ordering {
    use super::*;

    const DIM: usize = 8;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_k(
            vectors in proptest::collection::vec(arb_embedding(DIM), 1..20),
            query in arb_embedding(DIM),
            k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let count = vectors.len();
            let hits = rt.block_on(async {
                let index = EmbeddingIndex::new(EmbeddingConfig::default(), RetryConfig::default());
                let entries = vectors
                    .into_iter()
                    .enumerate()
                    .map(|(i, vector)| SnapshotEntry { record: chunk(i, &format!("c{i}")), vector })
                    .collect();
                index.restore(IndexSnapshot { dimensions: None, entries }).await.unwrap();
                index.search_by_vector(&query, k).await.unwrap()
            });

            prop_assert_eq!(hits.len(), k.min(count));
            for pair in hits.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
            for (rank, hit) in hits.iter().enumerate() {
                prop_assert_eq!(hit.retrieval_rank, rank);
            }
        }
    }
}

#[tokio::test]
async fn readding_records_replaces_them_in_place() {
    let doc = Document::new(
        "call.txt",
        "Revenue growth was approximately 15%. Margins held. Our team shipped products.",
    );
    let records: Vec<Record> =
        Segmenter::new(1).records(&doc).into_iter().map(Record::from).collect();
    let embedder = HashEmbedder::default();
    let index = EmbeddingIndex::new(EmbeddingConfig::default(), RetryConfig::default());

    let first = index.add(records.clone(), &embedder).await.unwrap();
    assert_eq!((first.inserted, first.replaced), (3, 0));
    let before = index.search("revenue growth", 3, &embedder).await.unwrap();

    let second = index.add(records, &embedder).await.unwrap();
    assert_eq!((second.inserted, second.replaced), (0, 3));
    assert_eq!(index.len().await, 3);
    let after = index.search("revenue growth", 3, &embedder).await.unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn oversized_k_returns_every_record() {
    let embedder = HashEmbedder::default();
    let index = EmbeddingIndex::new(EmbeddingConfig::default(), RetryConfig::default());
    index.add(vec![chunk(0, "alpha"), chunk(1, "beta")], &embedder).await.unwrap();
    assert_eq!(index.search("alpha", 100, &embedder).await.unwrap().len(), 2);
}

#[tokio::test]
async fn searching_an_empty_index_returns_nothing() {
    let embedder = HashEmbedder::default();
    let index = EmbeddingIndex::new(EmbeddingConfig::default(), RetryConfig::default());
    assert!(index.search("anything", 3, &embedder).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn failing_embedder_leaves_the_index_untouched() {
    let embedder = FailingEmbedder::default();
    let index = EmbeddingIndex::new(EmbeddingConfig::default(), quick_retry(3));

    let err = index.add(vec![chunk(0, "alpha")], &embedder).await.unwrap_err();
    assert!(matches!(err, RagError::EmbeddingUnavailable { attempts: 3, .. }));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 3);
    assert!(index.is_empty().await);
    assert_eq!(index.dimensions().await, None);
}

/// Embeds `"{i}"` as the one-hot vector `e_i`, sleeping longer for smaller
/// `i` so batches finish in reverse order. Fails on `fail_on`.
struct StaggeredEmbedder {
    width: usize,
    fail_on: Option<usize>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl StaggeredEmbedder {
    fn new(width: usize, fail_on: Option<usize>) -> Self {
        Self { width, fail_on, in_flight: AtomicUsize::new(0), peak: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl EmbeddingProvider for StaggeredEmbedder {
    fn name(&self) -> &str {
        "staggered"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let i: usize = text.parse().unwrap();
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(((self.width - i) * 10) as u64)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on == Some(i) {
            return Err(RagError::EmbeddingError {
                provider: "staggered".into(),
                message: "boom".into(),
            });
        }
        let mut vector = vec![0.0; self.width];
        vector[i] = 1.0;
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.width
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_batches_keep_input_order() {
    let width = 8;
    let embedder = StaggeredEmbedder::new(width, None);
    let index =
        EmbeddingIndex::new(EmbeddingConfig { batch_size: 1, concurrency: 4 }, quick_retry(1));
    let records: Vec<Record> = (0..width).map(|i| chunk(i, &i.to_string())).collect();

    index.add(records, &embedder).await.unwrap();

    let snapshot = index.snapshot().await;
    for (i, entry) in snapshot.entries.iter().enumerate() {
        assert_eq!(entry.record.embedding_text(), i.to_string());
        assert_eq!(entry.vector[i], 1.0);
    }
    assert!(embedder.peak.load(Ordering::SeqCst) <= 4);
    assert!(embedder.peak.load(Ordering::SeqCst) > 1);
}

#[tokio::test(start_paused = true)]
async fn one_failing_batch_commits_nothing() {
    let width = 6;
    let embedder = StaggeredEmbedder::new(width, Some(4));
    let index =
        EmbeddingIndex::new(EmbeddingConfig { batch_size: 2, concurrency: 2 }, quick_retry(2));
    let records: Vec<Record> = (0..width).map(|i| chunk(i, &i.to_string())).collect();

    let err = index.add(records, &embedder).await.unwrap_err();
    assert_eq!(err.attempts(), Some(2));
    assert!(index.is_empty().await);
}

#[tokio::test]
async fn snapshot_restores_without_re_embedding() {
    let embedder = HashEmbedder::default();
    let index = EmbeddingIndex::new(EmbeddingConfig::default(), RetryConfig::default());
    index.add(vec![chunk(0, "revenue grew"), chunk(1, "margins held")], &embedder).await.unwrap();

    let path = std::env::temp_dir().join(format!("rag-arena-index-{}.json", std::process::id()));
    index.snapshot().await.save(&path).await.unwrap();
    let loaded = IndexSnapshot::load(&path).await.unwrap();
    tokio::fs::remove_file(&path).await.unwrap();

    let restored = EmbeddingIndex::new(EmbeddingConfig::default(), RetryConfig::default());
    restored.restore(loaded).await.unwrap();
    let batches_before = embedder.batch_calls.load(Ordering::SeqCst);

    let hits = restored.search("revenue", 1, &embedder).await.unwrap();
    assert_eq!(hits[0].record.embedding_text(), "revenue grew");
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), batches_before);
}

#[tokio::test]
async fn corrupt_snapshot_files_are_reported() {
    let path = std::env::temp_dir().join(format!("rag-arena-corrupt-{}.json", std::process::id()));
    tokio::fs::write(&path, b"{not json").await.unwrap();
    let err = IndexSnapshot::load(&path).await.unwrap_err();
    tokio::fs::remove_file(&path).await.unwrap();
    assert!(matches!(err, RagError::Snapshot(_)));
}
