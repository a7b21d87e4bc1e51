//! The answer-generation boundary and its prompt templates.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::RetryConfig;
use crate::error::{Result, Stage};
use crate::retry::RetryPolicy;

/// An external language model that answers a question from assembled context.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Short name used in errors and logs.
    fn name(&self) -> &str;

    /// Produce an answer to `query` grounded in `context`.
    async fn generate(&self, context: &str, query: &str) -> Result<String>;
}

/// Instruction set used to turn context and question into a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptTemplate {
    /// Plain grounded answering.
    #[default]
    Naive,
    /// Also asks the model to reconcile discrepancies between sources.
    Advanced,
}

impl PromptTemplate {
    /// System message sent alongside the prompt.
    pub const SYSTEM: &'static str = "You are a helpful financial analyst assistant.";

    /// Render the user prompt.
    pub fn render(self, context: &str, query: &str) -> String {
        let instructions = match self {
            PromptTemplate::Naive => {
                "- Provide a clear, accurate answer based on the context\n\
                 - Cite specific sources when referencing information\n\
                 - If the context doesn't contain enough information to fully answer, say so\n\
                 - Be precise with numbers and facts"
            }
            PromptTemplate::Advanced => {
                "- Provide a clear, accurate answer based on the context\n\
                 - Cite specific sources when referencing information\n\
                 - If you notice any discrepancies or nuances between sources, explain them\n\
                 - Be precise with numbers and facts\n\
                 - If the context doesn't contain enough information, say so"
            }
        };
        format!(
            "You are a financial analyst assistant. Answer the user's question based on the \
             provided context.\n\nContext:\n{context}\n\nUser Question: {query}\n\n\
             Instructions:\n{instructions}\n\nAnswer:"
        )
    }
}

/// Calls a [`GenerationProvider`] once, under the per-call timeout.
///
/// Generation is not retried: a failure surfaces as
/// [`RagError::GenerationUnavailable`](crate::RagError::GenerationUnavailable).
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn GenerationProvider>,
    policy: RetryPolicy,
}

impl Generator {
    /// Wrap a provider; only `retry.timeout_ms` is used.
    pub fn new(provider: Arc<dyn GenerationProvider>, retry: RetryConfig) -> Self {
        Self { provider, policy: RetryPolicy::new(retry, Stage::Generation) }
    }

    /// Generate an answer.
    pub async fn generate(&self, context: &str, query: &str) -> Result<String> {
        self.policy.run_once(self.provider.generate(context, query)).await.map_err(|e| {
            error!(provider = self.provider.name(), error = %e, "generation failed");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advanced_prompt_asks_for_discrepancies() {
        let prompt = PromptTemplate::Advanced.render("Source: a.txt\nRevenue grew.", "Growth?");
        assert!(prompt.contains("Context:\nSource: a.txt\nRevenue grew."));
        assert!(prompt.contains("User Question: Growth?"));
        assert!(prompt.contains("discrepancies"));
        assert!(prompt.ends_with("Answer:"));
        assert!(!PromptTemplate::Naive.render("", "").contains("discrepancies"));
    }
}
