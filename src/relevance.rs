//! Post-hoc check that an answer addresses the request.

use crate::config::Prompts;
use crate::model::ModelBackend;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Asks the model whether a response addresses a request.
pub struct RelevanceValidator {
    backend: Arc<dyn ModelBackend>,
    prompts: Arc<Prompts>,
}

impl RelevanceValidator {
    pub fn new(backend: Arc<dyn ModelBackend>, prompts: Arc<Prompts>) -> Self {
        Self { backend, prompts }
    }

    /// Whether `response` answers `request`.
    ///
    /// A backend failure counts as "not relevant".
    pub async fn is_relevant(&self, request: &str, response: &str) -> bool {
        let mut vars = HashMap::new();
        vars.insert("request".to_string(), request.to_string());
        vars.insert("response".to_string(), response.to_string());
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.relevance.judge, &vars);

        match self.backend.complete(&prompt).await {
            Ok(verdict) => {
                debug!("Relevance verdict: {}", verdict.trim());
                interpret_verdict(&verdict)
            }
            Err(e) => {
                warn!("Relevance check failed: {}", e);
                false
            }
        }
    }
}

/// A verdict is positive iff it mentions "yes", in any case.
pub fn interpret_verdict(verdict: &str) -> bool {
    verdict.to_lowercase().contains("yes")
}
