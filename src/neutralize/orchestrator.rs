// Neutralization orchestrator.
//
// Gathers multimodal context, renders the prompt, and asks the completion
// model for a rewrite or an explanation. A failed completion becomes a
// degraded outcome instead of an error; the handler decides how to show it.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use super::completion::CompletionClient;
use super::prompt::{explain_prompt, rewrite_prompt, BiasLevel, SYSTEM_MESSAGE};
use super::tier::{ModelTier, TierModels};
use crate::multimodal::{ImageDescriber, MultimodalContext};

/// Result of one completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    Generated(String),
    /// The remote call failed; carries the reason.
    Degraded(String),
}

impl CompletionOutcome {
    pub fn text(&self) -> &str {
        match self {
            CompletionOutcome::Generated(text) | CompletionOutcome::Degraded(text) => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, CompletionOutcome::Degraded(_))
    }
}

/// A rewrite or explanation together with what went into it.
#[derive(Debug, Clone)]
pub struct Neutralization {
    pub outcome: CompletionOutcome,
    pub context: MultimodalContext,
    pub model: String,
}

#[derive(Debug, Clone, Copy)]
enum Task {
    Rewrite,
    Explain,
}

pub struct Neutralizer {
    completion: Arc<dyn CompletionClient>,
    describer: Arc<dyn ImageDescriber>,
    models: TierModels,
}

impl Neutralizer {
    pub fn new(
        completion: Arc<dyn CompletionClient>,
        describer: Arc<dyn ImageDescriber>,
        models: TierModels,
    ) -> Self {
        Self {
            completion,
            describer,
            models,
        }
    }

    /// Rewrite `text` in a neutral voice.
    pub async fn rewrite(
        &self,
        text: &str,
        level: BiasLevel<'_>,
        image: Option<&Path>,
        tier: ModelTier,
    ) -> Neutralization {
        self.run(Task::Rewrite, text, level, image, tier).await
    }

    /// Explain why `text` is biased and how to read it.
    pub async fn explain(
        &self,
        text: &str,
        level: BiasLevel<'_>,
        image: Option<&Path>,
        tier: ModelTier,
    ) -> Neutralization {
        self.run(Task::Explain, text, level, image, tier).await
    }

    async fn run(
        &self,
        task: Task,
        text: &str,
        level: BiasLevel<'_>,
        image: Option<&Path>,
        tier: ModelTier,
    ) -> Neutralization {
        let context = self.describer.describe(image).await;
        let context_text = context.prompt_text();
        let prompt = match task {
            Task::Rewrite => rewrite_prompt(text, level, &context_text),
            Task::Explain => explain_prompt(text, level, &context_text),
        };

        let model = self.models.model_for(tier).to_string();
        let outcome = match self.completion.complete(&model, SYSTEM_MESSAGE, &prompt).await {
            Ok(reply) => {
                info!(?task, model = %model, ?tier, "Completion succeeded");
                CompletionOutcome::Generated(reply)
            }
            Err(e) => {
                warn!(?task, model = %model, error = %e, "Completion failed, returning degraded result");
                CompletionOutcome::Degraded(format!("{e:#}"))
            }
        };

        Neutralization {
            outcome,
            context,
            model,
        }
    }
}
