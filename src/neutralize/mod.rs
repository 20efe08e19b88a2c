// Neutralization — prompt building, tier choice and the remote completion call.

pub mod completion;
pub mod orchestrator;
pub mod prompt;
pub mod tier;

pub use completion::{CompletionClient, OpenAiClient};
pub use orchestrator::{CompletionOutcome, Neutralization, Neutralizer};
pub use prompt::BiasLevel;
pub use tier::{ModelTier, TierModels, CENTER_THRESHOLD};
