// Multimodal context — turns an optional uploaded image into prompt text.
//
// clip      — picks the description template closest to the image (CLIP)
// gpt2      — elaborates the chosen template into free text (GPT-2)
// describer — the production ImageDescriber wiring the two together
//
// Failures never escape `describe`: a broken image or model error becomes a
// `Failed` context, which still renders into the prompt.

pub mod clip;
pub mod describer;
pub mod gpt2;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

pub use describer::LocalImageDescriber;

/// Prompt text used when the request carries no image.
pub const NO_IMAGE: &str = "No image provided.";

/// What the image contributed to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultimodalContext {
    NoImage,
    Described(String),
    Failed(String),
}

impl MultimodalContext {
    /// The text spliced into completion prompts and returned to clients.
    pub fn prompt_text(&self) -> String {
        match self {
            MultimodalContext::NoImage => NO_IMAGE.to_string(),
            MultimodalContext::Described(text) => text.clone(),
            MultimodalContext::Failed(reason) => format!("Error processing image: {reason}"),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MultimodalContext::Failed(_))
    }
}

/// Produces descriptive context for an image.
///
/// Implementors provide `describe_image`; `describe` handles the missing-image
/// and failure cases so callers always get a usable context.
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    async fn describe_image(&self, path: &Path) -> Result<String>;

    async fn describe(&self, image: Option<&Path>) -> MultimodalContext {
        let Some(path) = image else {
            return MultimodalContext::NoImage;
        };
        match self.describe_image(path).await {
            Ok(text) => MultimodalContext::Described(text),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Image description failed");
                MultimodalContext::Failed(format!("{e:#}"))
            }
        }
    }
}
