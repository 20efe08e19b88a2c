// Production image describer: CLIP picks a template, GPT-2 elaborates on it.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use super::clip::ClipMatcher;
use super::gpt2::{GenerationParams, Gpt2Generator};
use super::ImageDescriber;
use crate::download::{clip_model_dir, gpt2_model_dir};

pub struct LocalImageDescriber {
    clip: Arc<ClipMatcher>,
    gpt2: Arc<Gpt2Generator>,
    params: GenerationParams,
}

impl LocalImageDescriber {
    /// Load CLIP and GPT-2 from their subdirectories of `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        Ok(Self {
            clip: Arc::new(ClipMatcher::load(&clip_model_dir(model_dir))?),
            gpt2: Arc::new(Gpt2Generator::load(&gpt2_model_dir(model_dir))?),
            params: GenerationParams::default(),
        })
    }
}

/// Seed text handed to GPT-2 for a matched template.
pub fn generation_prompt(template: &str) -> String {
    format!("Describe the image in detail: {template}")
}

#[async_trait]
impl ImageDescriber for LocalImageDescriber {
    async fn describe_image(&self, path: &Path) -> Result<String> {
        let clip = Arc::clone(&self.clip);
        let gpt2 = Arc::clone(&self.gpt2);
        let params = self.params;
        let path = path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let template = clip.best_template(&path)?;
            debug!(template, "Generating image description");
            gpt2.generate(&generation_prompt(template), &params, &mut rand::rng())
        })
        .await
        .context("spawn_blocking panicked")?
    }
}
