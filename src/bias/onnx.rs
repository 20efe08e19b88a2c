// Local ONNX bias classifier (political-bias BERT, Left / Center / Right).
//
// Runs entirely on the local CPU. Inputs longer than MAX_TOKENS are
// truncated by the tokenizer; the three output logits go through softmax.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::traits::{BiasClassifier, BiasDistribution};
use crate::output::truncate_chars;

/// BERT's positional limit.
pub const MAX_TOKENS: usize = 512;

/// Holds the model session and tokenizer behind Arc so inference can be
/// offloaded to spawn_blocking without blocking the async runtime.
pub struct OnnxBiasClassifier {
    // ort::Session::run takes &mut self, hence the Mutex.
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxBiasClassifier {
    /// Load the ONNX model and tokenizer from the given directory.
    ///
    /// Expects `model.onnx` and `tokenizer.json` to exist in `model_dir`.
    /// Call `download::download_models()` first if they don't.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            anyhow::bail!(
                "Bias model not found: {}\nRun `neutralizer download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Bias tokenizer not found: {}\nRun `neutralizer download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        debug!("Loaded ONNX bias model from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl BiasClassifier for OnnxBiasClassifier {
    async fn classify(&self, text: &str) -> Result<BiasDistribution> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || classify_sync(&session, &tokenizer, &text))
            .await
            .context("spawn_blocking panicked")?
    }
}

/// Tokenize, run one forward pass, softmax the logits.
fn classify_sync(
    session: &Arc<Mutex<Session>>,
    tokenizer: &Arc<Tokenizer>,
    text: &str,
) -> Result<BiasDistribution> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

    let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
    let mask: Vec<i64> = encoding
        .get_attention_mask()
        .iter()
        .map(|&m| m as i64)
        .collect();
    let type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&t| t as i64).collect();
    let shape = [1_i64, ids.len() as i64];

    let input_ids_tensor =
        Tensor::from_array((shape, ids)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor =
        Tensor::from_array((shape, mask)).context("Failed to create attention_mask tensor")?;
    let token_type_ids_tensor =
        Tensor::from_array((shape, type_ids)).context("Failed to create token_type_ids tensor")?;

    let logits = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            })
            .context("ONNX inference failed")?;

        // Output shape: [1, 3] raw logits
        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract output tensor")?;
        data.to_vec()
    };

    let distribution = BiasDistribution::from_logits(&logits)?;
    debug!(
        left = distribution.left,
        center = distribution.center,
        right = distribution.right,
        text_preview = %truncate_chars(text, 50),
        "Classified text"
    );
    Ok(distribution)
}
