// GPT-2 text generation for image descriptions.
//
// Plain autoregressive loop over the decoder export (no KV cache): each step
// feeds the whole sequence, samples the next token from the last position's
// logits with temperature + top-k, and stops at end-of-text or the length cap.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use rand::Rng;
use tokenizers::Tokenizer;
use tracing::debug;

/// GPT-2's `<|endoftext|>` token.
pub const EOS_TOKEN_ID: u32 = 50256;

#[derive(Debug, Clone, Copy)]
pub struct GenerationParams {
    /// Cap on prompt + generated tokens.
    pub max_length: usize,
    pub temperature: f32,
    pub top_k: usize,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 150,
            temperature: 0.7,
            top_k: 50,
        }
    }
}

pub struct Gpt2Generator {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl Gpt2Generator {
    /// Expects `decoder_model.onnx` and `tokenizer.json` in `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let model_path = model_dir.join("decoder_model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            anyhow::bail!(
                "GPT-2 model not found: {}\nRun `neutralizer download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "GPT-2 tokenizer not found: {}\nRun `neutralizer download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load GPT-2 model from {}", model_path.display()))?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load GPT-2 tokenizer: {}", e))?;

        debug!("Loaded GPT-2 model from {}", model_dir.display());
        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
        })
    }

    /// Continue `prompt`, returning prompt and continuation decoded together
    /// with special tokens skipped. Blocking.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        prompt: &str,
        params: &GenerationParams,
        rng: &mut R,
    ) -> Result<String> {
        let encoding = self
            .tokenizer
            .encode(prompt, false)
            .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;
        let mut tokens: Vec<u32> = encoding.get_ids().to_vec();
        if tokens.is_empty() {
            anyhow::bail!("Cannot generate from an empty prompt");
        }

        while tokens.len() < params.max_length {
            let logits = self.next_token_logits(&tokens)?;
            let next = sample_top_k(&logits, params.temperature, params.top_k, rng) as u32;
            if next == EOS_TOKEN_ID {
                break;
            }
            tokens.push(next);
        }

        debug!(tokens = tokens.len(), "Generated description");
        self.tokenizer
            .decode(&tokens, true)
            .map_err(|e| anyhow::anyhow!("Detokenization failed: {}", e))
    }

    /// Logits over the vocabulary for the position after `tokens`.
    fn next_token_logits(&self, tokens: &[u32]) -> Result<Vec<f32>> {
        let ids: Vec<i64> = tokens.iter().map(|&t| t as i64).collect();
        let mask = vec![1_i64; ids.len()];
        let shape = [1_i64, ids.len() as i64];

        let input_ids_tensor =
            Tensor::from_array((shape, ids)).context("Failed to create input_ids tensor")?;
        let attention_mask_tensor =
            Tensor::from_array((shape, mask)).context("Failed to create attention_mask tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;
        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            })
            .context("GPT-2 inference failed")?;

        // logits: [1, seq_len, vocab]
        let (shape, data) = outputs["logits"]
            .try_extract_tensor::<f32>()
            .context("Failed to extract logits")?;
        let vocab = *shape.last().context("Logits tensor has no dimensions")? as usize;
        if vocab == 0 || data.len() < vocab {
            anyhow::bail!("Unexpected logits shape {:?}", shape);
        }
        Ok(data[data.len() - vocab..].to_vec())
    }
}

/// Sample a token index from the `top_k` highest logits after temperature
/// scaling. A non-positive temperature or `top_k` of 1 is greedy.
pub fn sample_top_k<R: Rng + ?Sized>(
    logits: &[f32],
    temperature: f32,
    top_k: usize,
    rng: &mut R,
) -> usize {
    if logits.is_empty() {
        return 0;
    }

    let mut ranked: Vec<(usize, f32)> = logits.iter().copied().enumerate().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(top_k.max(1));

    if temperature <= 0.0 || ranked.len() == 1 {
        return ranked[0].0;
    }

    let max = ranked[0].1 as f64;
    let weights: Vec<f64> = ranked
        .iter()
        .map(|&(_, l)| ((l as f64 - max) / temperature as f64).exp())
        .collect();
    let total: f64 = weights.iter().sum();

    let mut target = rng.random::<f64>() * total;
    for (&(index, _), w) in ranked.iter().zip(&weights) {
        if target < *w {
            return index;
        }
        target -= w;
    }
    ranked[ranked.len() - 1].0
}
