// CLIP template matching.
//
// The image is embedded with the vision tower and compared by cosine
// similarity against a fixed set of description templates. Template
// embeddings come from the text tower once, at load time.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Limits};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

/// Candidate descriptions the image is matched against.
pub const DESCRIPTION_TEMPLATES: [&str; 4] = [
    "An intricate scene with a vibrant composition, capturing a moment full of depth and detail.",
    "A richly detailed image that tells a complex story with subtle nuances and vivid colors.",
    "A dynamic portrayal that combines textures, light, and shadow to reveal a captivating narrative.",
    "A visually striking scene that blends emotion and detail in a sophisticated manner.",
];

/// Input resolution of the ViT-L/14 vision tower.
pub const IMAGE_SIZE: u32 = 224;

/// Uploads wider or taller than this are refused at decode time.
pub const MAX_IMAGE_SIDE: u32 = 16_384;

const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_1];

pub struct ClipMatcher {
    vision: Mutex<Session>,
    /// One projected embedding per entry of DESCRIPTION_TEMPLATES.
    template_embeddings: Vec<Vec<f32>>,
}

impl ClipMatcher {
    /// Load both towers from `model_dir` and embed the templates.
    ///
    /// Expects `vision_model.onnx`, `text_model.onnx` and `tokenizer.json`.
    /// The text tower is dropped once the templates are embedded.
    pub fn load(model_dir: &Path) -> Result<Self> {
        let vision_path = model_dir.join("vision_model.onnx");
        let text_path = model_dir.join("text_model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        for path in [&vision_path, &text_path, &tokenizer_path] {
            if !path.exists() {
                anyhow::bail!(
                    "CLIP model file not found: {}\nRun `neutralizer download-model` to download it.",
                    path.display()
                );
            }
        }

        let vision = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&vision_path)
            .with_context(|| format!("Failed to load CLIP vision model from {}", vision_path.display()))?;
        let mut text = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&text_path)
            .with_context(|| format!("Failed to load CLIP text model from {}", text_path.display()))?;
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load CLIP tokenizer: {}", e))?;

        let template_embeddings = DESCRIPTION_TEMPLATES
            .iter()
            .map(|template| embed_text(&mut text, &tokenizer, template))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            templates = template_embeddings.len(),
            "Loaded CLIP model from {}",
            model_dir.display()
        );

        Ok(Self {
            vision: Mutex::new(vision),
            template_embeddings,
        })
    }

    /// The template that best matches the image at `path`. Blocking.
    pub fn best_template(&self, path: &Path) -> Result<&'static str> {
        let mut reader = ImageReader::open(path)
            .with_context(|| format!("Failed to open image {}", path.display()))?
            .with_guessed_format()
            .context("Failed to detect image format")?;
        let mut limits = Limits::default();
        limits.max_image_width = Some(MAX_IMAGE_SIDE);
        limits.max_image_height = Some(MAX_IMAGE_SIDE);
        reader.limits(limits);
        let image = reader.decode().context("Failed to decode image")?;

        let pixels = preprocess(&image);
        let image_embedding = self.embed_image(pixels)?;

        let scores: Vec<f64> = self
            .template_embeddings
            .iter()
            .map(|t| cosine_similarity(&image_embedding, t))
            .collect();
        let best = argmax(&scores).context("No description templates to match against")?;
        debug!(best, score = scores[best], "Matched image to description template");
        Ok(DESCRIPTION_TEMPLATES[best])
    }

    fn embed_image(&self, pixels: Vec<f32>) -> Result<Vec<f32>> {
        let size = IMAGE_SIZE as i64;
        let tensor = Tensor::from_array(([1_i64, 3, size, size], pixels))
            .context("Failed to create pixel_values tensor")?;

        let mut session = self
            .vision
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;
        let outputs = session
            .run(ort::inputs! { "pixel_values" => tensor })
            .context("CLIP vision inference failed")?;
        let (_shape, data) = outputs["image_embeds"]
            .try_extract_tensor::<f32>()
            .context("Failed to extract image embedding")?;
        Ok(data.to_vec())
    }
}

fn embed_text(session: &mut Session, tokenizer: &Tokenizer, text: &str) -> Result<Vec<f32>> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;
    let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
    let mask: Vec<i64> = encoding
        .get_attention_mask()
        .iter()
        .map(|&m| m as i64)
        .collect();
    let shape = [1_i64, ids.len() as i64];

    let input_ids_tensor =
        Tensor::from_array((shape, ids)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor =
        Tensor::from_array((shape, mask)).context("Failed to create attention_mask tensor")?;

    let outputs = session
        .run(ort::inputs! {
            "input_ids" => input_ids_tensor,
            "attention_mask" => attention_mask_tensor
        })
        .context("CLIP text inference failed")?;
    let (_shape, data) = outputs["text_embeds"]
        .try_extract_tensor::<f32>()
        .context("Failed to extract text embedding")?;
    Ok(data.to_vec())
}

/// CLIP preprocessing: center square crop, resize to 224x224 (bicubic),
/// scale to [0, 1], normalize per channel. Returns NCHW data.
///
/// Cropping in source pixels first gives the same framing as resizing the
/// shortest side to 224 and cropping after, but the intermediate image never
/// grows past 224x224 whatever the aspect ratio.
pub fn preprocess(image: &DynamicImage) -> Vec<f32> {
    let (w, h) = (image.width(), image.height());
    let side = w.min(h).max(1);
    let left = w.saturating_sub(side) / 2;
    let top = h.saturating_sub(side) / 2;

    let rgb = image
        .crop_imm(left, top, side, side)
        .resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom)
        .to_rgb8();

    let plane = (IMAGE_SIZE * IMAGE_SIZE) as usize;
    let mut data = vec![0.0_f32; 3 * plane];
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let offset = (y * IMAGE_SIZE + x) as usize;
        for c in 0..3 {
            let value = pixel.0[c] as f32 / 255.0;
            data[c * plane + offset] = (value - CLIP_MEAN[c]) / CLIP_STD[c];
        }
    }
    data
}

/// Cosine similarity between two vectors. Returns 0.0 for zero-length or
/// mismatched inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

/// Index of the largest score; the first one wins ties.
pub fn argmax(scores: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &s) in scores.iter().enumerate() {
        match best {
            Some(b) if scores[b] >= s => {}
            _ => best = Some(i),
        }
    }
    best
}
