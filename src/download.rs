// Model download helper for the ONNX models the server loads at startup.
//
// Three models, each in its own subdirectory of the model dir:
// 1. political-bias-bert — Left/Center/Right sequence classifier (~430MB)
// 2. clip-vit-large-patch14 — CLIP vision + text towers for image matching (~1.7GB)
// 3. gpt2 — decoder for free-text image descriptions (~650MB)
//
// Files are stored in a platform-appropriate directory
// (~/.local/share/neutralizer/models/ on Linux) so they persist across runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;
use tracing::info;

/// Default source for the bias classifier export (model.onnx + tokenizer.json).
/// Override with NEUTRALIZER_BIAS_MODEL_URL when serving a private export.
pub const DEFAULT_BIAS_MODEL_URL: &str =
    "https://huggingface.co/bucketresearch/politicalBiasBERT/resolve/main/onnx";

/// The classifier was trained with the cased BERT vocabulary.
const BIAS_TOKENIZER_URL: &str =
    "https://huggingface.co/google-bert/bert-base-cased/resolve/main/tokenizer.json";

const CLIP_HF_URL: &str = "https://huggingface.co/Xenova/clip-vit-large-patch14/resolve/main";
const GPT2_HF_URL: &str = "https://huggingface.co/Xenova/gpt2/resolve/main";

pub const BIAS_SUBDIR: &str = "political-bias-bert";
pub const CLIP_SUBDIR: &str = "clip-vit-large-patch14";
pub const GPT2_SUBDIR: &str = "gpt2";

/// One file to fetch: where it comes from and where it lands.
struct ModelFile {
    subdir: &'static str,
    name: &'static str,
    url: String,
    /// Shown next to large downloads, e.g. "~430 MB".
    size_hint: Option<&'static str>,
}

fn model_files(bias_url: &str) -> Vec<ModelFile> {
    let bias_url = bias_url.trim_end_matches('/');
    vec![
        ModelFile {
            subdir: BIAS_SUBDIR,
            name: "tokenizer.json",
            url: BIAS_TOKENIZER_URL.to_string(),
            size_hint: None,
        },
        ModelFile {
            subdir: BIAS_SUBDIR,
            name: "model.onnx",
            url: format!("{bias_url}/model.onnx"),
            size_hint: Some("~430 MB"),
        },
        ModelFile {
            subdir: CLIP_SUBDIR,
            name: "tokenizer.json",
            url: format!("{CLIP_HF_URL}/tokenizer.json"),
            size_hint: None,
        },
        ModelFile {
            subdir: CLIP_SUBDIR,
            name: "vision_model.onnx",
            url: format!("{CLIP_HF_URL}/onnx/vision_model.onnx"),
            size_hint: Some("~1.2 GB"),
        },
        ModelFile {
            subdir: CLIP_SUBDIR,
            name: "text_model.onnx",
            url: format!("{CLIP_HF_URL}/onnx/text_model.onnx"),
            size_hint: Some("~490 MB"),
        },
        ModelFile {
            subdir: GPT2_SUBDIR,
            name: "tokenizer.json",
            url: format!("{GPT2_HF_URL}/tokenizer.json"),
            size_hint: None,
        },
        ModelFile {
            subdir: GPT2_SUBDIR,
            name: "decoder_model.onnx",
            url: format!("{GPT2_HF_URL}/onnx/decoder_model.onnx"),
            size_hint: Some("~650 MB"),
        },
    ]
}

/// Returns the default directory for storing model files.
/// Uses the platform data directory: ~/.local/share/neutralizer/models/ on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("neutralizer")
        .join("models")
}

pub fn bias_model_dir(base: &Path) -> PathBuf {
    base.join(BIAS_SUBDIR)
}

pub fn clip_model_dir(base: &Path) -> PathBuf {
    base.join(CLIP_SUBDIR)
}

pub fn gpt2_model_dir(base: &Path) -> PathBuf {
    base.join(GPT2_SUBDIR)
}

/// Relative paths (`subdir/file`) of every model file not yet on disk.
pub fn missing_models(dir: &Path) -> Vec<String> {
    model_files(DEFAULT_BIAS_MODEL_URL)
        .into_iter()
        .filter(|f| !dir.join(f.subdir).join(f.name).exists())
        .map(|f| format!("{}/{}", f.subdir, f.name))
        .collect()
}

/// Download every model file.
///
/// Shows progress bars for large files. Skips files that already exist.
/// Creates directories as needed.
pub async fn download_models(dir: &Path, bias_url: &str) -> Result<()> {
    let mut current_subdir = "";

    for file in model_files(bias_url) {
        let target_dir = dir.join(file.subdir);
        if file.subdir != current_subdir {
            current_subdir = file.subdir;
            std::fs::create_dir_all(&target_dir).with_context(|| {
                format!("Failed to create model directory: {}", target_dir.display())
            })?;
            println!("\n{}:", file.subdir);
        }

        let dest = target_dir.join(file.name);
        if dest.exists() {
            info!(file = file.name, subdir = file.subdir, "Model file already exists, skipping");
            println!("  {} (already exists)", file.name);
            continue;
        }

        match file.size_hint {
            Some(size) => println!("  Downloading {} ({size})...", file.name),
            None => println!("  Downloading {}...", file.name),
        }
        download_file(&file.url, &dest, file.size_hint.is_some()).await?;
    }

    Ok(())
}

/// Download a single file from a URL to a local path.
/// If `show_progress` is true, display a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        Some(progress_bar(response.content_length()))
    } else {
        None
    };

    // Stream into a sibling temp path so an interrupted download never looks complete.
    let partial = dest.with_extension("part");
    let mut file = tokio::fs::File::create(&partial)
        .await
        .with_context(|| format!("Failed to create {}", partial.display()))?;
    let mut written: u64 = 0;
    while let Some(chunk) = response
        .chunk()
        .await
        .context("Failed to read response body")?
    {
        file.write_all(&chunk)
            .await
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        written += chunk.len() as u64;
        if let Some(ref pb) = pb {
            pb.set_position(written);
        }
    }
    file.flush()
        .await
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    drop(file);

    tokio::fs::rename(&partial, dest)
        .await
        .with_context(|| format!("Failed to move download into {}", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

fn progress_bar(total_size: Option<u64>) -> ProgressBar {
    match total_size {
        Some(size) => {
            let pb = ProgressBar::new(size);
            if let Ok(style) =
                ProgressStyle::default_bar().template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb
        }
        None => {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("    {spinner} {bytes}") {
                pb.set_style(style);
            }
            pb
        }
    }
}
