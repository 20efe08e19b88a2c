// Image uploads.
//
// Each upload is written under the upload directory with a fresh UUID name
// (extension kept) and removed when its ScopedUpload guard drops, whichever
// way the request ends.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, warn};
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Unsupported image type .{0}; allowed: .jpg, .jpeg, .png, .webp")]
    UnsupportedExtension(String),
    #[error("Uploaded image has no file name")]
    MissingFileName,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Lower-cased extension of `file_name` if it is an accepted image type.
pub fn allowed_extension(file_name: &str) -> Result<String, UploadError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(UploadError::UnsupportedExtension(ext))
    }
}

/// The directory uploads are staged in.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
}

impl UploadDir {
    /// Creates the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create upload directory: {}", root.display()))?;
        Ok(Self { root })
    }

    /// Validate the client's file name and write `bytes` to a unique path.
    pub async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<ScopedUpload, UploadError> {
        if file_name.is_empty() {
            return Err(UploadError::MissingFileName);
        }
        let ext = allowed_extension(file_name)?;
        let path = self.root.join(format!("{}.{ext}", Uuid::new_v4()));

        // Guard first so a failed write still cleans up a partial file.
        let upload = ScopedUpload { path };
        tokio::fs::write(&upload.path, bytes).await?;
        debug!(path = %upload.path.display(), bytes = bytes.len(), "Stored upload");
        Ok(upload)
    }
}

/// A stored upload; the file is deleted when this is dropped.
#[derive(Debug)]
pub struct ScopedUpload {
    path: PathBuf,
}

impl ScopedUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove upload"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_extensions_case_insensitive() {
        assert_eq!(allowed_extension("cat.PNG").unwrap(), "png");
        assert_eq!(allowed_extension("a.b.jpeg").unwrap(), "jpeg");
        assert_eq!(allowed_extension("x.webp").unwrap(), "webp");
        assert_eq!(allowed_extension("x.jpg").unwrap(), "jpg");
    }

    #[test]
    fn test_rejected_extensions() {
        assert!(matches!(
            allowed_extension("anim.gif"),
            Err(UploadError::UnsupportedExtension(ext)) if ext == "gif"
        ));
        assert!(allowed_extension("noext").is_err());
        assert!(allowed_extension("png").is_err());
    }

    #[tokio::test]
    async fn test_store_uses_unique_names_and_cleans_up() {
        let tmp = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(tmp.path().join("uploads")).unwrap();

        let a = uploads.store("photo.png", b"one").await.unwrap();
        let b = uploads.store("photo.png", b"two").await.unwrap();
        assert_ne!(a.path(), b.path());
        assert_eq!(std::fs::read(a.path()).unwrap(), b"one");
        assert_eq!(std::fs::read(b.path()).unwrap(), b"two");
        assert_eq!(a.path().extension().unwrap(), "png");

        let (pa, pb) = (a.path().to_path_buf(), b.path().to_path_buf());
        drop(a);
        assert!(!pa.exists());
        assert!(pb.exists());
        drop(b);
        assert!(!pb.exists());
    }

    #[tokio::test]
    async fn test_store_rejects_before_writing() {
        let tmp = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(tmp.path()).unwrap();
        assert!(uploads.store("x.gif", b"GIF89a").await.is_err());
        assert!(uploads.store("", b"").await.is_err());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
