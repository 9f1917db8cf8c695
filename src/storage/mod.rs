use crate::error::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Flat directory of generated PNGs named `{prefix}-{UTC timestamp}.png`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub async fn save(&self, image: &[u8], prefix: &str) -> Result<PathBuf> {
        save_image_bytes(image, &self.dir, prefix).await
    }
}

pub fn image_file_name(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}.png", prefix, at.format("%Y%m%d-%H%M%S-%6f"))
}

/// Create `dir` if needed and write the bytes under a timestamped name.
/// Uniqueness rests on the microsecond timestamp alone.
pub async fn save_image_bytes(image: &[u8], dir: &Path, prefix: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(image_file_name(prefix, Utc::now()));
    tokio::fs::write(&path, image).await?;
    log::info!("💾 Saved {} bytes to {}", image.len(), path.display());
    Ok(path)
}
