use image::ImageFormat;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const VIDEO_DIR: &str = "videos";
const THUMB_DIR: &str = "thumbs";

/// Local directory holding generated videos and thumbnails, served under `/outputs`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an encoded MP4. Returns the path relative to the output directory.
    pub async fn save_video(&self, job_id: Uuid, mp4: &[u8]) -> Result<String, StorageError> {
        let relative = format!("{VIDEO_DIR}/{job_id}.mp4");
        self.write(&relative, mp4).await?;
        Ok(relative)
    }

    /// Re-encode the first frame as a JPEG thumbnail. Returns the relative path.
    pub async fn save_thumbnail(&self, job_id: Uuid, frame: &[u8]) -> Result<String, StorageError> {
        let relative = format!("{THUMB_DIR}/{job_id}.jpg");
        let jpeg = encode_thumbnail(frame)?;
        self.write(&relative, &jpeg).await?;
        Ok(relative)
    }

    async fn write(&self, relative: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, data).await?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "Artifact written");
        Ok(())
    }
}

fn encode_thumbnail(frame: &[u8]) -> Result<Vec<u8>, StorageError> {
    let decoded = image::load_from_memory(frame)?;
    let mut jpeg = std::io::Cursor::new(Vec::new());
    // JPEG has no alpha channel.
    decoded.to_rgb8().write_to(&mut jpeg, ImageFormat::Jpeg)?;
    Ok(jpeg.into_inner())
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to write artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid thumbnail image: {0}")]
    Image(#[from] image::ImageError),
}
