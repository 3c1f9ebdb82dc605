//! Document file storage under the media root
//!
//! Files are addressed by a `file_ref` relative to the root, e.g.
//! `documents/nda_agreement.pdf`.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Invalid file reference: {0}")]
    InvalidPath(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute location of a file reference. Only plain relative paths are
    /// accepted, so a reference can never point outside the root.
    pub fn resolve(&self, file_ref: &str) -> Result<PathBuf, MediaError> {
        let relative = Path::new(file_ref);
        let plain = !file_ref.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(MediaError::InvalidPath(file_ref.to_string()));
        }
        Ok(self.root.join(relative))
    }

    pub async fn read(&self, file_ref: &str) -> Result<Vec<u8>, MediaError> {
        let path = self.resolve(file_ref)?;
        Ok(tokio::fs::read(path).await?)
    }

    /// Store `bytes` as `{dir}/{filename}`, picking a free name when one is
    /// already taken. Returns the new file reference.
    pub async fn save(&self, dir: &str, filename: &str, bytes: &[u8]) -> Result<String, MediaError> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MediaError::InvalidPath(filename.to_string()))?;
        let target_dir = self.resolve(dir)?;
        tokio::fs::create_dir_all(&target_dir).await?;

        let (stem, extension) = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (name, None),
        };
        let mut candidate = name.to_string();
        let mut n = 1;
        while tokio::fs::try_exists(target_dir.join(&candidate)).await? {
            candidate = match extension {
                Some(ext) => format!("{}_{}.{}", stem, n, ext),
                None => format!("{}_{}", stem, n),
            };
            n += 1;
        }

        tokio::fs::write(target_dir.join(&candidate), bytes).await?;
        tracing::debug!("Stored {} bytes as {}/{}", bytes.len(), dir, candidate);
        Ok(format!("{}/{}", dir, candidate))
    }

    /// Remove a file; a file that is already gone is not an error
    pub async fn delete(&self, file_ref: &str) -> Result<(), MediaError> {
        let path = self.resolve(file_ref)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
