//! Image catalog: the fixed folder of images to be rated
//!
//! The folder is re-read on every call so images added or removed while the
//! server runs are picked up on the next turn.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct ImageCatalog {
    dir: PathBuf,
}

impl ImageCatalog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Filenames of every regular, non-hidden file in the folder, sorted
    pub async fn list_all(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| self.unavailable(e))?;

        let mut images = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| self.unavailable(e))? {
            // Follows symlinks; dangling links are skipped
            match tokio::fs::metadata(entry.path()).await {
                Ok(meta) if meta.is_file() => {}
                _ => continue,
            }
            // Non-UTF-8 names cannot round-trip through forms or the store
            let Ok(name) = entry.file_name().into_string() else {
                debug!("Skipping non UTF-8 filename in {}", self.dir.display());
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            images.push(name);
        }

        images.sort();
        Ok(images)
    }

    /// Startup check: the folder must exist and be listable
    pub async fn ensure_available(&self) -> Result<usize> {
        self.list_all().await.map(|images| images.len())
    }

    fn unavailable(&self, e: std::io::Error) -> Error {
        Error::CatalogUnavailable(format!("{}: {}", self.dir.display(), e))
    }
}
