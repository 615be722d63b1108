// Fetch & merge: download into a scratch directory, pick up the result

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use tracing::{info, warn};

use super::errors::DownloadError;
use super::models::{DownloadRequest, SavedFile, OUTPUT_MEDIA_TYPE};
use super::traits::{MediaBackend, ProgressSink};
use super::utils::newest_file;

pub struct Downloader {
    backend: Arc<dyn MediaBackend>,
    work_dir: PathBuf,
}

impl Downloader {
    pub fn new(backend: Arc<dyn MediaBackend>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            work_dir: work_dir.into(),
        }
    }

    pub fn backend(&self) -> &Arc<dyn MediaBackend> {
        &self.backend
    }

    /// Download `specifier` for `url` and return the merged file in memory.
    ///
    /// The scratch directory is removed before returning, whatever the outcome.
    pub async fn fetch(
        &self,
        url: &str,
        specifier: &str,
        cookies_path: Option<&Path>,
        progress: &dyn ProgressSink,
    ) -> Result<SavedFile, DownloadError> {
        if specifier.is_empty() {
            return Err(DownloadError::NothingSelected);
        }

        let scratch = tempfile::Builder::new()
            .prefix("merge-")
            .tempdir_in(&self.work_dir)?;

        let request = DownloadRequest::new(specifier, scratch.path())
            .with_cookies_path(cookies_path.map(Path::to_path_buf));

        info!(backend = self.backend.name(), %specifier, "Fetching");
        self.backend.download(url, &request, progress).await?;

        let Some(path) = newest_file(scratch.path())? else {
            warn!(%specifier, "Download returned but produced no file");
            return Err(DownloadError::OutputNotFound);
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or(DownloadError::OutputNotFound)?;
        let bytes = tokio::fs::read(&path).await?;

        info!(%file_name, bytes = bytes.len(), "Merged file ready");
        Ok(SavedFile {
            file_name,
            media_type: OUTPUT_MEDIA_TYPE,
            bytes: Bytes::from(bytes),
        })
    }
}
