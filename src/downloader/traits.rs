// Extractor/downloader backend trait definition

use async_trait::async_trait;

use super::errors::DownloadError;
use super::models::{DownloadRequest, ExtractorConfig, MediaInfo, ProgressEvent};

/// Trait for extractor/downloader backend implementations
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// Metadata-only call: title plus the raw format list
    async fn extract_info(
        &self,
        url: &str,
        config: &ExtractorConfig,
    ) -> Result<MediaInfo, DownloadError>;

    /// Download and merge into `request.output_dir`, reporting progress.
    /// Returns once the downloader has exited.
    async fn download(
        &self,
        url: &str,
        request: &DownloadRequest,
        progress: &dyn ProgressSink,
    ) -> Result<(), DownloadError>;
}

/// Receives progress hook events while a download runs
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}
