// Drivers that call the collaborators and feed the outcome back as events

use tracing::{debug, info, warn};

use super::{Event, SessionState};
use crate::downloader::{
    CredentialFile, DownloadError, Downloader, ExtractorConfig, MediaBackend, ProgressTracker,
};

impl SessionState {
    fn reject(&mut self, err: DownloadError) {
        if err.is_input_error() {
            debug!(error = %err, "Input rejected");
        } else {
            warn!(error = %err, "Action refused");
        }
        self.dispatch(Event::Rejected(err));
    }

    /// Format discovery for `url`.
    pub async fn discover(&mut self, url: &str, backend: &dyn MediaBackend, timeout_seconds: u64) {
        let url = url.trim();
        if url.is_empty() {
            self.reject(DownloadError::EmptyUrl);
            return;
        }

        self.dispatch(Event::DiscoveryStarted {
            url: url.to_string(),
        });

        let config = ExtractorConfig::default()
            .with_timeout(timeout_seconds)
            .with_cookies_path(self.credential_path().map(|p| p.to_path_buf()));

        match backend.extract_info(url, &config).await {
            Ok(info) => self.dispatch(Event::DiscoveryCompleted(info)),
            Err(err) => {
                warn!(%url, error = %err, "Discovery failed");
                self.dispatch(Event::DiscoveryFailed(err));
            }
        }
    }

    /// Replace the session's cookie file with uploaded bytes.
    pub fn upload_credential(&mut self, dir: &std::path::Path, bytes: &[u8]) {
        match CredentialFile::ingest(dir, bytes) {
            Ok(file) => self.dispatch(Event::CredentialUploaded(file)),
            Err(err) => self.reject(err),
        }
    }

    /// Fetch & merge the current selection; blocks until the downloader exits.
    pub async fn fetch(&mut self, downloader: &Downloader, progress: &ProgressTracker) {
        let Some(url) = self.url.clone() else {
            self.reject(DownloadError::NoSource);
            return;
        };
        if !self.can_fetch() {
            self.reject(DownloadError::NothingSelected);
            return;
        }

        let specifier = self.specifier();
        self.dispatch(Event::FetchStarted);
        progress.reset("Starting download...");

        let cookies = self.credential_path().map(|p| p.to_path_buf());
        let result = downloader
            .fetch(&url, &specifier, cookies.as_deref(), progress)
            .await;

        match result {
            Ok(file) => {
                info!(%specifier, file = %file.file_name, "Fetch complete");
                progress.complete("Done");
                self.dispatch(Event::FetchCompleted(file));
            }
            Err(err) => {
                warn!(%specifier, error = %err, "Fetch failed");
                progress.reset("Failed");
                self.dispatch(Event::FetchFailed(err));
            }
        }
    }
}
