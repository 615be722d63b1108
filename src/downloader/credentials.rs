// Uploaded cookie file, kept on disk for the session's lifetime

use std::io::Write;
use std::path::Path;

use tempfile::{Builder, NamedTempFile};

use super::errors::DownloadError;

/// Netscape-format cookies.txt handed to yt-dlp via `--cookies`.
/// The file is removed when this value is dropped.
#[derive(Debug)]
pub struct CredentialFile {
    file: NamedTempFile,
    size: usize,
}

impl CredentialFile {
    /// Persist uploaded bytes under `dir`. The content is not inspected.
    pub fn ingest(dir: &Path, bytes: &[u8]) -> Result<Self, DownloadError> {
        let mut file = Builder::new()
            .prefix("cookies-")
            .suffix(".txt")
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        Ok(Self {
            file,
            size: bytes.len(),
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
