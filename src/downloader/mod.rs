// Downloader module - discovery, selection and fetch & merge around yt-dlp

pub mod backends;
pub mod credentials;
pub mod errors;
pub mod format_table;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod tools;
pub mod traits;
pub mod utils;

pub use credentials::CredentialFile;
pub use errors::{DownloadError, MUXER_HINT};
pub use format_table::{FormatKind, FormatRow, FormatTable};
pub use models::{
    DownloadProgress, DownloadRequest, ExtractorConfig, MediaInfo, ProgressEvent, RawFormat,
    SavedFile,
};
pub use orchestrator::Downloader;
pub use progress::ProgressTracker;
pub use traits::{MediaBackend, NoProgress, ProgressSink};
