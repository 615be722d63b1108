// Error types for format discovery and fetch & merge

use std::fmt;

/// Shown whenever a fetch fails; merging needs the muxer on the host.
pub const MUXER_HINT: &str = "Check that FFmpeg is installed; it is required to merge video and audio.";

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadError {
    /// Parse requested with an empty link
    EmptyUrl,

    /// Download requested with no formats selected
    NothingSelected,

    /// Selection refers to a row the table does not have
    InvalidSelection { index: usize, rows: usize },

    /// Download requested before any successful discovery
    NoSource,

    /// Metadata call did not answer in time
    NetworkTimeout(u64),

    /// yt-dlp binary not found on the host
    ToolNotFound(String),

    /// The extractor rejected the link
    UnsupportedUrl(String),

    /// Failed to parse yt-dlp JSON output
    ParseError(String),

    /// yt-dlp exited with failure; carries its stderr
    ExecutionError(String),

    /// Download finished but nothing was left in the output directory
    OutputNotFound,

    /// Local filesystem failure (temp files, reading the result)
    Io(String),
}

impl DownloadError {
    /// Input errors leave the session untouched.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyUrl | Self::NothingSelected | Self::InvalidSelection { .. } | Self::NoSource
        )
    }
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "Please enter a link"),
            Self::NothingSelected => write!(f, "Select at least one format to download"),
            Self::InvalidSelection { index, rows } => {
                write!(f, "Row {} does not exist (table has {} rows)", index, rows)
            }
            Self::NoSource => write!(f, "Parse a link before downloading"),
            Self::NetworkTimeout(secs) => write!(f, "Network timeout: no answer after {}s", secs),
            Self::ToolNotFound(tool) => write!(f, "Tool not found: {}", tool),
            Self::UnsupportedUrl(msg) => write!(f, "Unsupported URL: {}", msg),
            Self::ParseError(msg) => write!(f, "Parse error: {}", msg),
            Self::ExecutionError(msg) => write!(f, "Execution error: {}", msg),
            Self::OutputNotFound => write!(
                f,
                "Merge failed or no output file was found. {}",
                MUXER_HINT
            ),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for DownloadError {}

impl From<std::io::Error> for DownloadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

// Classify raw yt-dlp stderr / spawn failures
impl From<String> for DownloadError {
    fn from(s: String) -> Self {
        let lower = s.to_lowercase();

        if lower.contains("unsupported url") || lower.contains("is not a valid url") {
            return Self::UnsupportedUrl(s);
        }

        if lower.contains("no such file or directory") || lower.contains("command not found") {
            return Self::ToolNotFound(s);
        }

        if lower.contains("invalid json") {
            return Self::ParseError(s);
        }

        Self::ExecutionError(s)
    }
}
