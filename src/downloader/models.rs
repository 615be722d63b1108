// Common data models for discovery and download

use std::path::PathBuf;

use axum::body::Bytes;
use serde::{Deserialize, Serialize};

/// Container the downloader merges into.
pub const MERGE_OUTPUT_FORMAT: &str = "mp4";

/// Media type declared on the saved file, whatever the muxer produced.
pub const OUTPUT_MEDIA_TYPE: &str = "video/mp4";

/// Output name template relative to the download directory.
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// One raw entry of the `formats` array in `yt-dlp --dump-single-json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFormat {
    /// Format ID (e.g., "137", "140")
    pub format_id: String,
    /// File extension (mp4, webm, m4a)
    pub ext: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Exact size in bytes
    pub filesize: Option<f64>,
    /// Approximate size (when exact is unknown)
    pub filesize_approx: Option<f64>,
    /// Format note (e.g., "1080p", "medium")
    pub format_note: Option<String>,
    /// Video codec (avc1, vp9, av01, none)
    pub vcodec: Option<String>,
    /// Audio codec (mp4a, opus, none)
    pub acodec: Option<String>,
}

impl RawFormat {
    /// Exact size, else approximate; zero counts as unknown.
    pub fn effective_size(&self) -> Option<f64> {
        self.filesize
            .filter(|s| *s > 0.0)
            .or(self.filesize_approx.filter(|s| *s > 0.0))
    }

    /// Entries where both codecs are literally "none" carry no stream.
    pub fn has_no_streams(&self) -> bool {
        self.vcodec.as_deref() == Some("none") && self.acodec.as_deref() == Some("none")
    }
}

/// Metadata returned by a metadata-only extractor call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaInfo {
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub formats: Vec<RawFormat>,
}

/// Options shared by every extractor invocation
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Path to cookies.txt file
    pub cookies_path: Option<PathBuf>,
    /// Metadata call timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            cookies_path: None,
            timeout_seconds: 60,
        }
    }
}

impl ExtractorConfig {
    pub fn with_cookies_path(mut self, path: Option<PathBuf>) -> Self {
        self.cookies_path = path;
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// A single download-mode invocation
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Composite format specifier, passed verbatim as `-f`
    pub format: String,
    /// Directory every produced file lands in
    pub output_dir: PathBuf,
    pub output_template: String,
    pub merge_output_format: String,
    pub cookies_path: Option<PathBuf>,
}

impl DownloadRequest {
    pub fn new(format: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            format: format.into(),
            output_dir: output_dir.into(),
            output_template: OUTPUT_TEMPLATE.to_string(),
            merge_output_format: MERGE_OUTPUT_FORMAT.to_string(),
            cookies_path: None,
        }
    }

    pub fn with_cookies_path(mut self, path: Option<PathBuf>) -> Self {
        self.cookies_path = path;
        self
    }

    /// Full `-o` argument: directory joined with the name template.
    pub fn output_arg(&self) -> String {
        self.output_dir
            .join(&self.output_template)
            .to_string_lossy()
            .to_string()
    }
}

/// Progress hook payload, mirroring yt-dlp's `status` field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProgressEvent {
    Downloading {
        percent_str: String,
        speed_str: String,
    },
    Finished,
}

/// Progress snapshot for UI display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// 0.0 ..= 1.0
    pub fraction: f32,
    pub status: String,
}

/// The merged result, held in memory until saved; clones share the buffer
#[derive(Debug, Clone, PartialEq)]
pub struct SavedFile {
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_json_subset() {
        let json = r#"{
            "id": "abc",
            "title": "Clip",
            "uploader": "Someone",
            "formats": [
                {"format_id": "137", "ext": "mp4", "width": 1920, "height": 1080,
                 "filesize": 104857600, "vcodec": "avc1.640028", "acodec": "none"},
                {"format_id": "140", "ext": "m4a", "width": null, "height": null,
                 "filesize_approx": 3456789.5, "vcodec": "none", "acodec": "mp4a.40.2",
                 "format_note": "medium", "tbr": 129.5}
            ]
        }"#;
        let info: MediaInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.title.as_deref(), Some("Clip"));
        assert_eq!(info.uploader.as_deref(), Some("Someone"));
        assert_eq!(info.formats.len(), 2);
        assert_eq!(info.formats[0].width, Some(1920));
        assert_eq!(info.formats[1].effective_size(), Some(3456789.5));
        assert_eq!(info.formats[1].format_note.as_deref(), Some("medium"));
    }

    #[test]
    fn zero_filesize_falls_back_to_approx() {
        let f = RawFormat {
            filesize: Some(0.0),
            filesize_approx: Some(10.0),
            ..Default::default()
        };
        assert_eq!(f.effective_size(), Some(10.0));
    }

    #[test]
    fn missing_codec_is_not_none() {
        let f = RawFormat {
            vcodec: Some("none".into()),
            acodec: None,
            ..Default::default()
        };
        assert!(!f.has_no_streams());
    }

    #[test]
    fn output_arg_joins_template() {
        let req = DownloadRequest::new("137+140", "/tmp/dl");
        assert_eq!(req.output_arg(), "/tmp/dl/%(title)s.%(ext)s");
        assert_eq!(req.merge_output_format, "mp4");
    }
}
