// Progress line parsing and the per-session progress tracker

use std::sync::{Arc, Mutex};

use regex::Regex;

use super::models::{DownloadProgress, ProgressEvent};
use super::traits::ProgressSink;

/// Marker our `--progress-template` puts in front of every hook line.
pub const PROGRESS_MARKER: &str = "[progress]";

/// Value for yt-dlp's `--progress-template`: status, percent and speed
/// separated by `|`.
pub const PROGRESS_TEMPLATE: &str =
    "download:[progress]%(progress.status)s|%(progress._percent_str)s|%(progress._speed_str)s";

pub const STATUS_PROCESSING: &str = "Download finished, merging/transcoding with FFmpeg...";

/// Parse one stdout line of a download-mode yt-dlp run.
///
/// Understands the templated hook lines and, for yt-dlp builds that ignore
/// the template, the default `[download]  12.5% of ... at ...` lines.
pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    lazy_static::lazy_static! {
        static ref DEFAULT_RE: Regex = Regex::new(
            r"\[download\]\s+(\d+\.?\d*%)\s+of\s+~?\s*\S+(?:\s+at\s+(\S+(?:\s?\S+/s)?))?"
        ).unwrap();
        static ref MERGE_RE: Regex = Regex::new(r"^\[Merger\]\s+Merging").unwrap();
    }

    let line = line.trim();

    if let Some(rest) = line.strip_prefix(PROGRESS_MARKER) {
        let mut parts = rest.splitn(3, '|');
        let status = parts.next()?.trim();
        let percent_str = parts.next().unwrap_or("").trim().to_string();
        let speed_str = parts.next().unwrap_or("").trim().to_string();

        return match status {
            "downloading" => Some(ProgressEvent::Downloading {
                percent_str,
                speed_str,
            }),
            "finished" => Some(ProgressEvent::Finished),
            _ => None,
        };
    }

    if let Some(caps) = DEFAULT_RE.captures(line) {
        let percent_str = caps.get(1)?.as_str().to_string();
        let speed_str = caps
            .get(2)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        return Some(ProgressEvent::Downloading {
            percent_str,
            speed_str,
        });
    }

    if MERGE_RE.is_match(line) {
        return Some(ProgressEvent::Finished);
    }

    None
}

impl DownloadProgress {
    /// Fold one hook event into the snapshot.
    ///
    /// A percent that does not parse leaves the snapshot unchanged.
    pub fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Downloading {
                percent_str,
                speed_str,
            } => {
                let Ok(percent) = percent_str.trim().trim_end_matches('%').trim().parse::<f32>()
                else {
                    return;
                };
                self.fraction = (percent / 100.0).clamp(0.0, 1.0);
                self.status = format!("Downloading... {} | Speed: {}", percent_str, speed_str);
            }
            ProgressEvent::Finished => {
                self.status = STATUS_PROCESSING.to_string();
            }
        }
    }
}

/// Shared progress snapshot; written by the download, read by pollers
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    inner: Arc<Mutex<DownloadProgress>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DownloadProgress {
        self.inner.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn reset(&self, status: &str) {
        self.set(0.0, status);
    }

    pub fn complete(&self, status: &str) {
        self.set(1.0, status);
    }

    fn set(&self, fraction: f32, status: &str) {
        if let Ok(mut p) = self.inner.lock() {
            *p = DownloadProgress {
                fraction,
                status: status.to_string(),
            };
        }
    }
}

impl ProgressSink for ProgressTracker {
    fn emit(&self, event: ProgressEvent) {
        if let Ok(mut p) = self.inner.lock() {
            p.apply(&event);
        }
    }
}
