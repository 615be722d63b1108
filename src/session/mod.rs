// Per-user session state and its transition function
//
// The page never mutates state directly. Every interaction becomes an
// `Event`, and `reduce` folds it into the state. Collaborator calls live in
// `actions`, which feed their outcomes back as events.

mod actions;
mod store;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::downloader::{
    CredentialFile, DownloadError, FormatRow, FormatTable, MediaInfo, SavedFile, MUXER_HINT,
};

pub use store::{SessionHandle, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Message shown for the last action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Everything one user's page carries between interactions.
#[derive(Debug, Default)]
pub struct SessionState {
    /// Link of the last discovery attempt; downloads use it
    pub url: Option<String>,
    /// Raw metadata of the last successful discovery
    pub info: Option<MediaInfo>,
    /// Rebuilt on each discovery, emptied when one starts
    pub table: FormatTable,
    /// Normalized row indices, ascending
    pub selected: Vec<usize>,
    /// Uploaded cookie file, kept until replaced or the session ends
    pub credential: Option<CredentialFile>,
    pub notice: Option<Notice>,
    /// Merged file of the last successful download
    pub output: Option<SavedFile>,
}

/// One interaction, or the outcome of a collaborator call
#[derive(Debug)]
pub enum Event {
    CredentialUploaded(CredentialFile),
    CredentialCleared,
    /// Input error: report it and change nothing else
    Rejected(DownloadError),
    DiscoveryStarted { url: String },
    DiscoveryCompleted(MediaInfo),
    DiscoveryFailed(DownloadError),
    SelectionChanged(Vec<usize>),
    FetchStarted,
    FetchCompleted(SavedFile),
    FetchFailed(DownloadError),
}

/// Pure transition: `(state, event) -> state`.
pub fn reduce(mut state: SessionState, event: Event) -> SessionState {
    state.notice = None;

    match event {
        Event::CredentialUploaded(file) => {
            state.notice = Some(Notice::success(format!(
                "Cookie file loaded ({} bytes)",
                file.size()
            )));
            state.credential = Some(file);
        }
        Event::CredentialCleared => {
            state.credential = None;
        }
        Event::Rejected(err) => {
            state.notice = Some(Notice::error(err.to_string()));
        }
        Event::DiscoveryStarted { url } => {
            state.reset_discovery();
            state.url = Some(url);
        }
        Event::DiscoveryCompleted(info) => {
            state.table = FormatTable::from_raw(&info.formats);
            state.selected.clear();
            state.notice = Some(Notice::success(format!(
                "Parsed: {}",
                info.title.as_deref().unwrap_or("Untitled")
            )));
            state.info = Some(info);
        }
        Event::DiscoveryFailed(err) => {
            state.notice = Some(Notice::error(format!("Parse failed: {}", err)));
        }
        Event::SelectionChanged(rows) => match state.table.normalize_selection(&rows) {
            Ok(selected) => state.selected = selected,
            Err(err) => state.notice = Some(Notice::error(err.to_string())),
        },
        Event::FetchStarted => {
            state.output = None;
        }
        Event::FetchCompleted(file) => {
            state.notice = Some(Notice::success(format!("Done! {}", file.file_name)));
            state.output = Some(file);
        }
        Event::FetchFailed(err) => {
            let message = if matches!(err, DownloadError::OutputNotFound) {
                err.to_string()
            } else {
                format!("Download failed: {}. {}", err, MUXER_HINT)
            };
            state.notice = Some(Notice::error(message));
        }
    }

    state
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event in place.
    pub fn dispatch(&mut self, event: Event) {
        *self = reduce(std::mem::take(self), event);
    }

    /// Forget the format table before a new discovery attempt.
    pub fn reset_discovery(&mut self) {
        self.table = FormatTable::default();
        self.selected.clear();
    }

    pub fn credential_path(&self) -> Option<&Path> {
        self.credential.as_ref().map(|c| c.path())
    }

    /// Composite format specifier for the current selection
    pub fn specifier(&self) -> String {
        self.table.composite_specifier(&self.selected)
    }

    /// The download action is offered only for a non-empty selection.
    pub fn can_fetch(&self) -> bool {
        self.url.is_some() && !self.selected.is_empty()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            url: self.url.clone(),
            title: self.info.as_ref().and_then(|i| i.title.clone()),
            uploader: self.info.as_ref().and_then(|i| i.uploader.clone()),
            rows: self.table.rows().to_vec(),
            selected: self.selected.clone(),
            specifier: self.specifier(),
            can_fetch: self.can_fetch(),
            has_credential: self.credential.is_some(),
            notice: self.notice.clone(),
            output: self.output.as_ref().map(|f| OutputSummary {
                file_name: f.file_name.clone(),
                media_type: f.media_type.to_string(),
                size: f.bytes.len(),
            }),
        }
    }
}

/// What the page renders after each interaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub url: Option<String>,
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub rows: Vec<FormatRow>,
    pub selected: Vec<usize>,
    pub specifier: String,
    pub can_fetch: bool,
    pub has_credential: bool,
    pub notice: Option<Notice>,
    pub output: Option<OutputSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSummary {
    pub file_name: String,
    pub media_type: String,
    pub size: usize,
}
