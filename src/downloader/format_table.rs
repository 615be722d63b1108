// FormatTable - projects raw extractor formats into selectable rows
//
// Every discovery rebuilds the table wholesale. Rows keep the extractor's
// order, minus entries that carry neither a video nor an audio stream.

use serde::{Deserialize, Serialize};

use super::errors::DownloadError;
use super::models::RawFormat;

/// What a row carries, judged by its video codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Video,
    Audio,
}

/// One row of the selection grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatRow {
    /// Format ID handed to the downloader
    pub id: String,
    pub kind: FormatKind,
    /// Container extension
    pub ext: String,
    /// "1920x1080" or "Audio Only"
    pub resolution: String,
    /// "100.00 MB" or "Unknown"
    pub size: String,
    /// "avc1.640028 + none"
    pub codecs: String,
    pub note: String,
}

impl FormatRow {
    pub fn from_raw(f: &RawFormat) -> Self {
        let vcodec = f.vcodec.clone().unwrap_or_else(|| "none".to_string());
        let acodec = f.acodec.clone().unwrap_or_else(|| "none".to_string());

        Self {
            id: f.format_id.clone(),
            kind: if vcodec != "none" {
                FormatKind::Video
            } else {
                FormatKind::Audio
            },
            ext: f.ext.clone().unwrap_or_default(),
            resolution: resolution_label(f.width, f.height),
            size: size_label(f.effective_size()),
            codecs: format!("{} + {}", vcodec, acodec),
            note: f.format_note.clone().unwrap_or_default(),
        }
    }
}

/// Ordered rows derived from one discovery call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatTable {
    rows: Vec<FormatRow>,
}

impl FormatTable {
    /// Build rows from raw formats, dropping stream-less entries
    pub fn from_raw(formats: &[RawFormat]) -> Self {
        let rows = formats
            .iter()
            .filter(|f| !f.has_no_streams())
            .map(FormatRow::from_raw)
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[FormatRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sort and de-duplicate a submitted selection; any index past the end
    /// rejects the whole selection.
    pub fn normalize_selection(&self, rows: &[usize]) -> Result<Vec<usize>, DownloadError> {
        let mut selected = rows.to_vec();
        selected.sort_unstable();
        selected.dedup();

        if let Some(&index) = selected.iter().find(|&&i| i >= self.rows.len()) {
            return Err(DownloadError::InvalidSelection {
                index,
                rows: self.rows.len(),
            });
        }

        Ok(selected)
    }

    /// `+`-join of the selected identifiers in table order, e.g. "137+140".
    /// Indices must already be normalized; unknown ones are skipped.
    pub fn composite_specifier(&self, selected: &[usize]) -> String {
        self.rows
            .iter()
            .enumerate()
            .filter(|(i, _)| selected.contains(i))
            .map(|(_, row)| row.id.as_str())
            .collect::<Vec<_>>()
            .join("+")
    }
}

/// Resolution label; a missing or zero width means audio
pub fn resolution_label(width: Option<u32>, height: Option<u32>) -> String {
    match width {
        Some(w) if w > 0 => match height {
            Some(h) => format!("{}x{}", w, h),
            None => format!("{}x?", w),
        },
        _ => "Audio Only".to_string(),
    }
}

/// Size in MiB with two decimals, "Unknown" when not reported
pub fn size_label(bytes: Option<f64>) -> String {
    match bytes {
        Some(b) if b > 0.0 => format!("{:.2} MB", b / 1024.0 / 1024.0),
        _ => "Unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(id: &str, width: u32, height: u32) -> RawFormat {
        RawFormat {
            format_id: id.to_string(),
            ext: Some("mp4".to_string()),
            width: Some(width),
            height: Some(height),
            vcodec: Some("avc1.640028".to_string()),
            acodec: Some("none".to_string()),
            ..Default::default()
        }
    }

    fn audio(id: &str) -> RawFormat {
        RawFormat {
            format_id: id.to_string(),
            ext: Some("m4a".to_string()),
            vcodec: Some("none".to_string()),
            acodec: Some("mp4a.40.2".to_string()),
            format_note: Some("medium".to_string()),
            ..Default::default()
        }
    }

    fn storyboard(id: &str) -> RawFormat {
        RawFormat {
            format_id: id.to_string(),
            ext: Some("mhtml".to_string()),
            vcodec: Some("none".to_string()),
            acodec: Some("none".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_streamless_entries_are_dropped() {
        let table = FormatTable::from_raw(&[
            storyboard("sb0"),
            video("137", 1920, 1080),
            storyboard("sb1"),
            audio("140"),
        ]);

        let ids: Vec<&str> = table.rows().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["137", "140"]);
    }

    #[test]
    fn test_size_labels() {
        let exact = RawFormat {
            filesize: Some(104_857_600.0),
            ..Default::default()
        };
        assert_eq!(size_label(exact.effective_size()), "100.00 MB");

        let approx = RawFormat {
            filesize_approx: Some(1_572_864.0),
            ..Default::default()
        };
        assert_eq!(size_label(approx.effective_size()), "1.50 MB");

        let unknown = RawFormat::default();
        assert_eq!(size_label(unknown.effective_size()), "Unknown");
    }

    #[test]
    fn test_resolution_labels() {
        assert_eq!(resolution_label(Some(1920), Some(1080)), "1920x1080");
        assert_eq!(resolution_label(None, None), "Audio Only");
        assert_eq!(resolution_label(Some(0), Some(0)), "Audio Only");
    }

    #[test]
    fn test_row_projection() {
        let row = FormatRow::from_raw(&audio("140"));
        assert_eq!(row.kind, FormatKind::Audio);
        assert_eq!(row.resolution, "Audio Only");
        assert_eq!(row.codecs, "none + mp4a.40.2");
        assert_eq!(row.note, "medium");

        let mut muxed = video("18", 640, 360);
        muxed.acodec = None;
        let row = FormatRow::from_raw(&muxed);
        assert_eq!(row.kind, FormatKind::Video);
        assert_eq!(row.codecs, "avc1.640028 + none");
    }

    #[test]
    fn test_specifier_follows_table_order() {
        let table = FormatTable::from_raw(&[
            video("137", 1920, 1080),
            video("136", 1280, 720),
            audio("140"),
        ]);

        let selected = table.normalize_selection(&[2, 0, 2]).unwrap();
        assert_eq!(selected, vec![0, 2]);
        assert_eq!(table.composite_specifier(&selected), "137+140");
    }

    #[test]
    fn test_empty_selection_gives_empty_specifier() {
        let table = FormatTable::from_raw(&[video("137", 1920, 1080)]);
        assert_eq!(table.composite_specifier(&[]), "");
    }

    #[test]
    fn test_out_of_range_selection_is_rejected() {
        let table = FormatTable::from_raw(&[audio("140")]);
        assert_eq!(
            table.normalize_selection(&[0, 4]),
            Err(DownloadError::InvalidSelection { index: 4, rows: 1 })
        );
    }

    #[test]
    fn test_two_video_streams_are_not_validated() {
        let table = FormatTable::from_raw(&[video("137", 1920, 1080), video("136", 1280, 720)]);
        assert_eq!(table.composite_specifier(&[0, 1]), "137+136");
    }
}
