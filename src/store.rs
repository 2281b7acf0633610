use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::Workbook;
use serde::Serialize;
use tracing::{info, warn};

pub const KID_LIST_PATH: &str = "kid_values.csv";
pub const WORKBOOK_PATH: &str = "kirtan_data.xlsx";
pub const SHEET_NAME: &str = "Kirtan Data";

/// Excel rejects cell strings longer than this.
const MAX_CELL_CHARS: usize = 32_767;

pub const COLUMNS: [&str; 10] = [
    "kirtanName",
    "fullText",
    "primaryVerse",
    "melodyInfo",
    "creator",
    "nonStopLabel",
    "originLabel",
    "commentaryLabel",
    "photoUrl",
    "recordings",
];

/// One scraped detail page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KirtanRecord {
    pub kirtan_name: Option<String>,
    pub full_text: Option<String>,
    pub primary_verse: Option<String>,
    pub melody_info: Option<String>,
    pub creator: Option<String>,
    // Header cells only; the body cells next to them are not read.
    pub non_stop_label: Option<String>,
    pub origin_label: Option<String>,
    pub commentary_label: Option<String>,
    pub photo_url: Option<String>,
    pub recordings: Vec<RecordingEntry>,
}

/// One row of the audio/video table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingEntry {
    pub audio_link: Option<String>,
    pub gayak: Option<String>,
    pub rag: Option<String>,
    pub prakashak: Option<String>,
    pub recording_quality: Option<String>,
    pub swarkar: Option<String>,
    pub cd_name: Option<String>,
    #[serde(rename = "liveStudio")]
    pub live_or_studio: Option<String>,
    #[serde(rename = "audioVideo")]
    pub audio_or_video: Option<String>,
    pub rating: Option<String>,
}

impl RecordingEntry {
    pub fn is_empty(&self) -> bool {
        [
            &self.audio_link,
            &self.gayak,
            &self.rag,
            &self.prakashak,
            &self.recording_quality,
            &self.swarkar,
            &self.cd_name,
            &self.live_or_studio,
            &self.audio_or_video,
            &self.rating,
        ]
        .iter()
        .all(|f| f.is_none())
    }
}

impl KirtanRecord {
    /// Recordings flattened into a single JSON array cell.
    pub fn recordings_json(&self) -> String {
        serde_json::to_string(&self.recordings).unwrap_or_else(|_| "[]".to_string())
    }
}

// ── Identifier list ──

/// Append identifiers to the list file, one per line, followed by a blank
/// separator line. Existing content is never rewritten.
pub fn append_kids(path: &Path, kids: &[String]) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {} for append", path.display()))?;

    let mut batch = String::new();
    for kid in kids {
        batch.push_str(kid);
        batch.push('\n');
    }
    batch.push('\n');

    file.write_all(batch.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Read the identifier list in file order. Blank lines are skipped and
/// duplicates kept.
pub fn read_kids(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read identifier list {}", path.display()))?;
    Ok(parse_kid_lines(&content))
}

fn parse_kid_lines(content: &str) -> Vec<String> {
    content
        .lines()
        // older extractor runs left a trailing comma on the last id of a batch
        .map(|line| line.trim().trim_end_matches(',').trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Workbook ──

/// Cell values for each record, in `COLUMNS` order.
pub fn sheet_rows(records: &[KirtanRecord]) -> Vec<[Option<String>; 10]> {
    records
        .iter()
        .map(|r| {
            [
                r.kirtan_name.clone(),
                r.full_text.clone(),
                r.primary_verse.clone(),
                r.melody_info.clone(),
                r.creator.clone(),
                r.non_stop_label.clone(),
                r.origin_label.clone(),
                r.commentary_label.clone(),
                r.photo_url.clone(),
                Some(r.recordings_json()),
            ]
        })
        .collect()
}

pub fn write_workbook(path: &Path, records: &[KirtanRecord]) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }

    for (i, row) in sheet_rows(records).iter().enumerate() {
        let row_idx = (i + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let Some(text) = cell else { continue };
            let text = clamp_cell(text, row_idx, COLUMNS[col]);
            sheet.write_string(row_idx, col as u16, text.as_str())?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save workbook {}", path.display()))?;
    info!("Wrote {} rows to {}", records.len(), path.display());
    Ok(())
}

fn clamp_cell(text: &str, row: u32, column: &str) -> String {
    if text.chars().count() <= MAX_CELL_CHARS {
        return text.to_string();
    }
    warn!("Row {} column {} exceeds cell limit, truncating", row, column);
    text.chars().take(MAX_CELL_CHARS).collect()
}

/// Sheet names and the cell text of the data sheet, read from a saved workbook.
#[cfg(test)]
pub(crate) fn read_workbook(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    use calamine::{open_workbook, Reader, Xlsx};

    let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
    let names = workbook.sheet_names().to_vec();
    let range = workbook.worksheet_range(SHEET_NAME).unwrap();
    let rows = range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect();
    (names, rows)
}
