//! Export formats for the unmatched ledger.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::types::UnmatchedEntry;
use crate::{Result, TagwiseError};

/// Receives the ledger's entries for export.
///
/// Called with the ledger locked; the slice is complete and does not change
/// while the call runs.
pub trait LedgerExporter: Send + Sync {
    fn export(&self, entries: &[UnmatchedEntry]) -> Result<()>;
}

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One row per entry.
    Csv,
    /// Pretty-printed array of full entries.
    Json,
    /// Standalone HTML page with a table.
    Html,
    /// Minimal stubs for a manual-tagging tool.
    ImportJson,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Csv,
        ExportFormat::Json,
        ExportFormat::Html,
        ExportFormat::ImportJson,
    ];

    /// File name used by [`DirectoryExporter`].
    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Csv => "unmatched.csv",
            ExportFormat::Json => "unmatched.json",
            ExportFormat::Html => "unmatched.html",
            ExportFormat::ImportJson => "unmatched_import.json",
        }
    }

    /// Render entries in this format.
    pub fn render(self, entries: &[UnmatchedEntry]) -> Result<String> {
        match self {
            ExportFormat::Csv => render_csv(entries),
            ExportFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
            ExportFormat::Html => Ok(render_html(entries)),
            ExportFormat::ImportJson => {
                let stubs: Vec<ImportStub<'_>> = entries.iter().map(ImportStub::from).collect();
                Ok(serde_json::to_string_pretty(&stubs)?)
            }
        }
    }
}

/// Entry shape expected by manual-tagging import.
#[derive(Debug, Serialize)]
pub struct ImportStub<'a> {
    pub path: &'a Path,
    pub title: &'a str,
    pub artist: &'a str,
    pub album: &'a str,
}

impl<'a> From<&'a UnmatchedEntry> for ImportStub<'a> {
    fn from(entry: &'a UnmatchedEntry) -> Self {
        Self {
            path: &entry.path,
            title: entry.title.as_deref().unwrap_or(""),
            artist: entry.artist.as_deref().unwrap_or(""),
            album: entry.album.as_deref().unwrap_or(""),
        }
    }
}

const COLUMNS: [&str; 9] = [
    "recorded_at",
    "path",
    "format",
    "duration_secs",
    "title",
    "artist",
    "album",
    "reason",
    "fingerprint",
];

fn columns(entry: &UnmatchedEntry) -> [String; 9] {
    [
        entry.recorded_at.to_rfc3339(),
        entry.path.display().to_string(),
        entry.format.clone(),
        entry
            .duration_secs
            .map(|d| format!("{d:.1}"))
            .unwrap_or_default(),
        entry.title.clone().unwrap_or_default(),
        entry.artist.clone().unwrap_or_default(),
        entry.album.clone().unwrap_or_default(),
        entry.reason.clone(),
        entry.fingerprint.clone().unwrap_or_default(),
    ]
}

fn render_csv(entries: &[UnmatchedEntry]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    for entry in entries {
        writer.write_record(columns(entry))?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| TagwiseError::Export(format!("failed to flush CSV: {e}")))?;
    String::from_utf8(data).map_err(|e| TagwiseError::Export(format!("invalid UTF-8 in CSV: {e}")))
}

fn render_html(entries: &[UnmatchedEntry]) -> String {
    let mut out = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Unmatched tracks</title>\n</head>\n<body>\n",
    );
    let _ = writeln!(out, "<h1>Unmatched tracks ({})</h1>", entries.len());
    out.push_str("<table>\n<tr>");
    for column in COLUMNS {
        let _ = write!(out, "<th>{}</th>", escape_html(column));
    }
    out.push_str("</tr>\n");
    for entry in entries {
        out.push_str("<tr>");
        for value in columns(entry) {
            let _ = write!(out, "<td>{}</td>", escape_html(&value));
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n</body>\n</html>\n");
    out
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Writes every [`ExportFormat`] into one directory.
#[derive(Debug, Clone)]
pub struct DirectoryExporter {
    dir: PathBuf,
}

impl DirectoryExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for `format`.
    pub fn file_path(&self, format: ExportFormat) -> PathBuf {
        self.dir.join(format.file_name())
    }
}

impl LedgerExporter for DirectoryExporter {
    fn export(&self, entries: &[UnmatchedEntry]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        for format in ExportFormat::ALL {
            let rendered = format.render(entries)?;
            let path = self.file_path(format);
            let tmp = self.dir.join(format!("{}.tmp", format.file_name()));
            fs::write(&tmp, rendered)?;
            fs::rename(&tmp, &path)?;
        }
        debug!(dir = %self.dir.display(), entries = entries.len(), "exported unmatched ledger");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackFile;

    fn entry() -> UnmatchedEntry {
        UnmatchedEntry::for_track(
            &TrackFile::new("/music/a, b.flac")
                .format("flac")
                .duration_secs(212.4)
                .tagged("<Intro>", "Tom & Jerry"),
            "no fingerprint match",
        )
    }

    #[test]
    fn csv_has_header_and_quotes_commas() {
        let csv = ExportFormat::Csv.render(&[entry()]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("recorded_at,path,format,duration_secs,title,artist,album,reason,fingerprint")
        );
        let row = lines.next().unwrap();
        assert!(row.contains("\"/music/a, b.flac\""));
        assert!(row.contains("212.4"));
    }

    #[test]
    fn html_escapes_values() {
        let html = ExportFormat::Html.render(&[entry()]).unwrap();
        assert!(html.contains("&lt;Intro&gt;"));
        assert!(html.contains("Tom &amp; Jerry"));
        assert!(!html.contains("<Intro>"));
    }

    #[test]
    fn import_json_has_stub_fields_only() {
        let json = ExportFormat::ImportJson.render(&[entry()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let stub = &value[0];
        assert_eq!(stub["title"], "<Intro>");
        assert_eq!(stub["album"], "");
        assert!(stub.get("reason").is_none());
    }

    #[test]
    fn empty_ledger_renders_empty_documents() {
        assert_eq!(ExportFormat::Json.render(&[]).unwrap(), "[]");
        assert_eq!(ExportFormat::Csv.render(&[]).unwrap().lines().count(), 1);
    }
}
