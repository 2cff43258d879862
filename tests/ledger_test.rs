//! Tests for the unmatched ledger and its directory exporter.

use std::sync::{Arc, Mutex};
use std::thread;

use tagwise::config::LedgerConfig;
use tagwise::{
    DirectoryExporter, ExportFormat, LedgerExporter, Result, TagwiseError, TrackFile,
    UnmatchedEntry, UnmatchedLedger,
};

fn entry(path: &str, reason: &str) -> UnmatchedEntry {
    UnmatchedEntry::for_track(
        &TrackFile::new(path)
            .format("mp3")
            .duration_secs(181.0)
            .tagged("Title", "Artist"),
        reason,
    )
}

/// Exporter that remembers every batch it was handed.
#[derive(Default)]
struct RecordingExporter {
    exports: Mutex<Vec<usize>>,
}

impl LedgerExporter for RecordingExporter {
    fn export(&self, entries: &[UnmatchedEntry]) -> Result<()> {
        self.exports.lock().unwrap().push(entries.len());
        Ok(())
    }
}

struct FailingExporter;

impl LedgerExporter for FailingExporter {
    fn export(&self, _entries: &[UnmatchedEntry]) -> Result<()> {
        Err(TagwiseError::Export("disk full".into()))
    }
}

#[test]
fn write_through_sees_every_append() {
    let exporter = Arc::new(RecordingExporter::default());
    let ledger = UnmatchedLedger::with_exporter(exporter.clone());

    ledger.record(entry("/a.mp3", "no match"));
    ledger.record(entry("/b.mp3", "no match"));

    assert_eq!(*exporter.exports.lock().unwrap(), vec![1, 2]);
}

#[test]
fn failing_write_through_keeps_the_entry() {
    let ledger = UnmatchedLedger::with_exporter(Arc::new(FailingExporter));
    ledger.record(entry("/a.mp3", "no match"));
    assert_eq!(ledger.len(), 1);
}

#[test]
fn export_and_clear_empties_only_on_success() {
    let ledger = UnmatchedLedger::new();
    ledger.record(entry("/a.mp3", "no match"));

    assert!(ledger.export_and_clear(&FailingExporter).is_err());
    assert_eq!(ledger.len(), 1);

    let exporter = RecordingExporter::default();
    assert_eq!(ledger.export_and_clear(&exporter).unwrap(), 1);
    assert!(ledger.is_empty());
}

#[test]
fn concurrent_records_are_never_lost_or_duplicated_by_drain() {
    let ledger = Arc::new(UnmatchedLedger::new());

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for i in 0..250 {
                    ledger.record(entry(&format!("/t{t}/{i}.mp3"), "no match"));
                }
            })
        })
        .collect();

    let mut drained = Vec::new();
    while writers.iter().any(|w| !w.is_finished()) {
        drained.extend(ledger.drain());
    }
    for writer in writers {
        writer.join().unwrap();
    }
    drained.extend(ledger.drain());

    assert_eq!(drained.len(), 1000);
    let mut paths: Vec<_> = drained.iter().map(|e| e.path.clone()).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 1000);
}

#[test]
fn directory_exporter_writes_all_formats() {
    let dir = tempfile::tempdir().unwrap();
    let exporter = DirectoryExporter::new(dir.path().join("unmatched"));
    let ledger = UnmatchedLedger::with_exporter(Arc::new(exporter.clone()));

    ledger.record(entry("/music/a.mp3", "no fingerprint match"));
    ledger.record(entry("/music/b.mp3", "lookup service error: 503"));

    for format in ExportFormat::ALL {
        assert!(exporter.file_path(format).exists(), "missing {format:?}");
    }

    let json = std::fs::read_to_string(exporter.file_path(ExportFormat::Json)).unwrap();
    let parsed: Vec<UnmatchedEntry> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, ledger.snapshot());

    let csv = std::fs::read_to_string(exporter.file_path(ExportFormat::Csv)).unwrap();
    assert_eq!(csv.lines().count(), 3);
    assert!(csv.contains("lookup service error: 503"));

    let import = std::fs::read_to_string(exporter.file_path(ExportFormat::ImportJson)).unwrap();
    let stubs: serde_json::Value = serde_json::from_str(&import).unwrap();
    assert_eq!(stubs[1]["path"], "/music/b.mp3");
    assert_eq!(stubs[1]["artist"], "Artist");
}

#[test]
fn ledger_from_config_writes_to_export_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = LedgerConfig {
        export_dir: Some(dir.path().to_path_buf()),
        write_through: true,
    };
    let ledger = UnmatchedLedger::from_config(&config);
    ledger.record(entry("/music/a.mp3", "no match"));

    assert!(dir.path().join("unmatched.html").exists());
    assert!(dir.path().join("unmatched_import.json").exists());
}
