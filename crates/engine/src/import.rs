//! Bulk import of per-user achievement snapshot files.
//!
//! Each file is named `<uuid>.json` and maps achievement keys to a
//! progress object with a `done` flag and per-criterion completion
//! dates. Only finished achievements are imported; the completion time
//! is the latest criterion date. One bad file never aborts the run.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use questboard_core::{AchievementKey, UserId};
use questboard_storage::Store;

use crate::error::EngineError;
use crate::{Leaderboard, RecordOutcome};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
const PROGRESS_EVERY: u64 = 10;

#[derive(Debug, Deserialize)]
struct ProgressEntry {
    #[serde(default)]
    done: bool,
    #[serde(default)]
    criteria: BTreeMap<String, String>,
}

/// One finished achievement pulled out of a snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCompletion {
    pub achievement: AchievementKey,
    pub completed_at: DateTime<Utc>,
}

/// Everything importable from one snapshot file.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub user: UserId,
    pub completions: Vec<SnapshotCompletion>,
}

/// Parses snapshot files into [`Snapshot`]s.
pub struct SnapshotReader;

impl SnapshotReader {
    /// Read one `<uuid>.json` file. The file name carries the user id.
    pub fn read_file(path: &Path) -> Result<Snapshot, EngineError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| EngineError::Import(format!("unreadable file name: {}", path.display())))?;
        let uuid = Uuid::parse_str(stem)
            .map_err(|e| EngineError::Import(format!("file name is not a uuid ({stem}): {e}")))?;
        let text = fs::read_to_string(path)
            .map_err(|e| EngineError::Import(format!("read {}: {e}", path.display())))?;
        Self::parse(UserId::from_uuid(uuid), &text)
    }

    /// Parse snapshot JSON for a known user. Non-achievement keys such
    /// as `DataVersion` are skipped, as is anything not marked done.
    pub fn parse(user: UserId, json: &str) -> Result<Snapshot, EngineError> {
        let root: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| EngineError::Import(format!("malformed snapshot: {e}")))?;

        let mut completions = Vec::new();
        for (key, value) in root {
            if !value.is_object() {
                // Metadata like DataVersion.
                continue;
            }
            let entry: ProgressEntry = serde_json::from_value(value)
                .map_err(|e| EngineError::Import(format!("entry {key}: {e}")))?;
            if !entry.done {
                continue;
            }
            completions.push(SnapshotCompletion {
                achievement: AchievementKey::new(key.as_str()),
                completed_at: latest_criterion_date(&key, &entry.criteria),
            });
        }
        Ok(Snapshot { user, completions })
    }
}

/// The completion time is the latest criterion date. Missing or
/// unparseable dates fall back to now so the row still lands.
fn latest_criterion_date(key: &str, criteria: &BTreeMap<String, String>) -> DateTime<Utc> {
    let latest = criteria.values().max();
    match latest {
        Some(raw) => match DateTime::parse_from_str(raw, DATE_FORMAT) {
            Ok(parsed) => parsed.with_timezone(&Utc),
            Err(e) => {
                warn!(achievement = key, date = raw, error = %e, "unparseable criterion date, using now");
                Utc::now()
            }
        },
        None => {
            warn!(achievement = key, "done entry without criteria, using now");
            Utc::now()
        }
    }
}

/// Counters for one import run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportStats {
    pub files_seen: u64,
    pub files_imported: u64,
    pub files_failed: u64,
    pub recorded: u64,
    pub duplicates: u64,
    pub excluded: u64,
}

impl ImportStats {
    pub fn report(&self) -> String {
        format!(
            "imported {}/{} files ({} failed): {} completions recorded, {} duplicates, {} excluded",
            self.files_imported,
            self.files_seen,
            self.files_failed,
            self.recorded,
            self.duplicates,
            self.excluded,
        )
    }
}

/// Walks a directory of snapshot files and records every completion.
pub struct Importer;

impl Importer {
    /// Import every `*.json` file in `dir`. A file that fails to parse
    /// is counted and skipped; the rest of the run continues.
    pub fn import_dir<S: Store>(
        board: &mut Leaderboard<S>,
        dir: &Path,
    ) -> Result<ImportStats, EngineError> {
        let mut paths: Vec<_> = fs::read_dir(dir)
            .map_err(|e| EngineError::Import(format!("read dir {}: {e}", dir.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut stats = ImportStats::default();
        for path in paths {
            stats.files_seen += 1;
            match Self::import_file(board, &path, &mut stats) {
                Ok(()) => stats.files_imported += 1,
                Err(e) => {
                    stats.files_failed += 1;
                    warn!(file = %path.display(), error = %e, "snapshot import failed");
                }
            }
            if stats.files_seen % PROGRESS_EVERY == 0 {
                info!(
                    files = stats.files_seen,
                    recorded = stats.recorded,
                    "import progress"
                );
            }
        }
        info!(report = %stats.report(), "import finished");
        Ok(stats)
    }

    fn import_file<S: Store>(
        board: &mut Leaderboard<S>,
        path: &Path,
        stats: &mut ImportStats,
    ) -> Result<(), EngineError> {
        let snapshot = SnapshotReader::read_file(path)?;
        // Imports have no better name source than the id itself; the
        // next live sighting overwrites it.
        let name = snapshot.user.to_string();
        for completion in snapshot.completions {
            let outcome = board.record(
                snapshot.user,
                &name,
                &completion.achievement,
                Some(completion.completed_at),
            )?;
            match outcome {
                RecordOutcome::Recorded(_) => stats.recorded += 1,
                RecordOutcome::AlreadyRecorded(_) => stats.duplicates += 1,
                RecordOutcome::Excluded => stats.excluded += 1,
            }
        }
        Ok(())
    }
}
