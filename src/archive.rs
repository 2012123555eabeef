//! Day-keyed history of published payloads.
//!
//! The payload currently deployed on the live site is compared with today's
//! UTC date. When it was generated on an earlier day it is copied verbatim to
//! `archive/{date}.json` (once) and the date is upserted into `archive/index.json`,
//! which keeps only the most recent `retention` days, newest first.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::Config;
use crate::fetcher::SnapshotSource;
use crate::model::{ArchiveEntry, Snapshot};

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive io on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("archive encoding: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// Live artifact unreachable or not a JSON object
    NoSnapshot,
    /// `fetched_at` missing or not a date
    BadTimestamp,
    /// Live artifact is from today (or later)
    Current(NaiveDate),
    Archived {
        date: NaiveDate,
        /// `false` when the dated file already existed
        created: bool,
        days: usize,
    },
}

pub struct Archive {
    dir: PathBuf,
    index_path: PathBuf,
    retention: usize,
}

impl Archive {
    pub fn new(dir: impl Into<PathBuf>, retention: usize) -> Self {
        let dir = dir.into();
        Self {
            index_path: dir.join("index.json"),
            dir,
            retention,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            dir: config.archive_dir(),
            index_path: config.archive_index_path(),
            retention: config.archive_retention,
        }
    }

    pub fn day_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub async fn write_archive_if_needed<P: SnapshotSource>(
        &self,
        source: &P,
        today: NaiveDate,
    ) -> Result<ArchiveOutcome, ArchiveError> {
        let Some(snapshot) = source.fetch_previous_snapshot().await else {
            return Ok(ArchiveOutcome::NoSnapshot);
        };
        self.archive_snapshot(&snapshot, today)
    }

    pub fn archive_snapshot(
        &self,
        snapshot: &Snapshot,
        today: NaiveDate,
    ) -> Result<ArchiveOutcome, ArchiveError> {
        let Some(date) = snapshot.fetched_day() else {
            debug!("Live artifact has no usable fetched_at: {:?}", snapshot.fetched_at());
            return Ok(ArchiveOutcome::BadTimestamp);
        };
        if date >= today {
            debug!("Live artifact from {} is current", date);
            return Ok(ArchiveOutcome::Current(date));
        }

        fs::create_dir_all(&self.dir).map_err(|source| ArchiveError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let day_path = self.day_path(date);
        let created = !day_path.exists();
        if created {
            write_json(&day_path, snapshot.raw())?;
            info!("archive saved {}", day_path.display());
        }

        let entry = ArchiveEntry {
            date: date.format("%Y-%m-%d").to_string(),
            total: snapshot.total(),
        };
        let index = update_index(read_index(&self.index_path), entry, self.retention);
        write_json(&self.index_path, &index)?;
        info!("archive index updated: {} days", index.len());

        Ok(ArchiveOutcome::Archived {
            date,
            created,
            days: index.len(),
        })
    }
}

/// Reads the index, dropping anything that is not a `{date, ...}` object.
/// A missing or malformed file reads as empty.
pub fn read_index(path: &Path) -> Vec<ArchiveEntry> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };
    let Ok(Value::Array(values)) = serde_json::from_str::<Value>(&content) else {
        debug!("Ignoring malformed archive index {}", path.display());
        return Vec::new();
    };

    values
        .into_iter()
        .filter_map(|v| serde_json::from_value::<ArchiveEntry>(v).ok())
        .filter(|e| !e.date.is_empty())
        .collect()
}

/// Upserts `entry` by date and keeps the `retention` most recent dates, descending.
pub fn update_index(
    existing: Vec<ArchiveEntry>,
    entry: ArchiveEntry,
    retention: usize,
) -> Vec<ArchiveEntry> {
    let mut by_date: BTreeMap<String, ArchiveEntry> = existing
        .into_iter()
        .map(|e| (e.date.clone(), e))
        .collect();
    by_date.insert(entry.date.clone(), entry);

    by_date.into_values().rev().take(retention).collect()
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ArchiveError> {
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).map_err(|source| ArchiveError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn entry(date: &str, total: u64) -> ArchiveEntry {
        ArchiveEntry {
            date: date.to_string(),
            total,
        }
    }

    struct FixedSnapshot(Option<Value>);

    impl SnapshotSource for FixedSnapshot {
        async fn fetch_previous_snapshot(&self) -> Option<Snapshot> {
            self.0.clone().map(Snapshot::new)
        }
    }

    fn snapshot(fetched_at: &str, total: u64) -> FixedSnapshot {
        FixedSnapshot(Some(json!({
            "fetched_at": fetched_at,
            "total": total,
            "items": []
        })))
    }

    fn archive_in(temp: &TempDir) -> Archive {
        Archive::new(temp.path().join("archive"), 120)
    }

    mod index_tests {
        use super::*;

        #[test]
        fn test_upsert_replaces_same_date() {
            let index = update_index(
                vec![entry("2024-01-01", 3), entry("2024-01-02", 4)],
                entry("2024-01-01", 9),
                120,
            );

            assert_eq!(index, vec![entry("2024-01-02", 4), entry("2024-01-01", 9)]);
        }

        #[test]
        fn test_sorted_descending() {
            let index = update_index(
                vec![entry("2024-03-01", 1), entry("2023-12-31", 1)],
                entry("2024-01-15", 1),
                120,
            );

            let dates: Vec<_> = index.iter().map(|e| e.date.as_str()).collect();
            assert_eq!(dates, vec!["2024-03-01", "2024-01-15", "2023-12-31"]);
        }

        #[test]
        fn test_cap_keeps_most_recent() {
            let start = day("2024-01-01");
            let existing: Vec<_> = (0..120)
                .map(|i| {
                    let d = start + chrono::Duration::days(i);
                    entry(&d.format("%Y-%m-%d").to_string(), 10)
                })
                .collect();
            let newest = (start + chrono::Duration::days(120))
                .format("%Y-%m-%d")
                .to_string();

            let index = update_index(existing, entry(&newest, 10), 120);

            assert_eq!(index.len(), 120);
            assert_eq!(index[0].date, newest);
            assert!(index.iter().all(|e| e.date != "2024-01-01"));
            assert_eq!(index[119].date, "2024-01-02");
        }

        #[test]
        fn test_read_missing_and_malformed() {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join("index.json");
            assert!(read_index(&path).is_empty());

            fs::write(&path, "{not json").unwrap();
            assert!(read_index(&path).is_empty());

            fs::write(&path, r#"{"date":"2024-01-01"}"#).unwrap();
            assert!(read_index(&path).is_empty());
        }

        #[test]
        fn test_read_drops_bad_entries() {
            let temp = TempDir::new().unwrap();
            let path = temp.path().join("index.json");
            fs::write(
                &path,
                r#"[{"date":"2024-01-02","total":5},{"total":3},"junk",{"date":"2024-01-01"},{"date":""},{"date":"2023-12-31","total":null},{"date":"2023-12-30","total":4.0}]"#,
            )
            .unwrap();

            assert_eq!(
                read_index(&path),
                vec![
                    entry("2024-01-02", 5),
                    entry("2024-01-01", 0),
                    entry("2023-12-31", 0),
                    entry("2023-12-30", 4)
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_prior_day_archived_once() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(&temp);
        let source = snapshot("2024-01-01T18:30:00+00:00", 7);

        let first = archive
            .write_archive_if_needed(&source, day("2024-01-02"))
            .await
            .unwrap();
        assert_eq!(
            first,
            ArchiveOutcome::Archived {
                date: day("2024-01-01"),
                created: true,
                days: 1
            }
        );

        let day_path = archive.day_path(day("2024-01-01"));
        let saved: Value = serde_json::from_str(&fs::read_to_string(&day_path).unwrap()).unwrap();
        assert_eq!(saved["fetched_at"], "2024-01-01T18:30:00+00:00");
        assert_eq!(saved["total"], 7);

        // Re-running on the same day does not duplicate
        fs::write(&day_path, r#"{"marker":true}"#).unwrap();
        let second = archive
            .write_archive_if_needed(&source, day("2024-01-02"))
            .await
            .unwrap();
        assert_eq!(
            second,
            ArchiveOutcome::Archived {
                date: day("2024-01-01"),
                created: false,
                days: 1
            }
        );
        assert_eq!(fs::read_to_string(&day_path).unwrap(), r#"{"marker":true}"#);

        let files = fs::read_dir(temp.path().join("archive")).unwrap().count();
        assert_eq!(files, 2); // dated file + index
        assert_eq!(read_index(archive.index_path()), vec![entry("2024-01-01", 7)]);
    }

    #[tokio::test]
    async fn test_same_day_not_archived() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(&temp);

        let outcome = archive
            .write_archive_if_needed(&snapshot("2024-01-02T01:00:00Z", 3), day("2024-01-02"))
            .await
            .unwrap();

        assert_eq!(outcome, ArchiveOutcome::Current(day("2024-01-02")));
        assert!(!temp.path().join("archive").exists());
    }

    #[tokio::test]
    async fn test_future_date_not_archived() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(&temp);

        let outcome = archive
            .write_archive_if_needed(&snapshot("2024-02-01T00:00:00Z", 3), day("2024-01-02"))
            .await
            .unwrap();

        assert_eq!(outcome, ArchiveOutcome::Current(day("2024-02-01")));
    }

    #[tokio::test]
    async fn test_missing_snapshot() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(&temp);

        let outcome = archive
            .write_archive_if_needed(&FixedSnapshot(None), day("2024-01-02"))
            .await
            .unwrap();

        assert_eq!(outcome, ArchiveOutcome::NoSnapshot);
        assert!(!temp.path().join("archive").exists());
    }

    #[tokio::test]
    async fn test_unparseable_fetched_at() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(&temp);

        let outcome = archive
            .write_archive_if_needed(&snapshot("last tuesday", 3), day("2024-01-02"))
            .await
            .unwrap();

        assert_eq!(outcome, ArchiveOutcome::BadTimestamp);
        assert!(!temp.path().join("archive").exists());
    }

    #[tokio::test]
    async fn test_existing_index_merged() {
        let temp = TempDir::new().unwrap();
        let archive = archive_in(&temp);
        fs::create_dir_all(temp.path().join("archive")).unwrap();
        fs::write(
            archive.index_path(),
            r#"[{"date":"2023-12-30","total":10},{"date":"2023-12-31","total":8}]"#,
        )
        .unwrap();

        archive
            .write_archive_if_needed(&snapshot("2024-01-01T00:00:00Z", 5), day("2024-01-05"))
            .await
            .unwrap();

        assert_eq!(
            read_index(archive.index_path()),
            vec![
                entry("2024-01-01", 5),
                entry("2023-12-31", 8),
                entry("2023-12-30", 10)
            ]
        );
    }
}
