// SPDX-FileCopyrightText: 2026 Crashrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded on-disk FIFO store for crash reports that could not be delivered.
//!
//! Reports live as flat files named `crashreport01`, `crashreport02`, ...
//! inside the report directory. Ordinal 1 is always the newest report.
//! Saving shifts every existing file up by one ordinal and evicts the
//! oldest once the store is full, so the directory never holds more than
//! the configured limit.
//!
//! All mutating operations serialize on an internal mutex. Reads re-scan
//! the directory on every call, so externally added or removed files are
//! picked up without restarting.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crashrelay_core::{CrashrelayError, StoredReport};
use tracing::{debug, info};

/// Filename prefix for persisted reports; the ordinal suffix is zero-padded
/// to two digits.
const REPORT_FILE_PREFIX: &str = "crashreport";

/// Bounded FIFO of crash report files under a single directory.
pub struct ReportStore {
    dir: PathBuf,
    limit: usize,
    mutate: Mutex<()>,
}

impl ReportStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    ///
    /// `limit` is the maximum number of reports kept on disk; saving past
    /// it evicts the oldest report.
    pub fn new(dir: impl Into<PathBuf>, limit: usize) -> Result<Self, CrashrelayError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| CrashrelayError::Store {
            message: format!("failed to create report directory {}", dir.display()),
            source,
        })?;
        Ok(Self {
            dir,
            limit: limit.max(1),
            mutate: Mutex::new(()),
        })
    }

    /// The directory holding the report files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The maximum number of reports kept on disk.
    pub fn limit(&self) -> usize {
        self.limit
    }

    fn report_path(&self, ordinal: u32) -> PathBuf {
        self.dir.join(format!("{REPORT_FILE_PREFIX}{ordinal:02}"))
    }

    /// Lists the persisted reports, newest (ordinal 1) first in ordinal order.
    ///
    /// Scans the directory fresh on every call. Files whose names do not
    /// parse as `crashreportNN` are ignored.
    pub fn list(&self) -> Result<Vec<StoredReport>, CrashrelayError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| CrashrelayError::Store {
            message: format!("failed to read report directory {}", self.dir.display()),
            source,
        })?;

        let mut reports = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| CrashrelayError::Store {
                message: format!("failed to read entry in {}", self.dir.display()),
                source,
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(suffix) = name.strip_prefix(REPORT_FILE_PREFIX) else {
                continue;
            };
            let Ok(ordinal) = suffix.parse::<u32>() else {
                continue;
            };
            if ordinal == 0 {
                continue;
            }
            reports.push(StoredReport {
                ordinal,
                path: entry.path(),
            });
        }
        reports.sort_by_key(|r| r.ordinal);
        Ok(reports)
    }

    /// Persists a new report body as the newest entry (ordinal 1).
    ///
    /// Existing reports shift up by one ordinal, highest first, via copies
    /// rather than renames: a crash mid-shift leaves a duplicate at two
    /// ordinals instead of losing a report. Once the shifted count exceeds
    /// the limit, everything past the limit is deleted.
    pub fn save(&self, body: &str) -> Result<(), CrashrelayError> {
        let _guard = self.mutate.lock().unwrap_or_else(|e| e.into_inner());

        let existing = self.list()?;
        for report in existing.iter().rev() {
            let shifted = self.report_path(report.ordinal + 1);
            fs::copy(&report.path, &shifted).map_err(|source| CrashrelayError::Store {
                message: format!(
                    "failed to shift report {} to {}",
                    report.path.display(),
                    shifted.display()
                ),
                source,
            })?;
        }

        let newest = self.report_path(1);
        fs::write(&newest, body).map_err(|source| CrashrelayError::Store {
            message: format!("failed to write report {}", newest.display()),
            source,
        })?;

        for report in &existing {
            if report.ordinal as usize >= self.limit {
                let evicted = self.report_path(report.ordinal + 1);
                fs::remove_file(&evicted).map_err(|source| CrashrelayError::Store {
                    message: format!("failed to evict report {}", evicted.display()),
                    source,
                })?;
                debug!(path = %evicted.display(), "evicted oldest report at store limit");
            }
        }

        info!(
            stored = (existing.len() + 1).min(self.limit),
            limit = self.limit,
            "crash report persisted for later delivery"
        );
        Ok(())
    }

    /// Deletes every persisted report. Idempotent: purging an empty store
    /// succeeds and does nothing.
    pub fn purge(&self) -> Result<(), CrashrelayError> {
        let _guard = self.mutate.lock().unwrap_or_else(|e| e.into_inner());

        let reports = self.list()?;
        if reports.is_empty() {
            debug!("report store already empty");
            return Ok(());
        }
        for report in &reports {
            fs::remove_file(&report.path).map_err(|source| CrashrelayError::Store {
                message: format!("failed to delete report {}", report.path.display()),
                source,
            })?;
        }
        info!(count = reports.len(), "purged offline reports");
        Ok(())
    }

    /// Number of reports currently on disk.
    pub fn count(&self) -> Result<usize, CrashrelayError> {
        Ok(self.list()?.len())
    }

    /// Whether the store holds no reports.
    pub fn is_empty(&self) -> Result<bool, CrashrelayError> {
        Ok(self.list()?.is_empty())
    }
}
