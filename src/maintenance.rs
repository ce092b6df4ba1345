//! Housekeeping for directories of sweep files: listing, retention and
//! mirroring.
//!
//! Names sort chronologically because of the embedded timestamp, so the
//! listings are plain lexicographic sorts. Files still being written carry
//! a `.tmp` suffix and are never listed, cleaned or mirrored.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use dorade_core::filename::TMP_SUFFIX;
use dorade_core::SweepFileName;

use crate::error::Result;

/// Prefix of sweep-file names
pub const DEFAULT_PREFIX: &str = "swp";

/// Prefix value that disables prefix filtering
pub const NO_PREFIX: &str = "NONE";

/// A directory of sweep files
pub struct SweepDirectory {
    dir: PathBuf,
    prefix: String,
}

impl SweepDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    /// Use another name prefix; [`NO_PREFIX`] lists every file
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)?.flatten() {
            if !entry.path().is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => warn!("Skipping non UTF-8 file name {:?} in {}", name, self.dir.display()),
            }
        }
        Ok(names)
    }

    fn has_prefix(&self, name: &str) -> bool {
        self.prefix == NO_PREFIX || name.starts_with(&self.prefix)
    }

    /// Sorted names with the prefix, optionally required to end with
    /// `suffix` and not to end with `exclude_suffix`
    pub fn list(&self, suffix: Option<&str>, exclude_suffix: Option<&str>) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .names()?
            .into_iter()
            .filter(|n| self.has_prefix(n) && !n.ends_with(TMP_SUFFIX))
            .filter(|n| suffix.is_none_or(|s| n.ends_with(s)))
            .filter(|n| exclude_suffix.is_none_or(|s| !n.ends_with(s)))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Sweep files that are still being written, or were left behind
    pub fn list_tmp(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .names()?
            .into_iter()
            .filter(|n| self.has_prefix(n) && n.ends_with(TMP_SUFFIX))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Sweep files with timestamps in `[t1, t2]`, oldest first
    pub fn list_between(&self, t1: DateTime<Utc>, t2: DateTime<Utc>) -> Result<Vec<String>> {
        let mut timed: Vec<(DateTime<Utc>, String)> = self
            .list(None, None)?
            .into_iter()
            .map(|n| (SweepFileName::parse(&n).time, n))
            .filter(|(t, _)| *t >= t1 && *t <= t2)
            .collect();
        timed.sort();
        Ok(timed.into_iter().map(|(_, n)| n).collect())
    }

    /// Seconds between the oldest and newest sweep file
    pub fn time_span(&self) -> Result<f64> {
        let names = self.list(None, None)?;
        if names.len() < 2 {
            return Ok(0.0);
        }
        let times: Vec<f64> = names.iter().map(|n| SweepFileName::parse(n).epoch_seconds()).collect();
        let first = times.iter().copied().fold(f64::INFINITY, f64::min);
        let last = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Ok(last - first)
    }

    /// Delete the oldest sweep files.
    ///
    /// Without a time span, all but the newest `keep` files go. With one,
    /// files older than the newest minus `span_secs` go, but never so many
    /// that fewer than `keep` remain. `keep == 0` does nothing. Returns
    /// the number of files deleted.
    pub fn clean(&self, keep: usize, span_secs: Option<f64>) -> Result<usize> {
        if keep < 1 {
            return Ok(0);
        }
        let names = self.list(None, None)?;
        if names.len() <= keep {
            return Ok(0);
        }

        let doomed: Vec<&String> = match span_secs.filter(|s| *s > 0.0) {
            Some(span) => {
                let newest = names
                    .iter()
                    .map(|n| SweepFileName::parse(n).epoch_seconds())
                    .fold(f64::NEG_INFINITY, f64::max);
                let cutoff = newest - span;
                let mut remaining = names.len();
                names
                    .iter()
                    .take_while(|n| {
                        let go = remaining > keep && SweepFileName::parse(n).epoch_seconds() < cutoff;
                        if go {
                            remaining -= 1;
                        }
                        go
                    })
                    .collect()
            }
            None => names.iter().take(names.len() - keep).collect(),
        };

        let deleted = doomed.into_iter().filter(|n| self.remove(n)).count();
        if deleted > 0 {
            info!("Cleaned {} sweep files from {}", deleted, self.dir.display());
        }
        Ok(deleted)
    }

    /// Delete sweep files here that `reference` does not have. Returns the
    /// number of files deleted.
    pub fn mirror(&self, reference: &SweepDirectory) -> Result<usize> {
        let mine = self.list(None, None)?;
        if mine.is_empty() {
            return Ok(0);
        }
        let theirs = reference.list(None, None)?;
        let deleted = mine
            .iter()
            .filter(|n| theirs.binary_search(*n).is_err())
            .filter(|n| self.remove(n))
            .count();
        debug!(
            "Mirrored {} against {}: {} deleted",
            self.dir.display(),
            reference.dir.display(),
            deleted
        );
        Ok(deleted)
    }

    fn remove(&self, name: &str) -> bool {
        let path = self.dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                true
            }
            Err(e) => {
                error!("Failed to delete {}: {}", path.display(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_dir(names: &[&str]) -> (SweepDirectory, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        for n in names {
            fs::write(temp_dir.path().join(n), b"x").unwrap();
        }
        (SweepDirectory::new(temp_dir.path()), temp_dir)
    }

    // 2024-03-01 12:00:00, 12:10:00, 12:20:00, 12:30:00
    const SWEEPS: [&str; 4] = [
        "swp.1240301120000.SPOL.0.v1.s1.0.5_SUR",
        "swp.1240301121000.SPOL.0.v1.s2.1.5_SUR",
        "swp.1240301122000.SPOL.0.v1.s3.2.5_SUR",
        "swp.1240301123000.SPOL.0.v1.s4.3.5_SUR",
    ];

    #[test]
    fn test_list_filters_and_sorts() {
        let (dir, _temp) = create_test_dir(&[
            SWEEPS[2],
            SWEEPS[0],
            "swp.1240301124000.SPOL.0.v1.s5.tmp",
            "notes.txt",
        ]);
        assert_eq!(dir.list(None, None).unwrap(), vec![SWEEPS[0], SWEEPS[2]]);
        assert_eq!(dir.list_tmp().unwrap().len(), 1);
        assert_eq!(dir.list(Some("2.5_SUR"), None).unwrap(), vec![SWEEPS[2]]);
        assert_eq!(dir.list(None, Some("2.5_SUR")).unwrap(), vec![SWEEPS[0]]);

        let all = SweepDirectory::new(dir.path()).with_prefix(NO_PREFIX);
        assert_eq!(all.list(None, None).unwrap().len(), 3);
    }

    #[test]
    fn test_list_between() {
        let (dir, _temp) = create_test_dir(&SWEEPS);
        let t1 = SweepFileName::parse(SWEEPS[1]).time;
        let t2 = SweepFileName::parse(SWEEPS[2]).time;
        assert_eq!(dir.list_between(t1, t2).unwrap(), vec![SWEEPS[1], SWEEPS[2]]);
    }

    #[test]
    fn test_time_span() {
        let (dir, _temp) = create_test_dir(&SWEEPS);
        assert_eq!(dir.time_span().unwrap(), 1800.0);
        let (single, _temp) = create_test_dir(&SWEEPS[..1]);
        assert_eq!(single.time_span().unwrap(), 0.0);
    }

    #[test]
    fn test_clean_keeps_newest() {
        let (dir, _temp) = create_test_dir(&SWEEPS);
        assert_eq!(dir.clean(0, None).unwrap(), 0);
        assert_eq!(dir.clean(3, None).unwrap(), 1);
        assert_eq!(dir.list(None, None).unwrap(), SWEEPS[1..].to_vec());
        assert_eq!(dir.clean(10, None).unwrap(), 0);
    }

    #[test]
    fn test_clean_by_time_span() {
        let (dir, _temp) = create_test_dir(&SWEEPS);
        // Older than 12:15 goes, but at least one file stays
        assert_eq!(dir.clean(1, Some(900.0)).unwrap(), 2);
        assert_eq!(dir.list(None, None).unwrap(), SWEEPS[2..].to_vec());

        let (dir, _temp) = create_test_dir(&SWEEPS);
        // Keep count wins over the span
        assert_eq!(dir.clean(3, Some(60.0)).unwrap(), 1);
    }

    #[test]
    fn test_mirror() {
        let (reference, _t1) = create_test_dir(&SWEEPS[1..3]);
        let (mirror, _t2) = create_test_dir(&SWEEPS);
        assert_eq!(mirror.mirror(&reference).unwrap(), 2);
        assert_eq!(mirror.list(None, None).unwrap(), SWEEPS[1..3].to_vec());
    }
}
