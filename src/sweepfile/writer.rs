//! Sweep files on disk: written under a `.tmp` name and renamed into
//! place once the sweep is complete.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use super::{sweep_file_name, SweepBuilder};
use crate::config::WriterConfig;
use crate::error::{Result, SweepFileError};
use crate::mapper::RayMapper;

struct OpenSweep {
    builder: SweepBuilder<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
}

/// Writes one sweep file at a time.
///
/// `begin_sweepfile` opens a sweep, `add_to_sweepfile` appends rays and
/// `end_sweepfile` either commits it under its permanent name or throws
/// it away. Readers never open `.tmp` files, so the rename is the commit.
pub struct SweepFileWriter {
    config: WriterConfig,
    sweep_count_out: i32,
    open: Option<OpenSweep>,
}

impl SweepFileWriter {
    pub fn new(config: WriterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sweep_count_out: 0,
            open: None,
        })
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Sweeps begun by this writer
    pub fn sweep_count(&self) -> i32 {
        self.sweep_count_out
    }

    /// Rays in the open sweep
    pub fn num_rays(&self) -> usize {
        self.open.as_ref().map_or(0, |o| o.builder.num_rays())
    }

    pub fn tmp_path(&self) -> Option<&Path> {
        self.open.as_ref().map(|o| o.tmp_path.as_path())
    }

    /// Start a sweep in `dir` with the mapper's current ray as its first
    /// ray time. A sweep already open is finished first. Returns the
    /// temporary path being written.
    pub fn begin_sweepfile(
        &mut self,
        mapper: &RayMapper,
        dir: &Path,
        qualifier: &str,
        version: Option<i32>,
    ) -> Result<PathBuf> {
        if self.open.is_some() {
            self.end_sweepfile(false)?;
        }
        let sweep_num = self.sweep_count_out + 1;

        let name = sweep_file_name(mapper, sweep_num, version, qualifier);
        let tmp_path = dir.join(name.tmp_name());
        let final_path = dir.join(name.permanent_name());

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        let builder = match SweepBuilder::begin(file, mapper, &self.config, sweep_num) {
            Ok(builder) => builder,
            Err((file, e)) => {
                drop(file);
                if let Err(rm) = fs::remove_file(&tmp_path) {
                    warn!("Failed to remove {}: {}", tmp_path.display(), rm);
                }
                return Err(e);
            }
        };
        self.sweep_count_out = sweep_num;
        debug!("Opened sweep file {}", tmp_path.display());

        self.open = Some(OpenSweep {
            builder,
            tmp_path: tmp_path.clone(),
            final_path,
        });
        Ok(tmp_path)
    }

    /// Append the mapper's current ray; returns its ray number
    pub fn add_to_sweepfile(&mut self, mapper: &RayMapper) -> Result<usize> {
        let open = self.open.as_mut().ok_or(SweepFileError::NotOpen)?;
        open.builder.add_ray(mapper)
    }

    /// Finish the open sweep.
    ///
    /// With `kill`, or fewer rays than `min_rays_per_sweep`, the temporary
    /// file is removed and `None` is returned. Otherwise the trailer is
    /// written and the file renamed to its permanent name, which is
    /// returned. Returns `None` when no sweep is open.
    pub fn end_sweepfile(&mut self, kill: bool) -> Result<Option<PathBuf>> {
        let Some(open) = self.open.take() else {
            return Ok(None);
        };

        let rays = open.builder.num_rays();
        if kill || rays < self.config.min_rays_per_sweep {
            drop(open.builder.into_stream());
            fs::remove_file(&open.tmp_path)?;
            info!(
                "Discarded sweep file {} with {} rays",
                open.tmp_path.display(),
                rays
            );
            return Ok(None);
        }

        let (file, size) = open.builder.finish()?;
        file.sync_all()?;
        drop(file);
        fs::rename(&open.tmp_path, &open.final_path)?;
        info!(
            "Finished sweep file {} ({} rays, {} bytes)",
            open.final_path.display(),
            rays,
            size
        );
        Ok(Some(open.final_path))
    }

    /// Commit the open sweep
    pub fn commit(&mut self) -> Result<Option<PathBuf>> {
        self.end_sweepfile(false)
    }

    /// Discard the open sweep
    pub fn abort(&mut self) -> Result<()> {
        self.end_sweepfile(true).map(|_| ())
    }

    pub fn seek_ray(&mut self, ray: usize) -> Result<()> {
        self.builder_mut()?.seek_ray(ray)
    }

    pub fn reread_ray(&mut self, ray: usize) -> Result<Vec<u8>> {
        self.builder_mut()?.reread_ray(ray)
    }

    /// Patch a written ray. The replacement must have the same size.
    pub fn rewrite_ray(&mut self, ray: usize, bytes: &[u8]) -> Result<()> {
        self.builder_mut()?.rewrite_ray(ray, bytes)
    }

    fn builder_mut(&mut self) -> Result<&mut SweepBuilder<File>> {
        self.open
            .as_mut()
            .map(|o| &mut o.builder)
            .ok_or(SweepFileError::NotOpen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dorade_core::records::cells::MAX_CELLS;
    use dorade_core::records::{CellVector, ParameterInfo, RadarInfo};
    use tempfile::TempDir;

    fn create_test_writer(min_rays: usize) -> (SweepFileWriter, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = WriterConfig {
            min_rays_per_sweep: min_rays,
            ..WriterConfig::default()
        };
        (SweepFileWriter::new(config).unwrap(), temp_dir)
    }

    fn mapper() -> RayMapper {
        let mut m = RayMapper::new(RadarInfo::with_name("SPOL"));
        m.add_field(ParameterInfo::new("DBZ", 100.0, 0.0));
        m.set_cells(CellVector::new(vec![150.0, 300.0, 450.0]));
        m.set_samples(0, vec![1, 2, 3]);
        m.set_time(Utc.with_ymd_and_hms(2024, 3, 1, 12, 34, 56).unwrap());
        m.swib.fixed_angle = 0.5;
        m
    }

    #[test]
    fn test_commit_renames() {
        let (mut writer, temp) = create_test_writer(1);
        let m = mapper();
        let tmp = writer.begin_sweepfile(&m, temp.path(), "SUR", Some(2)).unwrap();
        assert!(tmp.exists());
        assert!(tmp.to_string_lossy().ends_with(".tmp"));
        writer.add_to_sweepfile(&m).unwrap();

        let path = writer.commit().unwrap().unwrap();
        assert!(!tmp.exists());
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, "swp.1240301123456.SPOL.2000.v1.s1.0.5_SUR");
        assert!(!writer.is_open());
    }

    #[test]
    fn test_too_few_rays_discarded() {
        let (mut writer, temp) = create_test_writer(3);
        let m = mapper();
        let tmp = writer.begin_sweepfile(&m, temp.path(), "", None).unwrap();
        writer.add_to_sweepfile(&m).unwrap();
        writer.add_to_sweepfile(&m).unwrap();
        assert_eq!(writer.end_sweepfile(false).unwrap(), None);
        assert!(!tmp.exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_abort_removes_tmp() {
        let (mut writer, temp) = create_test_writer(1);
        let m = mapper();
        let tmp = writer.begin_sweepfile(&m, temp.path(), "", None).unwrap();
        writer.add_to_sweepfile(&m).unwrap();
        writer.abort().unwrap();
        assert!(!tmp.exists());
    }

    #[test]
    fn test_begin_finishes_previous_sweep() {
        let (mut writer, temp) = create_test_writer(1);
        let m = mapper();
        writer.begin_sweepfile(&m, temp.path(), "A", None).unwrap();
        writer.add_to_sweepfile(&m).unwrap();
        writer.begin_sweepfile(&m, temp.path(), "B", None).unwrap();
        assert_eq!(writer.sweep_count(), 2);

        let names: Vec<String> = fs::read_dir(temp.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().any(|n| n.ends_with(".s1.0.5_A")));
        assert!(names.iter().any(|n| n.ends_with(".tmp")));
    }

    #[test]
    fn test_calls_without_open_sweep() {
        let (mut writer, _temp) = create_test_writer(1);
        assert_eq!(writer.end_sweepfile(false).unwrap(), None);
        assert!(matches!(
            writer.add_to_sweepfile(&mapper()),
            Err(SweepFileError::NotOpen)
        ));
        assert!(matches!(writer.reread_ray(0), Err(SweepFileError::NotOpen)));
    }

    #[test]
    fn test_missing_directory_fails() {
        let (mut writer, temp) = create_test_writer(1);
        let missing = temp.path().join("nope");
        assert!(matches!(
            writer.begin_sweepfile(&mapper(), &missing, "", None),
            Err(SweepFileError::Io(_))
        ));
        assert!(!writer.is_open());
    }

    #[test]
    fn test_failed_begin_leaves_no_tmp() {
        let (mut writer, temp) = create_test_writer(1);
        let mut m = mapper();
        m.set_cells(CellVector::new(vec![0.0; MAX_CELLS + 1]));
        assert!(matches!(
            writer.begin_sweepfile(&m, temp.path(), "", None),
            Err(SweepFileError::TooManyCells(_))
        ));
        assert!(!writer.is_open());
        assert_eq!(writer.sweep_count(), 0);
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);

        // The next sweep still gets the first sweep number
        let path = writer.begin_sweepfile(&mapper(), temp.path(), "", None).unwrap();
        assert!(path.to_string_lossy().contains(".s1."));
    }

    #[test]
    fn test_reread_and_rewrite() {
        let (mut writer, temp) = create_test_writer(1);
        let m = mapper();
        writer.begin_sweepfile(&m, temp.path(), "", None).unwrap();
        writer.add_to_sweepfile(&m).unwrap();
        let ray = writer.reread_ray(0).unwrap();
        writer.rewrite_ray(0, &ray).unwrap();
        writer.seek_ray(0).unwrap();
        assert!(writer.seek_ray(1).is_err());
        assert!(writer.commit().unwrap().is_some());
    }
}
