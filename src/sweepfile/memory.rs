//! Sweep files built in a fixed-size heap buffer, for callers that ship
//! the bytes somewhere other than a local directory.

use std::io::Cursor;

use dorade_core::SweepFileName;
use log::info;

use super::{sweep_file_name, SweepBuilder};
use crate::config::WriterConfig;
use crate::error::{Result, SweepFileError};
use crate::mapper::RayMapper;

type Buffer = Cursor<Box<[u8]>>;

struct OpenSweep {
    builder: SweepBuilder<Buffer>,
    name: SweepFileName,
}

/// Same sweep life cycle as [`super::SweepFileWriter`], into memory.
///
/// The buffer holds `memory_capacity` bytes and never grows: a sweep that
/// does not fit fails with an `io::ErrorKind::WriteZero` error and should
/// then be discarded with `end_sweepfile(true)`.
pub struct InMemorySweepFileWriter {
    config: WriterConfig,
    sweep_count_out: i32,
    open: Option<OpenSweep>,
    /// Buffer kept between sweeps, with the length of the last finished image
    spare: Option<(Box<[u8]>, usize)>,
    last_name: Option<SweepFileName>,
}

impl InMemorySweepFileWriter {
    pub fn new(config: WriterConfig) -> Result<Self> {
        config.validate()?;
        if config.memory_capacity == 0 {
            return Err(SweepFileError::Config("memoryCapacity must be positive".to_string()));
        }
        Ok(Self {
            config,
            sweep_count_out: 0,
            open: None,
            spare: None,
            last_name: None,
        })
    }

    pub fn capacity(&self) -> usize {
        self.config.memory_capacity
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn sweep_count(&self) -> i32 {
        self.sweep_count_out
    }

    pub fn num_rays(&self) -> usize {
        self.open.as_ref().map_or(0, |o| o.builder.num_rays())
    }

    /// Start a sweep, finishing any open one first. Returns the name the
    /// sweep would have on disk.
    pub fn begin_sweepfile(&mut self, mapper: &RayMapper, qualifier: &str, version: Option<i32>) -> Result<SweepFileName> {
        if self.open.is_some() {
            self.end_sweepfile(false)?;
        }
        let sweep_num = self.sweep_count_out + 1;

        let buf = match self.spare.take() {
            Some((buf, _)) if buf.len() == self.config.memory_capacity => buf,
            _ => vec![0u8; self.config.memory_capacity].into_boxed_slice(),
        };
        self.last_name = None;

        let name = sweep_file_name(mapper, sweep_num, version, qualifier);
        let builder = match SweepBuilder::begin(Cursor::new(buf), mapper, &self.config, sweep_num) {
            Ok(builder) => builder,
            Err((cursor, e)) => {
                self.spare = Some((cursor.into_inner(), 0));
                return Err(e);
            }
        };
        self.sweep_count_out = sweep_num;
        self.open = Some(OpenSweep {
            builder,
            name: name.clone(),
        });
        Ok(name)
    }

    pub fn add_to_sweepfile(&mut self, mapper: &RayMapper) -> Result<usize> {
        let open = self.open.as_mut().ok_or(SweepFileError::NotOpen)?;
        open.builder.add_ray(mapper)
    }

    /// Finish the open sweep and return the complete file image, or `None`
    /// when nothing was open or the sweep was discarded.
    pub fn end_sweepfile(&mut self, kill: bool) -> Result<Option<&[u8]>> {
        let Some(open) = self.open.take() else {
            return Ok(None);
        };

        let rays = open.builder.num_rays();
        if kill || rays < self.config.min_rays_per_sweep {
            let buf = open.builder.into_stream().into_inner();
            self.spare = Some((buf, 0));
            info!("Discarded in-memory sweep {} with {} rays", open.name.base_name(), rays);
            return Ok(None);
        }

        let (cursor, size) = open.builder.finish()?;
        info!(
            "Finished in-memory sweep {} ({} rays, {} bytes)",
            open.name.permanent_name(),
            rays,
            size
        );
        self.spare = Some((cursor.into_inner(), size as usize));
        self.last_name = Some(open.name);
        Ok(self.last_image())
    }

    /// Image of the last finished sweep, until the next one begins
    pub fn last_image(&self) -> Option<&[u8]> {
        match (&self.spare, &self.last_name) {
            (Some((buf, len)), Some(_)) => Some(&buf[..*len]),
            _ => None,
        }
    }

    /// Permanent name of the last finished sweep
    pub fn last_name(&self) -> Option<&SweepFileName> {
        self.last_name.as_ref()
    }

    pub fn seek_ray(&mut self, ray: usize) -> Result<()> {
        self.builder_mut()?.seek_ray(ray)
    }

    pub fn reread_ray(&mut self, ray: usize) -> Result<Vec<u8>> {
        self.builder_mut()?.reread_ray(ray)
    }

    pub fn rewrite_ray(&mut self, ray: usize, bytes: &[u8]) -> Result<()> {
        self.builder_mut()?.rewrite_ray(ray, bytes)
    }

    fn builder_mut(&mut self) -> Result<&mut SweepBuilder<Buffer>> {
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
    use std::io::ErrorKind;

    fn mapper(cells: usize) -> RayMapper {
        let mut m = RayMapper::new(RadarInfo::with_name("MEM"));
        m.add_field(ParameterInfo::new("DBZ", 100.0, 0.0));
        m.set_cells(CellVector::new((0..cells).map(|i| 100.0 * i as f32).collect()));
        m.set_samples(0, vec![7; cells]);
        m.set_time(Utc.with_ymd_and_hms(2023, 7, 4, 6, 0, 0).unwrap());
        m
    }

    fn writer(capacity: usize) -> InMemorySweepFileWriter {
        InMemorySweepFileWriter::new(WriterConfig {
            memory_capacity: capacity,
            ..WriterConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_image_returned() {
        let mut w = writer(64 * 1024);
        let m = mapper(10);
        let name = w.begin_sweepfile(&m, "MEM", None).unwrap();
        assert_eq!(name.radar, "MEM");
        w.add_to_sweepfile(&m).unwrap();
        w.add_to_sweepfile(&m).unwrap();

        let image = w.end_sweepfile(false).unwrap().unwrap().to_vec();
        assert_eq!(&image[..4], b"SSWB");
        assert_eq!(w.last_image().map(<[u8]>::len), Some(image.len()));
        assert!(w.last_name().is_some());
        assert!(!w.is_open());
    }

    #[test]
    fn test_buffer_reused_across_sweeps() {
        let mut w = writer(64 * 1024);
        let m = mapper(10);
        for _ in 0..3 {
            w.begin_sweepfile(&m, "", None).unwrap();
            assert!(w.last_image().is_none());
            w.add_to_sweepfile(&m).unwrap();
            assert!(w.end_sweepfile(false).unwrap().is_some());
        }
        assert_eq!(w.sweep_count(), 3);
    }

    #[test]
    fn test_overflow_is_write_zero() {
        let mut w = writer(4096);
        let m = mapper(500);
        w.begin_sweepfile(&m, "", None).unwrap();
        let mut result = Ok(0);
        for _ in 0..10 {
            result = w.add_to_sweepfile(&m);
            if result.is_err() {
                break;
            }
        }
        match result {
            Err(SweepFileError::Io(e)) => assert_eq!(e.kind(), ErrorKind::WriteZero),
            other => panic!("expected WriteZero, got {:?}", other),
        }
        assert_eq!(w.end_sweepfile(true).unwrap(), None);
    }

    #[test]
    fn test_failed_begin_keeps_buffer() {
        let mut w = writer(64 * 1024);
        let m = mapper(10);
        w.begin_sweepfile(&m, "", None).unwrap();
        w.add_to_sweepfile(&m).unwrap();
        w.end_sweepfile(false).unwrap();
        let before = w.spare.as_ref().map(|(buf, _)| buf.as_ptr());

        let too_wide = mapper(MAX_CELLS + 1);
        assert!(matches!(
            w.begin_sweepfile(&too_wide, "", None),
            Err(SweepFileError::TooManyCells(_))
        ));
        assert!(!w.is_open());
        assert_eq!(w.sweep_count(), 1);
        assert_eq!(w.spare.as_ref().map(|(buf, _)| buf.as_ptr()), before);
    }

    #[test]
    fn test_discard_below_minimum() {
        let mut w = InMemorySweepFileWriter::new(WriterConfig {
            min_rays_per_sweep: 5,
            memory_capacity: 64 * 1024,
            ..WriterConfig::default()
        })
        .unwrap();
        let m = mapper(10);
        w.begin_sweepfile(&m, "", None).unwrap();
        w.add_to_sweepfile(&m).unwrap();
        assert_eq!(w.end_sweepfile(false).unwrap(), None);
        assert!(w.last_image().is_none());
    }
}
