//! Sequential and random access to the rays of a sweep file.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::debug;

use dorade_core::records::{DescriptorHeader, SSWB};
use dorade_core::{ByteOrder, Descriptor, ParseError, RotationAngleTable};
use dorade_core::records::SuperSweepInfo;

use crate::error::{Result, SweepFileError};
use crate::mapper::RayMapper;

/// Most header bytes read at once when opening a file
pub const MAX_HEADER_READ: usize = 256 * 1024;

/// Slack allowed between the declared and the actual file size
const SIZE_TOLERANCE: u64 = 4;

/// Reads sweep files ray by ray into a [`RayMapper`].
///
/// One reader can be pointed at a series of files; it remembers the last
/// volume number to report volume changes.
pub struct SweepFileReader<R: Read + Seek = File> {
    source: Option<R>,
    path: Option<PathBuf>,
    mapper: RayMapper,
    rktb: RotationAngleTable,
    order: ByteOrder,
    ray_num: usize,
    prev_volume: Option<i16>,
    new_sweep: bool,
    new_volume: bool,
}

impl Default for SweepFileReader<File> {
    fn default() -> Self {
        Self::new()
    }
}

impl SweepFileReader<File> {
    pub fn new() -> Self {
        Self::with_mapper(RayMapper::default())
    }

    /// Open `path` and map its first ray
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = Self::new();
        reader.access_sweepfile(path)?;
        Ok(reader)
    }

    /// Switch to the sweep file at `path`
    pub fn access_sweepfile(&mut self, path: &Path) -> Result<()> {
        let file = File::open(path)?;
        self.access(file)?;
        self.path = Some(path.to_path_buf());
        debug!("Opened sweep file {} with {} rays", path.display(), self.ray_count());
        Ok(())
    }
}

impl<R: Read + Seek> SweepFileReader<R> {
    pub fn with_mapper(mapper: RayMapper) -> Self {
        Self {
            source: None,
            path: None,
            mapper,
            rktb: RotationAngleTable::new(),
            order: ByteOrder::Native,
            ray_num: 0,
            prev_volume: None,
            new_sweep: false,
            new_volume: false,
        }
    }

    /// Read a sweep file image from any seekable source
    pub fn from_reader(source: R) -> Result<Self> {
        let mut reader = Self::with_mapper(RayMapper::default());
        reader.access(source)?;
        Ok(reader)
    }

    /// Switch to a new source: map its headers and first ray and load the
    /// rotation-angle table.
    pub fn access(&mut self, mut source: R) -> Result<()> {
        self.source = None;
        self.path = None;

        source.seek(SeekFrom::Start(0))?;
        let mut head = [0u8; 8];
        source.read_exact(&mut head)?;
        if head[..4] != SSWB {
            return Err(SweepFileError::NoSuperSweepInfo);
        }
        let generic = DescriptorHeader::peek(&head)?;
        let order = generic.order;

        // The SSWB size differs between hosts, so read what it declares
        let mut sswb_bytes = vec![0u8; generic.size as usize];
        sswb_bytes[..8].copy_from_slice(&head);
        source.read_exact(&mut sswb_bytes[8..])?;
        let sswb = SuperSweepInfo::decode(&sswb_bytes, order)?;

        let declared = sswb.sizeof_file.max(0) as u64;
        let actual = source.seek(SeekFrom::End(0))?;
        if declared > actual + SIZE_TOLERANCE {
            return Err(SweepFileError::FileSizeMismatch { declared, actual });
        }

        let window = declared.min(actual).min(MAX_HEADER_READ as u64) as usize;
        let mut buf = vec![0u8; window];
        source.seek(SeekFrom::Start(0))?;
        source.read_exact(&mut buf)?;
        self.mapper.map_descriptors(&buf)?;
        if !self.mapper.new_ray() {
            return Err(SweepFileError::NoRayInfo);
        }

        let key = sswb.key_table[0];
        let (offset, size) = (key.offset.max(0) as u64, key.size.max(0) as usize);
        if size == 0 || offset + size as u64 > actual {
            return Err(SweepFileError::NoRotationTable);
        }
        let mut table = vec![0u8; size];
        source.seek(SeekFrom::Start(offset))?;
        source.read_exact(&mut table)?;
        let rktb = RotationAngleTable::decode(&table, order).map_err(|e| match e {
            ParseError::UnexpectedTag { .. } => SweepFileError::NoRotationTable,
            other => other.into(),
        })?;
        // Rays are read whole, so every entry must lie inside the file
        let in_file = |offset: i32, size: i32| {
            offset >= 0 && size >= 0 && offset as u64 + size as u64 <= actual
        };
        if !rktb.entries().iter().all(|e| in_file(e.offset, e.size)) {
            return Err(SweepFileError::NoRotationTable);
        }
        self.rktb = rktb;

        self.order = order;
        self.source = Some(source);
        self.ray_num = 0;
        if let Some(first) = self.rktb.entry(0).copied() {
            if let Some(source) = self.source.as_mut() {
                source.seek(SeekFrom::Start(first.offset.max(0) as u64))?;
            }
            self.next_ray()?;
        }

        let volume = self.mapper.vold.volume_num;
        self.new_sweep = true;
        self.new_volume = self.prev_volume != Some(volume);
        self.prev_volume = Some(volume);
        Ok(())
    }

    /// Map the next ray. Returns the bytes consumed, or `None` after the
    /// last ray.
    pub fn next_ray(&mut self) -> Result<Option<usize>> {
        let source = self.source.as_mut().ok_or(SweepFileError::NotOpen)?;
        let Some(entry) = self.rktb.entry(self.ray_num).copied() else {
            return Ok(None);
        };
        let mut buf = vec![0u8; entry.size.max(0) as usize];
        source.read_exact(&mut buf)?;

        let outcome = self.mapper.map_descriptors(&buf)?;
        if !outcome.complete {
            debug!("Ray {} mapped incompletely", self.ray_num);
        }
        self.ray_num += 1;
        self.new_sweep = false;
        self.new_volume = false;
        Ok(Some(outcome.consumed))
    }

    /// Map ray `ray`; sequential reading continues after it
    pub fn read_ray(&mut self, ray: usize) -> Result<usize> {
        let count = self.ray_count();
        let entry = self
            .rktb
            .entry(ray)
            .copied()
            .ok_or(SweepFileError::RayOutOfRange { ray, count })?;
        let source = self.source.as_mut().ok_or(SweepFileError::NotOpen)?;
        source.seek(SeekFrom::Start(entry.offset.max(0) as u64))?;
        self.ray_num = ray;
        self.next_ray()?.ok_or(SweepFileError::RayOutOfRange { ray, count })
    }

    /// Ray nearest `angle`, from the rotation-angle table
    pub fn angle_to_ray_num(&self, angle: f64) -> Option<usize> {
        self.rktb.nearest(angle)
    }

    pub fn ray_count(&self) -> usize {
        self.rktb.num_rays()
    }

    /// Number of the next ray `next_ray` will map
    pub fn ray_cursor(&self) -> usize {
        self.ray_num
    }

    /// True right after a file was accessed
    pub fn new_sweep(&self) -> bool {
        self.new_sweep
    }

    /// True right after accessing a file whose volume number differs from
    /// the previous file's
    pub fn new_volume(&self) -> bool {
        self.new_volume
    }

    /// Byte order the file was written in
    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn mapper(&self) -> &RayMapper {
        &self.mapper
    }

    pub fn mapper_mut(&mut self) -> &mut RayMapper {
        &mut self.mapper
    }

    pub fn rotation_table(&self) -> &RotationAngleTable {
        &self.rktb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WriterConfig;
    use crate::sweepfile::InMemorySweepFileWriter;
    use chrono::{TimeZone, Utc};
    use dorade_core::records::{CellVector, ParameterInfo, RadarInfo};
    use std::io::Cursor;

    fn image(config: WriterConfig, angles: &[f32]) -> Vec<u8> {
        let mut m = RayMapper::new(RadarInfo::with_name("RDR"));
        m.add_field(ParameterInfo::new("DBZ", 100.0, 0.0));
        m.set_cells(CellVector::new(vec![100.0, 200.0, 300.0]));
        m.set_time(Utc.with_ymd_and_hms(2022, 5, 6, 7, 8, 9).unwrap());

        let mut w = InMemorySweepFileWriter::new(config).unwrap();
        w.begin_sweepfile(&m, "", None).unwrap();
        for (i, a) in angles.iter().enumerate() {
            m.set_pointing(*a, 0.5);
            m.set_samples(0, vec![i as i16, -32768, 10 * i as i16]);
            w.add_to_sweepfile(&m).unwrap();
        }
        w.end_sweepfile(false).unwrap().unwrap().to_vec()
    }

    #[test]
    fn test_sequential_reading() {
        let bytes = image(WriterConfig::default(), &[0.0, 1.0, 2.0]);
        let mut r = SweepFileReader::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(r.ray_count(), 3);
        assert!(r.new_sweep());
        assert!(r.new_volume());
        assert_eq!(r.ray_cursor(), 1);
        assert_eq!(r.mapper().fields[0].samples, vec![0, -32768, 0]);

        assert!(r.next_ray().unwrap().is_some());
        assert!(!r.new_sweep());
        assert_eq!(r.mapper().fields[0].samples, vec![1, -32768, 10]);
        assert!(r.next_ray().unwrap().is_some());
        assert_eq!(r.mapper().ryib.azimuth, 2.0);
        assert_eq!(r.next_ray().unwrap(), None);
    }

    #[test]
    fn test_random_access() {
        let bytes = image(WriterConfig::default(), &[0.0, 90.0, 180.0, 270.0]);
        let mut r = SweepFileReader::from_reader(Cursor::new(bytes)).unwrap();
        r.read_ray(2).unwrap();
        assert_eq!(r.mapper().ryib.azimuth, 180.0);
        r.next_ray().unwrap();
        assert_eq!(r.mapper().ryib.azimuth, 270.0);
        assert!(matches!(
            r.read_ray(4),
            Err(SweepFileError::RayOutOfRange { ray: 4, count: 4 })
        ));
        assert_eq!(r.angle_to_ray_num(100.0), Some(1));
    }

    #[test]
    fn test_foreign_byte_order() {
        let config = WriterConfig {
            swap_bytes: true,
            ..WriterConfig::default()
        };
        let bytes = image(config, &[10.0, 20.0]);
        let mut r = SweepFileReader::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(r.byte_order(), ByteOrder::Swapped);
        assert_eq!(r.mapper().radd.radar_name(), "RDR");
        r.next_ray().unwrap();
        assert_eq!(r.mapper().fields[0].samples, vec![1, -32768, 10]);
        assert_eq!(r.angle_to_ray_num(19.0), Some(1));
    }

    #[test]
    fn test_rejects_foreign_files() {
        let bytes = b"VOLD\0\0\0\x48 not a sweep file at all".to_vec();
        assert!(matches!(
            SweepFileReader::from_reader(Cursor::new(bytes)),
            Err(SweepFileError::NoSuperSweepInfo)
        ));
    }

    #[test]
    fn test_truncated_file_is_size_mismatch() {
        let mut bytes = image(WriterConfig::default(), &[0.0, 1.0]);
        bytes.truncate(bytes.len() - 100);
        assert!(matches!(
            SweepFileReader::from_reader(Cursor::new(bytes)),
            Err(SweepFileError::FileSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_ray_beyond_file_rejected() {
        let mut bytes = image(WriterConfig::default(), &[0.0, 1.0]);
        let sswb = SuperSweepInfo::decode(&bytes[..SuperSweepInfo::SIZE], ByteOrder::Native).unwrap();
        let key = sswb.key_table[0];
        // Size word of the first of two 12-byte entries at the end of the table
        let at = (key.offset + key.size) as usize - 2 * 12 + 8;
        bytes[at..at + 4].copy_from_slice(&i32::MAX.to_ne_bytes());
        assert!(matches!(
            SweepFileReader::from_reader(Cursor::new(bytes)),
            Err(SweepFileError::NoRotationTable)
        ));
    }

    #[test]
    fn test_volume_change_tracking() {
        let bytes = image(WriterConfig::default(), &[0.0]);
        let mut r = SweepFileReader::from_reader(Cursor::new(bytes.clone())).unwrap();
        assert!(r.new_volume());
        r.access(Cursor::new(bytes)).unwrap();
        assert!(r.new_sweep());
        assert!(!r.new_volume());
    }
}
