//! DORADE sweep-file writers and reader.
//!
//! A sweep file on disk:
//!
//! ```text
//! SSWB VOLD RADD PARM×N (CELV|CSFD) [FRIB] CFAC [COMM…] SWIB
//!   ray 0: RYIB [ASIB] [XSTF] (RDAT|QDAT)×N
//!   ray 1: …
//! NULL RKTB
//! ```
//!
//! The SSWB, CFAC and SWIB are written as placeholders and rewritten in
//! place once the sweep is finished and the RKTB has been appended.

use std::io::{Read, Seek, SeekFrom, Write};

use chrono::{DateTime, Datelike, Utc};
use log::debug;

use dorade_core::hrd;
use dorade_core::records::cells::MAX_CELLS;
use dorade_core::records::{
    CellSpacing, CorrectionFactors, Descriptor, NullDescriptor, ParameterInfo, RadarInfo, SuperSweepInfo,
    SweepInfo, VolumeInfo,
};
use dorade_core::rotation::RotationEntry;
use dorade_core::{BinaryFormat, ByteOrder, Compression, RotationAngleTable, SweepFileName};

use crate::config::WriterConfig;
use crate::error::{Result, SweepFileError};
use crate::mapper::{FieldData, RayMapper};

pub mod memory;
pub mod reader;
pub mod writer;

pub use memory::InMemorySweepFileWriter;
pub use reader::SweepFileReader;
pub use writer::SweepFileWriter;

/// Bad-data flag of fields written as 8-bit
const EIGHT_BIT_BAD: i32 = -128;

/// Fixed 8-bit scale of differential reflectivity
const ZDR_SCALE: f32 = 4.0;

/// Name a sweep started from the mapper's current ray
pub(crate) fn sweep_file_name(
    mapper: &RayMapper,
    sweep_num: i32,
    version: Option<i32>,
    qualifier: &str,
) -> SweepFileName {
    SweepFileName {
        file_type: "swp".to_string(),
        radar: mapper.radd.radar_name(),
        time: mapper.ray_time().unwrap_or(DateTime::UNIX_EPOCH),
        version: version.unwrap_or(-1),
        volume_num: i32::from(mapper.vold.volume_num),
        sweep_num,
        fixed_angle: mapper.swib.fixed_angle,
        scan_mode: mapper.scan_mode(),
        qualifier: qualifier.to_string(),
    }
}

fn is_zdr(parm: &ParameterInfo) -> bool {
    parm.name().starts_with("ZDR")
}

/// Writes one sweep into any seekable stream
pub(crate) struct SweepBuilder<S: Read + Write + Seek> {
    stream: S,
    order: ByteOrder,
    config: WriterConfig,
    sweep_num: i32,
    sswb: SuperSweepInfo,
    cfac: CorrectionFactors,
    swib: SweepInfo,
    /// Input PARMs, used to unscale samples
    source_parms: Vec<ParameterInfo>,
    /// PARMs as written
    parms: Vec<ParameterInfo>,
    offset_to_cfac: u64,
    offset_to_swib: u64,
    rktb: RotationAngleTable,
    /// Bytes written so far; the next ray goes here
    size: u64,
}

impl<S: Read + Write + Seek> SweepBuilder<S> {
    /// Write the sweep headers for the mapper's current ray. On failure the
    /// stream is handed back with the error.
    pub(crate) fn begin(
        stream: S,
        mapper: &RayMapper,
        config: &WriterConfig,
        sweep_num: i32,
    ) -> std::result::Result<Self, (S, SweepFileError)> {
        let mut builder = Self {
            stream,
            order: config.byte_order(),
            config: config.clone(),
            sweep_num,
            sswb: SuperSweepInfo::default(),
            cfac: CorrectionFactors::default(),
            swib: SweepInfo::default(),
            source_parms: Vec::new(),
            parms: Vec::new(),
            offset_to_cfac: 0,
            offset_to_swib: 0,
            rktb: RotationAngleTable::new(),
            size: 0,
        };
        match builder.write_headers(mapper) {
            Ok(()) => Ok(builder),
            Err(e) => Err((builder.stream, e)),
        }
    }

    fn write_headers(&mut self, mapper: &RayMapper) -> Result<()> {
        let config = self.config.clone();
        let sweep_num = self.sweep_num;
        let order = self.order;
        let time = mapper.ray_time().unwrap_or(DateTime::UNIX_EPOCH);
        let nfields = mapper.fields.len();
        let ncells = mapper.celv.number_cells();
        if ncells > MAX_CELLS {
            return Err(SweepFileError::TooManyCells(ncells));
        }

        let mut sswb = SuperSweepInfo::default();
        sswb.radar_name = mapper.radd.radar_name;
        sswb.compression_flag = config.compression as i32;
        sswb.num_params = nfields as i32;
        sswb.start_time = time.timestamp() as i32;
        sswb.stop_time = sswb.start_time;
        sswb.volume_time_stamp = sswb.start_time;
        sswb.d_start_time = epoch_seconds(time);
        sswb.d_stop_time = sswb.d_start_time;
        sswb.last_used = Utc::now().timestamp() as i32;
        self.stream.write_all(&sswb.encode(order)?)?;

        let now = Utc::now();
        let vold = VolumeInfo {
            year: time.year() as i16,
            month: time.month() as i16,
            day: time.day() as i16,
            data_set_hour: mapper.ryib.hour,
            data_set_minute: mapper.ryib.minute,
            data_set_second: mapper.ryib.second,
            gen_year: now.year() as i16,
            gen_month: now.month() as i16,
            gen_day: now.day() as i16,
            ..mapper.vold.clone()
        };
        self.stream.write_all(&vold.encode(order)?)?;

        let radd = RadarInfo {
            data_compress: config.compression as i16,
            num_parameter_des: nfields as i16,
            ..mapper.radd.clone()
        };
        self.stream.write_all(&radd.encode(order)?)?;

        let source_parms: Vec<ParameterInfo> = mapper.parms.iter().take(nfields).cloned().collect();
        let mut parms = Vec::with_capacity(nfields);
        for (fx, parm) in source_parms.iter().enumerate() {
            let mut out = parm.clone();
            if let Some(eb) = config.eight_bit_for(fx) {
                out.binary_format = BinaryFormat::Int8 as i16;
                out.scale = if is_zdr(parm) { ZDR_SCALE } else { eb.scale };
                out.bias = eb.bias;
                let name = parm.name();
                if !(name.starts_with("WPD") || name.starts_with("PD")) {
                    out.bad_data = EIGHT_BIT_BAD;
                }
            }
            if let Some(field) = mapper.fields.get(fx) {
                if field.header.is_qdat() {
                    out.offset_to_data = field.header.header_size() as i32;
                }
            }
            self.stream.write_all(&out.encode(order)?)?;
            parms.push(out);
        }

        match config.cell_spacing {
            Some(cs) => {
                let d = &mapper.celv.dist_cells;
                let d0 = d.first().copied().unwrap_or(0.0);
                let spacing = match d.get(1) {
                    Some(d1) => (d1 - d0) * cs.gate_skip as f32,
                    None => 0.0,
                };
                let gates = decimated_len(ncells, cs.gate_skip, cs.num_gates);
                let csfd = CellSpacing::uniform(d0, spacing, gates as i16);
                self.stream.write_all(&csfd.encode(order)?)?;
            }
            None => self.stream.write_all(&mapper.celv.encode(order))?,
        }

        if let Some(frib) = &mapper.frib {
            self.stream.write_all(&frib.encode(order)?)?;
        }

        let offset_to_cfac = self.stream.stream_position()?;
        let cfac = mapper.cfac.clone();
        self.stream.write_all(&cfac.encode(order)?)?;

        for comment in &mapper.comments {
            self.stream.write_all(&comment.encode(order)?)?;
        }

        let offset_to_swib = self.stream.stream_position()?;
        let swib = SweepInfo {
            radar_name: mapper.radd.radar_name,
            sweep_num,
            num_rays: 0,
            start_angle: mapper.rotation_angle() as f32,
            stop_angle: mapper.rotation_angle() as f32,
            ..mapper.swib.clone()
        };
        self.stream.write_all(&swib.encode(order)?)?;

        self.size = self.stream.stream_position()?;
        debug!(
            "Sweep {} headers: {} fields, {} cells, {} bytes",
            sweep_num, nfields, ncells, self.size
        );

        self.sswb = sswb;
        self.cfac = cfac;
        self.swib = swib;
        self.source_parms = source_parms;
        self.parms = parms;
        self.offset_to_cfac = offset_to_cfac;
        self.offset_to_swib = offset_to_swib;
        Ok(())
    }

    pub(crate) fn num_rays(&self) -> usize {
        self.rktb.num_rays()
    }

    /// Append the mapper's current ray and return its ray number
    pub(crate) fn add_ray(&mut self, mapper: &RayMapper) -> Result<usize> {
        let order = self.order;
        let angle = mapper.rotation_angle();

        let mut ryib = mapper.ryib.clone();
        ryib.sweep_num = self.sweep_num;
        let mut buf = ryib.encode(order)?;
        if mapper.new_platform() {
            if let Some(asib) = &mapper.asib {
                buf.extend(asib.encode(order)?);
            }
        }
        if let Some(xstf) = &mapper.xstf {
            buf.extend(xstf.encode(order));
        }
        for (fx, field) in mapper.fields.iter().enumerate().take(self.parms.len()) {
            buf.extend(self.encode_field(fx, field)?);
        }

        // A failed write leaves no entry; the next ray overwrites its bytes
        self.stream.seek(SeekFrom::Start(self.size))?;
        self.stream.write_all(&buf)?;
        let ray = self.rktb.push(angle, self.size as i32);
        self.rktb.set_last_size(buf.len() as i32);
        self.size += buf.len() as u64;

        self.swib.num_rays += 1;
        self.swib.stop_angle = angle as f32;
        if let Some(t) = mapper.ray_time() {
            self.sswb.stop_time = t.timestamp() as i32;
            self.sswb.d_stop_time = epoch_seconds(t);
        }
        Ok(ray)
    }

    /// Data block of one field: header plus samples padded to 4 bytes
    fn encode_field(&self, fx: usize, field: &FieldData) -> Result<Vec<u8>> {
        let source = &self.source_parms[fx];
        let flag = source.bad_data as i16;
        let samples = self.decimate(&field.samples, flag);
        if samples.len() > MAX_CELLS {
            return Err(SweepFileError::TooManyCells(samples.len()));
        }

        let mut data: Vec<u8> = match self.config.eight_bit_for(fx) {
            Some(eb) => {
                let scale8 = if is_zdr(source) { ZDR_SCALE } else { eb.scale };
                let bad8 = self.parms[fx].bad_data as i8;
                samples
                    .iter()
                    .map(|&s| {
                        if s == flag {
                            bad8 as u8
                        } else {
                            let value = (f32::from(s) - source.bias) / source.scale;
                            (value * scale8 + eb.bias).round() as i8 as u8
                        }
                    })
                    .collect()
            }
            None => {
                let words: Vec<u16> = samples.iter().map(|&s| s as u16).collect();
                match self.config.compression {
                    Compression::Hrd => hrd::words_to_bytes(&hrd::compress(&words, flag as u16), self.order),
                    Compression::None => hrd::words_to_bytes(&words, self.order),
                }
            }
        };
        data.resize(data.len().next_multiple_of(4), 0);

        let mut header = field.header.clone();
        header.pdata_length = (header.header_size() + data.len()) as i32;
        let mut out = header.encode(self.order)?;
        out.extend(data);
        Ok(out)
    }

    fn decimate(&self, samples: &[i16], flag: i16) -> Vec<i16> {
        match self.config.cell_spacing {
            None => samples.to_vec(),
            Some(cs) => {
                let skip = cs.gate_skip.max(1);
                let n = decimated_len(samples.len(), skip, cs.num_gates);
                (0..n).map(|k| samples.get(k * skip).copied().unwrap_or(flag)).collect()
            }
        }
    }

    fn entry(&self, ray: usize) -> Result<RotationEntry> {
        self.rktb.entry(ray).copied().ok_or(SweepFileError::RayOutOfRange {
            ray,
            count: self.rktb.num_rays(),
        })
    }

    /// Position the stream at the start of `ray`
    pub(crate) fn seek_ray(&mut self, ray: usize) -> Result<()> {
        let entry = self.entry(ray)?;
        self.stream.seek(SeekFrom::Start(entry.offset as u64))?;
        Ok(())
    }

    /// Bytes of a ray already written
    pub(crate) fn reread_ray(&mut self, ray: usize) -> Result<Vec<u8>> {
        let entry = self.entry(ray)?;
        self.seek_ray(ray)?;
        let mut buf = vec![0u8; entry.size.max(0) as usize];
        let read = self.stream.read_exact(&mut buf);
        self.stream.seek(SeekFrom::Start(self.size))?;
        read?;
        Ok(buf)
    }

    /// Overwrite a ray in place with bytes of the same length
    pub(crate) fn rewrite_ray(&mut self, ray: usize, bytes: &[u8]) -> Result<()> {
        let entry = self.entry(ray)?;
        let expected = entry.size.max(0) as usize;
        if bytes.len() != expected {
            return Err(SweepFileError::RaySizeChanged {
                ray,
                expected,
                actual: bytes.len(),
            });
        }
        self.seek_ray(ray)?;
        self.stream.write_all(bytes)?;
        self.stream.seek(SeekFrom::Start(self.size))?;
        Ok(())
    }

    /// Append the trailer, rewrite the headers and return the stream with
    /// the final file size
    pub(crate) fn finish(mut self) -> Result<(S, u64)> {
        let order = self.order;
        self.stream.seek(SeekFrom::Start(self.size))?;
        let null = NullDescriptor.encode(order)?;
        self.stream.write_all(&null)?;

        let rktb_offset = self.size + null.len() as u64;
        let rktb = self.rktb.encode(order);
        self.stream.write_all(&rktb)?;
        self.sswb.key_table[0].offset = rktb_offset as i32;
        self.sswb.key_table[0].size = rktb.len() as i32;
        self.size = self.stream.stream_position()?;
        self.sswb.sizeof_file = self.size as i32;

        self.stream.seek(SeekFrom::Start(0))?;
        self.stream.write_all(&self.sswb.encode(order)?)?;
        self.stream.seek(SeekFrom::Start(self.offset_to_cfac))?;
        self.stream.write_all(&self.cfac.encode(order)?)?;
        self.stream.seek(SeekFrom::Start(self.offset_to_swib))?;
        self.stream.write_all(&self.swib.encode(order)?)?;
        self.stream.flush()?;

        debug!(
            "Sweep {} finished: {} rays, {} bytes",
            self.sweep_num,
            self.swib.num_rays,
            self.size
        );
        Ok((self.stream, self.size))
    }

    /// Give up on the sweep and hand back the stream untouched
    pub(crate) fn into_stream(self) -> S {
        self.stream
    }
}

fn epoch_seconds(t: DateTime<Utc>) -> f64 {
    t.timestamp_millis() as f64 / 1000.0
}

/// Gates kept when every `skip`-th of `ncells` gates is written
fn decimated_len(ncells: usize, skip: usize, num_gates: Option<usize>) -> usize {
    let skip = skip.max(1);
    let available = ncells.div_ceil(skip);
    num_gates.map_or(available, |n| n.min(available))
}
