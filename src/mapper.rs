//! Descriptor mapper: walks a buffer of DORADE descriptors and keeps the
//! latest copy of each one, with field data expanded to 16-bit samples.
//!
//! One call maps at most one ray. Readers feed it the header region of a
//! sweep file and then one ray at a time; producers fill it in directly
//! through the setters and hand it to a writer.

use chrono::{DateTime, Datelike, Timelike, Utc};
use log::{debug, warn};

use dorade_core::hrd;
use dorade_core::records::{
    CellSpacing, CellVector, Comment, CorrectionFactors, Descriptor, DescriptorHeader, ExtraStuff,
    FieldRadarInfo, ParameterData, ParameterInfo, PlatformInfo, RadarInfo, RayInfo, SuperSweepInfo,
    SweepInfo, VolumeInfo, ASIB, CELV, CFAC, COMM, CSFD, FRIB, GENERIC_DESCRIPTOR_SIZE, NULL, PARM,
    QDAT, RADD, RDAT, RKTB, RYIB, SSWB, SWIB, VOLD, XSTF,
};
use dorade_core::records::parameter::{QDAT_HEADER_SIZE, RDAT_HEADER_SIZE};
use dorade_core::records::volume::RADAR_GROUND;
use dorade_core::records::tag_name;
use dorade_core::{fmod360, BinaryFormat, ByteOrder, Compression, ParseError, ScanMode};

/// Scale given to 8-bit fields stored with unit scale
const EXPANDED_SCALE: f32 = 100.0;

/// Samples of one field for the current ray
#[derive(Debug, Clone, PartialEq)]
pub struct FieldData {
    /// RDAT or QDAT header as read, or a plain RDAT for new fields
    pub header: ParameterData,
    /// Scaled 16-bit samples, one per cell
    pub samples: Vec<i16>,
}

/// Result of mapping one buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapOutcome {
    /// Bytes of whole descriptors consumed
    pub consumed: usize,
    /// Every parameter and data block the radar declares was seen
    pub complete: bool,
}

#[derive(Debug, Clone)]
pub struct RayMapper {
    pub sswb: Option<SuperSweepInfo>,
    pub vold: VolumeInfo,
    pub radd: RadarInfo,
    pub parms: Vec<ParameterInfo>,
    pub celv: CellVector,
    pub cfac: CorrectionFactors,
    pub frib: Option<FieldRadarInfo>,
    pub comments: Vec<Comment>,
    pub swib: SweepInfo,
    pub ryib: RayInfo,
    pub asib: Option<PlatformInfo>,
    pub xstf: Option<ExtraStuff>,
    pub fields: Vec<FieldData>,
    /// Source scale and bias of fields that arrived as 8-bit
    eight_bit_source: Vec<Option<(f32, f32)>>,
    order: ByteOrder,
    new_volume: bool,
    new_sweep: bool,
    new_ray: bool,
    new_platform: bool,
}

impl Default for RayMapper {
    fn default() -> Self {
        Self::new(RadarInfo::default())
    }
}

impl RayMapper {
    /// Empty mapper for the given radar
    pub fn new(mut radd: RadarInfo) -> Self {
        radd.num_parameter_des = 0;
        Self {
            sswb: None,
            vold: VolumeInfo::default(),
            radd,
            parms: Vec::new(),
            celv: CellVector::default(),
            cfac: CorrectionFactors::default(),
            frib: None,
            comments: Vec::new(),
            swib: SweepInfo::default(),
            ryib: RayInfo::default(),
            asib: None,
            xstf: None,
            fields: Vec::new(),
            eight_bit_source: Vec::new(),
            order: ByteOrder::Native,
            new_volume: false,
            new_sweep: false,
            new_ray: false,
            new_platform: false,
        }
    }

    // ===== Producer side =====

    /// Add a field and return its index
    pub fn add_field(&mut self, parm: ParameterInfo) -> usize {
        let header = ParameterData::rdat(&parm.name());
        self.parms.push(parm);
        self.eight_bit_source.push(None);
        self.fields.push(FieldData {
            header,
            samples: Vec::new(),
        });
        self.radd.num_parameter_des = self.parms.len() as i16;
        self.fields.len() - 1
    }

    pub fn set_cells(&mut self, celv: CellVector) {
        self.celv = celv;
    }

    /// Set raw 16-bit samples of a field; false if there is no such field
    pub fn set_samples(&mut self, field: usize, samples: Vec<i16>) -> bool {
        match self.fields.get_mut(field) {
            Some(f) => {
                f.samples = samples;
                true
            }
            None => false,
        }
    }

    /// Stamp the ray, and the volume's date, with `time`
    pub fn set_time(&mut self, time: DateTime<Utc>) {
        self.vold.year = time.year() as i16;
        self.vold.month = time.month() as i16;
        self.vold.day = time.day() as i16;
        self.vold.data_set_hour = time.hour() as i16;
        self.vold.data_set_minute = time.minute() as i16;
        self.vold.data_set_second = time.second() as i16;
        self.ryib.set_time(time);
    }

    pub fn set_pointing(&mut self, azimuth: f32, elevation: f32) {
        self.ryib.azimuth = azimuth;
        self.ryib.elevation = elevation;
    }

    /// Replace the platform block; it goes out with the next ray written
    pub fn set_platform(&mut self, asib: PlatformInfo) {
        self.asib = Some(asib);
        self.new_platform = true;
    }

    /// Forget per-ray flags once a ray has been consumed
    pub fn clear_ray_flags(&mut self) {
        self.new_volume = false;
        self.new_sweep = false;
        self.new_ray = false;
        self.new_platform = false;
        self.xstf = None;
    }

    // ===== Consumer side =====

    pub fn byte_order(&self) -> ByteOrder {
        self.order
    }

    pub fn new_volume(&self) -> bool {
        self.new_volume
    }

    pub fn new_sweep(&self) -> bool {
        self.new_sweep
    }

    /// A RYIB was mapped by the last call
    pub fn new_ray(&self) -> bool {
        self.new_ray
    }

    /// The platform block changed with this ray
    pub fn new_platform(&self) -> bool {
        self.new_platform
    }

    /// Time of the current ray
    pub fn ray_time(&self) -> Option<DateTime<Utc>> {
        self.ryib.time(i32::from(self.vold.year))
    }

    pub fn scan_mode(&self) -> Option<ScanMode> {
        ScanMode::from_code(self.radd.scan_mode)
    }

    /// Angle used to index the ray, in [0, 360)
    pub fn rotation_angle(&self) -> f64 {
        let (rotation, roll) = self
            .asib
            .as_ref()
            .map_or((0.0, 0.0), |a| (f64::from(a.rotation_angle), f64::from(a.roll)));
        let correction = f64::from(self.cfac.rot_angle_corr);

        let angle = match self.scan_mode() {
            Some(ScanMode::Air) => rotation + correction + roll,
            Some(ScanMode::Rhi) => 90.0 - f64::from(self.ryib.elevation),
            Some(ScanMode::Tar) if self.radd.radar_type != RADAR_GROUND => rotation + correction,
            _ => f64::from(self.ryib.azimuth),
        };
        fmod360(angle)
    }

    /// Cell distances with the range delay correction applied
    pub fn corrected_cells(&self) -> Vec<f32> {
        let corr = self.cfac.range_delay_corr;
        self.celv.dist_cells.iter().map(|d| d + corr).collect()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.parms.iter().position(|p| p.name() == name)
    }

    /// Unscaled values of a field, with the unscaled bad value
    pub fn field_values(&self, name: &str) -> Option<(Vec<f32>, f32)> {
        let fx = self.field_index(name)?;
        let parm = &self.parms[fx];
        let field = self.fields.get(fx)?;
        let values = field.samples.iter().map(|&s| unscale(s, parm)).collect();
        Some((values, unscale(parm.bad_data as i16, parm)))
    }

    /// Store unscaled values into a field. Values equal to `bad` become
    /// the field's bad-data flag. Returns the number of cells written.
    pub fn replace_field(&mut self, name: &str, values: &[f32], bad: f32) -> Option<usize> {
        let fx = self.field_index(name)?;
        let parm = &self.parms[fx];
        let flag = parm.bad_data as i16;
        let samples: Vec<i16> = values
            .iter()
            .map(|&v| if v == bad { flag } else { scale(v, parm) })
            .collect();
        let n = samples.len();
        self.fields.get_mut(fx)?.samples = samples;
        Some(n)
    }

    // ===== Descriptor walk =====

    /// Map every descriptor in `bytes`, stopping in front of a second ray.
    ///
    /// A descriptor that runs past the end of the buffer ends the walk as
    /// incomplete; the caller can supply more bytes and map again.
    pub fn map_descriptors(&mut self, bytes: &[u8]) -> Result<MapOutcome, ParseError> {
        self.clear_ray_flags();
        let mut at = 0;
        let mut num_parms = 0;
        let mut num_data = 0;

        while bytes.len() - at > GENERIC_DESCRIPTOR_SIZE {
            let rest = &bytes[at..];
            let header = match DescriptorHeader::peek(rest) {
                Ok(h) if h.size as usize <= rest.len() => h,
                Ok(_) => return Ok(self.incomplete(at)),
                Err(ParseError::InvalidDescriptorSize { size, .. }) if size as usize > rest.len() => {
                    return Ok(self.incomplete(at));
                }
                Err(e) => return Err(e),
            };
            let block = &rest[..header.size as usize];
            let order = header.order;
            self.order = order;

            match header.tag {
                RYIB => {
                    if self.new_ray {
                        break;
                    }
                    self.new_ray = true;
                    self.ryib = RayInfo::decode(block, order)?;
                }
                RDAT | QDAT => {
                    let fx = num_data;
                    num_data += 1;
                    self.map_field(fx, block, order)?;
                }
                ASIB => {
                    self.asib = Some(PlatformInfo::decode(block, order)?);
                    self.new_platform = true;
                }
                XSTF => self.xstf = Some(ExtraStuff::decode(block, order)?),
                SWIB => {
                    self.swib = SweepInfo::decode(block, order)?;
                    self.new_sweep = true;
                }
                SSWB => self.sswb = Some(SuperSweepInfo::decode(block, order)?),
                VOLD => {
                    self.vold = VolumeInfo::decode(block, order)?;
                    self.new_volume = true;
                    self.comments.clear();
                }
                RADD => {
                    self.radd = RadarInfo::decode(block, order)?;
                    self.frib = None;
                }
                PARM => {
                    let fx = num_parms;
                    num_parms += 1;
                    self.map_parameter(fx, ParameterInfo::decode(block, order)?);
                }
                CELV => self.celv = CellVector::decode(block, order)?,
                CSFD => self.celv = CellSpacing::decode(block, order)?.to_cell_vector(),
                FRIB => self.frib = Some(FieldRadarInfo::decode(block, order)?),
                CFAC => self.cfac = CorrectionFactors::decode(block, order)?,
                COMM => self.comments.push(Comment::decode(block, order)?),
                NULL | RKTB => debug!("Skipping {} ({} bytes)", tag_name(&header.tag), header.size),
                other => warn!("Skipping unknown descriptor {} ({} bytes)", tag_name(&other), header.size),
            }
            at += header.size as usize;
        }

        let declared = self.radd.num_parameter_des.max(0) as usize;
        if self.new_volume {
            self.parms.truncate(num_parms);
            self.eight_bit_source.truncate(num_parms);
        }
        if self.new_ray {
            self.fields.truncate(num_data);
        }
        let complete = match (self.new_volume, self.new_ray) {
            (true, true) => num_parms == declared && num_data == declared,
            (true, false) => num_parms == declared,
            (false, true) => num_data == declared,
            (false, false) => true,
        };
        Ok(MapOutcome { consumed: at, complete })
    }

    fn incomplete(&mut self, consumed: usize) -> MapOutcome {
        self.new_ray = false;
        self.new_volume = false;
        MapOutcome {
            consumed,
            complete: false,
        }
    }

    /// 8-bit fields are held as 16-bit; unit-scaled ones are rescaled
    fn map_parameter(&mut self, fx: usize, mut parm: ParameterInfo) {
        let source = if parm.format() == Some(BinaryFormat::Int8) {
            let source = (parm.scale, parm.bias);
            parm.binary_format = BinaryFormat::Int16 as i16;
            if parm.scale == 1.0 {
                parm.scale = EXPANDED_SCALE;
                parm.bias = 0.0;
            }
            Some(source)
        } else {
            None
        };
        if fx < self.parms.len() {
            self.parms[fx] = parm;
            self.eight_bit_source[fx] = source;
        } else {
            self.parms.push(parm);
            self.eight_bit_source.push(source);
        }
    }

    fn map_field(&mut self, fx: usize, block: &[u8], order: ByteOrder) -> Result<(), ParseError> {
        let header = ParameterData::decode(block, order)?;
        let Some(parm) = self.parms.get(fx) else {
            warn!("Data block {} has no matching parameter", header.name());
            return Ok(());
        };

        let offset = if header.is_qdat() {
            let declared = parm.offset_to_data.max(0) as usize;
            if declared < QDAT_HEADER_SIZE || declared > block.len() {
                QDAT_HEADER_SIZE
            } else {
                declared
            }
        } else {
            RDAT_HEADER_SIZE
        };
        let data = &block[offset.min(block.len())..];
        let ncells = self.celv.number_cells();
        let flag = parm.bad_data as i16;
        // The byte a 16-bit bad_data truncates to on disk
        let bad8 = parm.bad_data as i8;

        let mut samples: Vec<i16> = match self.eight_bit_source.get(fx).copied().flatten() {
            Some((scale8, bias8)) => data
                .iter()
                .take(ncells)
                .map(|&b| {
                    let v = b as i8;
                    if v == bad8 {
                        flag
                    } else if scale8 != 1.0 {
                        i16::from(v)
                    } else {
                        ((f32::from(v) - bias8) * parm.scale).round() as i16
                    }
                })
                .collect(),
            None if Compression::from_code(self.radd.data_compress) == Some(Compression::Hrd) => {
                let expansion = hrd::decompress(data, order, flag as u16, ncells);
                if expansion.overflow {
                    warn!(
                        "HRD data of {} is corrupt, kept {} of {} cells",
                        header.name(),
                        expansion.words(),
                        ncells
                    );
                }
                expansion.samples.into_iter().map(|w| w as i16).collect()
            }
            None => data
                .chunks_exact(2)
                .take(ncells)
                .map(|w| order.read_u16([w[0], w[1]]) as i16)
                .collect(),
        };
        if samples.len() < ncells {
            samples.resize(ncells, flag);
        }

        let field = FieldData { header, samples };
        if fx < self.fields.len() {
            self.fields[fx] = field;
        } else {
            self.fields.push(field);
        }
        Ok(())
    }
}

fn unscale(sample: i16, parm: &ParameterInfo) -> f32 {
    (f32::from(sample) - parm.bias) / parm.scale
}

fn scale(value: f32, parm: &ParameterInfo) -> i16 {
    (value * parm.scale + parm.bias).round() as i16
}
