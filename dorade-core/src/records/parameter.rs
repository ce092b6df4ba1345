//! PARM field descriptions and the RDAT/QDAT headers that carry field data.

use serde::{Deserialize, Serialize};

use super::{
    ensure_len, fixed_str, from_host_bytes, get_f32, get_fixed, get_i16, get_i32, put_f32, put_i16, put_i32,
    str_from_fixed, to_host_bytes, tag_name, Descriptor, Tag,
};
use crate::crackers::{ByteOrder, CrackRow, PARAMETER_DATA_LAYOUT, PARAMETER_LAYOUT};
use crate::error::ParseError;
use crate::types::BinaryFormat;

/// PARM: one field's description. Laid out by hand because the
/// description text is wider than serde's array support.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub nbytes: i32,
    pub name: [u8; 8],
    pub description: [u8; 40],
    pub units: [u8; 8],
    pub interpulse_time: i16,
    pub xmitted_freq: i16,
    pub recvr_bandwidth: f32,
    pub pulse_width: i16,
    pub polarization: i16,
    pub num_samples: i16,
    pub binary_format: i16,
    pub threshold_field: [u8; 8],
    pub threshold_value: f32,
    pub scale: f32,
    pub bias: f32,
    pub bad_data: i32,
    pub extension_num: i32,
    pub config_name: [u8; 8],
    pub config_num: i32,
    pub offset_to_data: i32,
    pub mks_conversion: f32,
    pub num_qnames: i32,
    pub qdata_names: [u8; 32],
    pub num_criteria: i32,
    pub criteria_names: [u8; 32],
    pub number_cells: i32,
    pub meters_to_first_cell: f32,
    pub meters_between_cells: f32,
    pub eff_unamb_vel: f32,
}

impl Default for ParameterInfo {
    fn default() -> Self {
        Self {
            nbytes: Self::SIZE as i32,
            name: [0; 8],
            description: [0; 40],
            units: [0; 8],
            interpulse_time: 0,
            xmitted_freq: 0,
            recvr_bandwidth: 0.0,
            pulse_width: 0,
            polarization: 0,
            num_samples: 0,
            binary_format: BinaryFormat::Int16 as i16,
            threshold_field: [0; 8],
            threshold_value: 0.0,
            scale: 1.0,
            bias: 0.0,
            bad_data: -32768,
            extension_num: 0,
            config_name: [0; 8],
            config_num: 0,
            offset_to_data: 0,
            mks_conversion: 0.0,
            num_qnames: 0,
            qdata_names: [0; 32],
            num_criteria: 0,
            criteria_names: [0; 32],
            number_cells: 0,
            meters_to_first_cell: 0.0,
            meters_between_cells: 0.0,
            eff_unamb_vel: 0.0,
        }
    }
}

impl ParameterInfo {
    /// A 16-bit field with the given name, scale and bias
    pub fn new(name: &str, scale: f32, bias: f32) -> Self {
        Self {
            name: fixed_str(name),
            scale,
            bias,
            ..Self::default()
        }
    }

    pub fn name(&self) -> String {
        str_from_fixed(&self.name)
    }

    pub fn units(&self) -> String {
        str_from_fixed(&self.units)
    }

    pub fn format(&self) -> Option<BinaryFormat> {
        BinaryFormat::from_code(self.binary_format)
    }

    /// Bytes per stored sample; unknown formats count as 16-bit
    pub fn sample_width(&self) -> usize {
        self.format().map_or(2, BinaryFormat::width)
    }
}

impl Descriptor for ParameterInfo {
    const TAG: Tag = super::PARM;
    const SIZE: usize = 216;
    const LAYOUT: &'static [CrackRow] = PARAMETER_LAYOUT;

    fn from_host(b: &[u8]) -> Result<Self, ParseError> {
        ensure_len(b, Self::SIZE)?;
        Ok(Self {
            nbytes: get_i32(b, 4),
            name: get_fixed(b, 8),
            description: get_fixed(b, 16),
            units: get_fixed(b, 56),
            interpulse_time: get_i16(b, 64),
            xmitted_freq: get_i16(b, 66),
            recvr_bandwidth: get_f32(b, 68),
            pulse_width: get_i16(b, 72),
            polarization: get_i16(b, 74),
            num_samples: get_i16(b, 76),
            binary_format: get_i16(b, 78),
            threshold_field: get_fixed(b, 80),
            threshold_value: get_f32(b, 88),
            scale: get_f32(b, 92),
            bias: get_f32(b, 96),
            bad_data: get_i32(b, 100),
            extension_num: get_i32(b, 104),
            config_name: get_fixed(b, 108),
            config_num: get_i32(b, 116),
            offset_to_data: get_i32(b, 120),
            mks_conversion: get_f32(b, 124),
            num_qnames: get_i32(b, 128),
            qdata_names: get_fixed(b, 132),
            num_criteria: get_i32(b, 164),
            criteria_names: get_fixed(b, 168),
            number_cells: get_i32(b, 200),
            meters_to_first_cell: get_f32(b, 204),
            meters_between_cells: get_f32(b, 208),
            eff_unamb_vel: get_f32(b, 212),
        })
    }

    fn to_host(&self) -> Result<Vec<u8>, ParseError> {
        let mut b = vec![0u8; Self::SIZE];
        b[0..4].copy_from_slice(&Self::TAG);
        put_i32(&mut b, 4, Self::SIZE as i32);
        b[8..16].copy_from_slice(&self.name);
        b[16..56].copy_from_slice(&self.description);
        b[56..64].copy_from_slice(&self.units);
        put_i16(&mut b, 64, self.interpulse_time);
        put_i16(&mut b, 66, self.xmitted_freq);
        put_f32(&mut b, 68, self.recvr_bandwidth);
        put_i16(&mut b, 72, self.pulse_width);
        put_i16(&mut b, 74, self.polarization);
        put_i16(&mut b, 76, self.num_samples);
        put_i16(&mut b, 78, self.binary_format);
        b[80..88].copy_from_slice(&self.threshold_field);
        put_f32(&mut b, 88, self.threshold_value);
        put_f32(&mut b, 92, self.scale);
        put_f32(&mut b, 96, self.bias);
        put_i32(&mut b, 100, self.bad_data);
        put_i32(&mut b, 104, self.extension_num);
        b[108..116].copy_from_slice(&self.config_name);
        put_i32(&mut b, 116, self.config_num);
        put_i32(&mut b, 120, self.offset_to_data);
        put_f32(&mut b, 124, self.mks_conversion);
        put_i32(&mut b, 128, self.num_qnames);
        b[132..164].copy_from_slice(&self.qdata_names);
        put_i32(&mut b, 164, self.num_criteria);
        b[168..200].copy_from_slice(&self.criteria_names);
        put_i32(&mut b, 200, self.number_cells);
        put_f32(&mut b, 204, self.meters_to_first_cell);
        put_f32(&mut b, 208, self.meters_between_cells);
        put_f32(&mut b, 212, self.eff_unamb_vel);
        Ok(b)
    }
}

/// Header size of an RDAT block
pub const RDAT_HEADER_SIZE: usize = 16;

/// Header size of a QDAT block
pub const QDAT_HEADER_SIZE: usize = 56;

/// RDAT or QDAT header. The field samples follow it in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterData {
    pub id: Tag,
    /// Header plus data size in bytes
    pub pdata_length: i32,
    pub name: [u8; 8],
    pub extension_num: i32,
    pub config_num: i32,
    pub first_cell: [i16; 4],
    pub num_cells: [i16; 4],
    pub criteria_value: [f32; 4],
}

impl ParameterData {
    /// Plain RDAT header for a field
    pub fn rdat(name: &str) -> Self {
        Self {
            id: super::RDAT,
            pdata_length: RDAT_HEADER_SIZE as i32,
            name: fixed_str(name),
            extension_num: 0,
            config_num: 0,
            first_cell: [0; 4],
            num_cells: [0; 4],
            criteria_value: [0.0; 4],
        }
    }

    pub fn is_qdat(&self) -> bool {
        self.id == super::QDAT
    }

    pub fn header_size(&self) -> usize {
        if self.is_qdat() {
            QDAT_HEADER_SIZE
        } else {
            RDAT_HEADER_SIZE
        }
    }

    pub fn name(&self) -> String {
        str_from_fixed(&self.name)
    }

    /// Decode an RDAT or QDAT header from file bytes in `order`
    pub fn decode(bytes: &[u8], order: ByteOrder) -> Result<Self, ParseError> {
        ensure_len(bytes, 4)?;
        let tag: Tag = [bytes[0], bytes[1], bytes[2], bytes[3]];
        let header = match tag {
            super::RDAT => RDAT_HEADER_SIZE,
            super::QDAT => QDAT_HEADER_SIZE,
            _ => {
                return Err(ParseError::UnexpectedTag {
                    expected: "RDAT".to_string(),
                    actual: tag_name(&tag),
                })
            }
        };
        ensure_len(bytes, header)?;
        let mut host = vec![0u8; QDAT_HEADER_SIZE];
        order.normalize(PARAMETER_DATA_LAYOUT, &bytes[..header], &mut host, header);
        from_host_bytes(&host)
    }

    /// Encode the header alone, `header_size()` bytes, in `order`
    pub fn encode(&self, order: ByteOrder) -> Result<Vec<u8>, ParseError> {
        let mut host = to_host_bytes(self)?;
        host.truncate(self.header_size());
        Ok(super::reorder(PARAMETER_DATA_LAYOUT, host, order))
    }
}
