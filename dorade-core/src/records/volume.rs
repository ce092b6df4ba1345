//! Per-file and per-sweep header descriptors: SSWB, VOLD, RADD, SWIB, CFAC.

use serde::{Deserialize, Serialize};

use super::{fixed_str, from_host_bytes, str_from_fixed, to_host_bytes, Descriptor, Tag};
use crate::crackers::{
    ByteOrder, CrackRow, CORRECTION_LAYOUT, PACKED_SUPER_SWEEP_LAYOUT, RADAR_LAYOUT, SUPER_SWEEP_LAYOUT,
    SWEEP_LAYOUT, VOLUME_LAYOUT,
};
use crate::error::ParseError;

/// Implements [`Descriptor`] for a serde record through bincode
macro_rules! serde_descriptor {
    ($ty:ty, $tag:expr, $size:expr, $layout:expr) => {
        impl Descriptor for $ty {
            const TAG: Tag = $tag;
            const SIZE: usize = $size;
            const LAYOUT: &'static [CrackRow] = $layout;

            fn from_host(bytes: &[u8]) -> Result<Self, ParseError> {
                from_host_bytes(bytes)
            }

            fn to_host(&self) -> Result<Vec<u8>, ParseError> {
                to_host_bytes(self)
            }
        }
    };
}
pub(crate) use serde_descriptor;

/// Rotation-angle key table type
pub const KEYED_BY_ROT_ANG: i32 = 2;

/// Size of the SSWB on hosts that pack doubles on 4-byte boundaries
pub const PACKED_SUPER_SWEEP_SIZE: usize = 196;

/// One entry of the SSWB key table
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyTable {
    pub offset: i32,
    pub size: i32,
    pub kind: i32,
}

/// SSWB: the master header at offset 0 of every sweep file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperSweepInfo {
    pub id: Tag,
    pub nbytes: i32,
    pub last_used: i32,
    pub start_time: i32,
    pub stop_time: i32,
    pub sizeof_file: i32,
    pub compression_flag: i32,
    pub volume_time_stamp: i32,
    pub num_params: i32,
    pub radar_name: [u8; 8],
    pad: i32,
    pub d_start_time: f64,
    pub d_stop_time: f64,
    pub version_num: i32,
    pub num_key_tables: i32,
    pub status: i32,
    pub place_holder: [i32; 7],
    pub key_table: [KeyTable; 8],
}

impl Default for SuperSweepInfo {
    fn default() -> Self {
        let mut key_table = [KeyTable::default(); 8];
        key_table[0].kind = KEYED_BY_ROT_ANG;
        Self {
            id: super::SSWB,
            nbytes: Self::SIZE as i32,
            last_used: 0,
            start_time: 0,
            stop_time: 0,
            sizeof_file: 0,
            compression_flag: 0,
            volume_time_stamp: 0,
            num_params: 0,
            radar_name: [0; 8],
            pad: 0,
            d_start_time: 0.0,
            d_stop_time: 0.0,
            version_num: 1,
            num_key_tables: 1,
            status: 0,
            place_holder: [0; 7],
            key_table,
        }
    }
}

impl SuperSweepInfo {
    pub fn radar_name(&self) -> String {
        str_from_fixed(&self.radar_name)
    }
}

impl Descriptor for SuperSweepInfo {
    const TAG: Tag = super::SSWB;
    const SIZE: usize = 200;
    const LAYOUT: &'static [CrackRow] = SUPER_SWEEP_LAYOUT;

    fn from_host(bytes: &[u8]) -> Result<Self, ParseError> {
        from_host_bytes(bytes)
    }

    fn to_host(&self) -> Result<Vec<u8>, ParseError> {
        to_host_bytes(self)
    }

    /// Accepts both the aligned (200 byte) and packed (196 byte) layouts
    fn decode(bytes: &[u8], order: ByteOrder) -> Result<Self, ParseError> {
        super::expect_tag(bytes, &Self::TAG)?;
        let layout = if bytes.len() == PACKED_SUPER_SWEEP_SIZE {
            PACKED_SUPER_SWEEP_LAYOUT
        } else {
            SUPER_SWEEP_LAYOUT
        };
        let n = bytes.len().min(Self::SIZE);
        let mut host = vec![0u8; Self::SIZE];
        order.normalize(layout, &bytes[..n], &mut host, n);
        let mut sswb = Self::from_host(&host)?;
        sswb.nbytes = Self::SIZE as i32;
        Ok(sswb)
    }
}

/// VOLD: volume description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeInfo {
    pub id: Tag,
    pub nbytes: i32,
    pub format_version: i16,
    pub volume_num: i16,
    pub maximum_bytes: i32,
    pub proj_name: [u8; 20],
    pub year: i16,
    pub month: i16,
    pub day: i16,
    pub data_set_hour: i16,
    pub data_set_minute: i16,
    pub data_set_second: i16,
    pub flight_num: [u8; 8],
    pub gen_facility: [u8; 8],
    pub gen_year: i16,
    pub gen_month: i16,
    pub gen_day: i16,
    pub number_sensor_des: i16,
}

impl Default for VolumeInfo {
    fn default() -> Self {
        Self {
            id: super::VOLD,
            nbytes: Self::SIZE as i32,
            format_version: 1,
            volume_num: 1,
            maximum_bytes: super::MAX_REC_SIZE as i32,
            proj_name: [0; 20],
            year: 1970,
            month: 1,
            day: 1,
            data_set_hour: 0,
            data_set_minute: 0,
            data_set_second: 0,
            flight_num: [0; 8],
            gen_facility: [0; 8],
            gen_year: 1970,
            gen_month: 1,
            gen_day: 1,
            number_sensor_des: 1,
        }
    }
}

serde_descriptor!(VolumeInfo, super::VOLD, 72, VOLUME_LAYOUT);

/// RADD: radar description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarInfo {
    pub id: Tag,
    pub nbytes: i32,
    pub radar_name: [u8; 8],
    pub radar_const: f32,
    pub peak_power: f32,
    pub noise_power: f32,
    pub receiver_gain: f32,
    pub antenna_gain: f32,
    pub system_gain: f32,
    pub horz_beam_width: f32,
    pub vert_beam_width: f32,
    pub radar_type: i16,
    pub scan_mode: i16,
    pub req_rotat_vel: f32,
    pub scan_mode_pram0: f32,
    pub scan_mode_pram1: f32,
    pub num_parameter_des: i16,
    pub total_num_des: i16,
    pub data_compress: i16,
    pub data_reduction: i16,
    pub data_red_parm0: f32,
    pub data_red_parm1: f32,
    pub radar_longitude: f32,
    pub radar_latitude: f32,
    pub radar_altitude: f32,
    pub eff_unamb_vel: f32,
    pub eff_unamb_range: f32,
    pub num_freq_trans: i16,
    pub num_ipps_trans: i16,
    pub freq: [f32; 5],
    pub interpulse_per: [f32; 5],
    pub extension_num: i32,
    pub config_name: [u8; 8],
    pub config_num: i32,
    pub aperture_size: f32,
    pub field_of_view: f32,
    pub aperture_eff: f32,
    pub aux_freq: [f32; 11],
    pub aux_ipp: [f32; 11],
    pub pulse_width: f32,
    pub primary_cop_baseln: f32,
    pub secondary_cop_baseln: f32,
    pub pc_xmtr_bandwidth: f32,
    pub pc_waveform_type: i32,
    pub site_name: [u8; 20],
}

/// Ground-based radar type code
pub const RADAR_GROUND: i16 = 0;

impl Default for RadarInfo {
    fn default() -> Self {
        Self {
            id: super::RADD,
            nbytes: Self::SIZE as i32,
            radar_name: [0; 8],
            radar_const: 0.0,
            peak_power: 0.0,
            noise_power: 0.0,
            receiver_gain: 0.0,
            antenna_gain: 0.0,
            system_gain: 0.0,
            horz_beam_width: 0.0,
            vert_beam_width: 0.0,
            radar_type: RADAR_GROUND,
            scan_mode: 1,
            req_rotat_vel: 0.0,
            scan_mode_pram0: 0.0,
            scan_mode_pram1: 0.0,
            num_parameter_des: 0,
            total_num_des: 0,
            data_compress: 0,
            data_reduction: 0,
            data_red_parm0: 0.0,
            data_red_parm1: 0.0,
            radar_longitude: 0.0,
            radar_latitude: 0.0,
            radar_altitude: 0.0,
            eff_unamb_vel: 0.0,
            eff_unamb_range: 0.0,
            num_freq_trans: 0,
            num_ipps_trans: 0,
            freq: [0.0; 5],
            interpulse_per: [0.0; 5],
            extension_num: 0,
            config_name: [0; 8],
            config_num: 0,
            aperture_size: 0.0,
            field_of_view: 0.0,
            aperture_eff: 0.0,
            aux_freq: [0.0; 11],
            aux_ipp: [0.0; 11],
            pulse_width: 0.0,
            primary_cop_baseln: 0.0,
            secondary_cop_baseln: 0.0,
            pc_xmtr_bandwidth: 0.0,
            pc_waveform_type: 0,
            site_name: [0; 20],
        }
    }
}

impl RadarInfo {
    pub fn with_name(name: &str) -> Self {
        Self {
            radar_name: fixed_str(name),
            ..Self::default()
        }
    }

    pub fn radar_name(&self) -> String {
        str_from_fixed(&self.radar_name)
    }
}

serde_descriptor!(RadarInfo, super::RADD, 300, RADAR_LAYOUT);

/// SWIB: sweep description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepInfo {
    pub id: Tag,
    pub nbytes: i32,
    pub radar_name: [u8; 8],
    pub sweep_num: i32,
    pub num_rays: i32,
    pub start_angle: f32,
    pub stop_angle: f32,
    pub fixed_angle: f32,
    pub filter_flag: i32,
}

impl Default for SweepInfo {
    fn default() -> Self {
        Self {
            id: super::SWIB,
            nbytes: Self::SIZE as i32,
            radar_name: [0; 8],
            sweep_num: 0,
            num_rays: 0,
            start_angle: 0.0,
            stop_angle: 0.0,
            fixed_angle: 0.0,
            filter_flag: 0,
        }
    }
}

serde_descriptor!(SweepInfo, super::SWIB, 40, SWEEP_LAYOUT);

/// CFAC: navigation and pointing corrections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionFactors {
    pub id: Tag,
    pub nbytes: i32,
    pub azimuth_corr: f32,
    pub elevation_corr: f32,
    pub range_delay_corr: f32,
    pub longitude_corr: f32,
    pub latitude_corr: f32,
    pub pressure_alt_corr: f32,
    pub radar_alt_corr: f32,
    pub ew_gndspd_corr: f32,
    pub ns_gndspd_corr: f32,
    pub vert_vel_corr: f32,
    pub heading_corr: f32,
    pub roll_corr: f32,
    pub pitch_corr: f32,
    pub drift_corr: f32,
    pub rot_angle_corr: f32,
    pub tilt_corr: f32,
}

impl Default for CorrectionFactors {
    fn default() -> Self {
        Self {
            id: super::CFAC,
            nbytes: Self::SIZE as i32,
            azimuth_corr: 0.0,
            elevation_corr: 0.0,
            range_delay_corr: 0.0,
            longitude_corr: 0.0,
            latitude_corr: 0.0,
            pressure_alt_corr: 0.0,
            radar_alt_corr: 0.0,
            ew_gndspd_corr: 0.0,
            ns_gndspd_corr: 0.0,
            vert_vel_corr: 0.0,
            heading_corr: 0.0,
            roll_corr: 0.0,
            pitch_corr: 0.0,
            drift_corr: 0.0,
            rot_angle_corr: 0.0,
            tilt_corr: 0.0,
        }
    }
}

serde_descriptor!(CorrectionFactors, super::CFAC, 72, CORRECTION_LAYOUT);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_image_sizes() {
        assert_eq!(SuperSweepInfo::default().to_host().unwrap().len(), 200);
        assert_eq!(VolumeInfo::default().to_host().unwrap().len(), 72);
        assert_eq!(RadarInfo::default().to_host().unwrap().len(), 300);
        assert_eq!(SweepInfo::default().to_host().unwrap().len(), 40);
        assert_eq!(CorrectionFactors::default().to_host().unwrap().len(), 72);
    }

    #[test]
    fn test_super_sweep_field_offsets() {
        let mut sswb = SuperSweepInfo::default();
        sswb.sizeof_file = 4096;
        sswb.d_start_time = 1.5e9;
        sswb.key_table[0].offset = 1234;
        let img = sswb.to_host().unwrap();
        assert_eq!(&img[0..4], b"SSWB");
        assert_eq!(i32::from_ne_bytes(img[20..24].try_into().unwrap()), 4096);
        assert_eq!(f64::from_ne_bytes(img[48..56].try_into().unwrap()), 1.5e9);
        assert_eq!(i32::from_ne_bytes(img[104..108].try_into().unwrap()), 1234);
        assert_eq!(i32::from_ne_bytes(img[112..116].try_into().unwrap()), KEYED_BY_ROT_ANG);
    }

    #[test]
    fn test_swapped_radar_decodes() {
        let mut radd = RadarInfo::with_name("SPOL");
        radd.num_parameter_des = 3;
        radd.radar_latitude = 39.9;
        radd.site_name = fixed_str("Marshall");

        let bytes = radd.encode(ByteOrder::Swapped).unwrap();
        assert_eq!(
            i16::from_ne_bytes([bytes[64], bytes[65]]),
            3i16.swap_bytes()
        );
        let back = RadarInfo::decode(&bytes, ByteOrder::Swapped).unwrap();
        assert_eq!(back, radd);
        assert_eq!(back.radar_name(), "SPOL");
    }

    #[test]
    fn test_short_radar_record_zero_fills() {
        let radd = RadarInfo::with_name("CHILL");
        let bytes = radd.encode(ByteOrder::Native).unwrap();
        let back = RadarInfo::decode(&bytes[..144], ByteOrder::Native).unwrap();
        assert_eq!(back.radar_name(), "CHILL");
        assert_eq!(back.extension_num, 0);
        assert_eq!(back.site_name, [0; 20]);
    }

    #[test]
    fn test_packed_super_sweep_decodes() {
        let mut sswb = SuperSweepInfo::default();
        sswb.sizeof_file = 777;
        sswb.d_stop_time = 42.0;
        sswb.key_table[0].size = 99;
        let aligned = sswb.to_host().unwrap();

        // Build the packed form by closing the 4-byte pad
        let mut packed = Vec::with_capacity(196);
        packed.extend_from_slice(&aligned[..44]);
        packed.extend_from_slice(&aligned[48..]);
        assert_eq!(packed.len(), PACKED_SUPER_SWEEP_SIZE);

        let back = SuperSweepInfo::decode(&packed, ByteOrder::Native).unwrap();
        assert_eq!(back.sizeof_file, 777);
        assert_eq!(back.d_stop_time, 42.0);
        assert_eq!(back.key_table[0].size, 99);
        assert_eq!(back.key_table[0].kind, KEYED_BY_ROT_ANG);
    }

    #[test]
    fn test_wrong_tag_rejected() {
        let bytes = SweepInfo::default().encode(ByteOrder::Native).unwrap();
        assert!(matches!(
            VolumeInfo::decode(&bytes, ByteOrder::Native),
            Err(ParseError::UnexpectedTag { .. })
        ));
    }
}
