//! Per-ray descriptors: RYIB ray info and ASIB platform geometry.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::volume::serde_descriptor;
use super::{from_host_bytes, to_host_bytes, Descriptor, Tag};
use crate::crackers::{CrackRow, PLATFORM_LAYOUT, RAY_LAYOUT};
use crate::error::ParseError;

/// RYIB: time and pointing of one ray
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RayInfo {
    pub id: Tag,
    pub nbytes: i32,
    pub sweep_num: i32,
    pub julian_day: i32,
    pub hour: i16,
    pub minute: i16,
    pub second: i16,
    pub millisecond: i16,
    pub azimuth: f32,
    pub elevation: f32,
    pub peak_power: f32,
    pub true_scan_rate: f32,
    pub ray_status: i32,
}

impl Default for RayInfo {
    fn default() -> Self {
        Self {
            id: super::RYIB,
            nbytes: Self::SIZE as i32,
            sweep_num: 0,
            julian_day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            millisecond: 0,
            azimuth: 0.0,
            elevation: 0.0,
            peak_power: 0.0,
            true_scan_rate: 0.0,
            ray_status: 0,
        }
    }
}

impl RayInfo {
    /// Absolute ray time. The RYIB only carries the day of year, so the
    /// year comes from the volume header.
    pub fn time(&self, year: i32) -> Option<DateTime<Utc>> {
        let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
        let day = jan1.checked_add_signed(Duration::days(i64::from(self.julian_day) - 1))?;
        let naive = day.and_hms_milli_opt(
            u32::try_from(self.hour).ok()?,
            u32::try_from(self.minute).ok()?,
            u32::try_from(self.second).ok()?,
            u32::try_from(self.millisecond).ok()?,
        )?;
        Some(Utc.from_utc_datetime(&naive))
    }

    /// Fill the day-of-year and clock fields from `t`
    pub fn set_time(&mut self, t: DateTime<Utc>) {
        self.julian_day = t.ordinal() as i32;
        self.hour = t.hour() as i16;
        self.minute = t.minute() as i16;
        self.second = t.second() as i16;
        self.millisecond = (t.timestamp_subsec_millis() % 1000) as i16;
    }
}

serde_descriptor!(RayInfo, super::RYIB, 44, RAY_LAYOUT);

/// ASIB: platform position and attitude, for moving radars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub id: Tag,
    pub nbytes: i32,
    pub longitude: f32,
    pub latitude: f32,
    pub altitude_msl: f32,
    pub altitude_agl: f32,
    pub ew_velocity: f32,
    pub ns_velocity: f32,
    pub vert_velocity: f32,
    pub heading: f32,
    pub roll: f32,
    pub pitch: f32,
    pub drift_angle: f32,
    pub rotation_angle: f32,
    pub tilt: f32,
    pub ew_horiz_wind: f32,
    pub ns_horiz_wind: f32,
    pub vert_wind: f32,
    pub heading_change: f32,
    pub pitch_change: f32,
}

impl Default for PlatformInfo {
    fn default() -> Self {
        Self {
            id: super::ASIB,
            nbytes: Self::SIZE as i32,
            longitude: 0.0,
            latitude: 0.0,
            altitude_msl: 0.0,
            altitude_agl: 0.0,
            ew_velocity: 0.0,
            ns_velocity: 0.0,
            vert_velocity: 0.0,
            heading: 0.0,
            roll: 0.0,
            pitch: 0.0,
            drift_angle: 0.0,
            rotation_angle: 0.0,
            tilt: 0.0,
            ew_horiz_wind: 0.0,
            ns_horiz_wind: 0.0,
            vert_wind: 0.0,
            heading_change: 0.0,
            pitch_change: 0.0,
        }
    }
}

serde_descriptor!(PlatformInfo, super::ASIB, 80, PLATFORM_LAYOUT);
