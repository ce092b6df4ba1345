//! Sweep-file names.
//!
//! Two naming styles are in use. The writer produces the dotted form:
//!
//! ```text
//!   swp.1240301123456.SPOL.2789.v3.s7.0.5_SUR
//!       │  │         │    │    │  │  │   └ qualifier
//!       │  │         │    │    │  │  └ fixed angle, one decimal
//!       │  │         │    │    │  └ sweep number
//!       │  │         │    │    └ volume number
//!       │  │         │    └ version * 1000 + milliseconds
//!       │  │         └ radar
//!       │  └ MMDDhhmmss
//!       └ year - 1900
//! ```
//!
//! Some tools write an underscored form instead:
//! `swp_SPOL_20240301_123456.789_v3_s7_0.5_SUR_qual`.
//!
//! Parsing never fails. Fields that cannot be read keep their defaults.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};

use crate::types::ScanMode;

/// Fixed angle of a name that carries none
pub const FIXED_ANGLE_ABSENT: f32 = -999.0;

/// Suffix of a sweep file that is still being written
pub const TMP_SUFFIX: &str = ".tmp";

/// Parsed sweep-file name
#[derive(Debug, Clone, PartialEq)]
pub struct SweepFileName {
    pub file_type: String,
    pub radar: String,
    pub time: DateTime<Utc>,
    /// Negative when the name carries no version
    pub version: i32,
    pub volume_num: i32,
    pub sweep_num: i32,
    pub fixed_angle: f32,
    pub scan_mode: Option<ScanMode>,
    pub qualifier: String,
}

impl Default for SweepFileName {
    fn default() -> Self {
        Self {
            file_type: "swp".to_string(),
            radar: String::new(),
            time: DateTime::UNIX_EPOCH,
            version: -1,
            volume_num: 0,
            sweep_num: 0,
            fixed_angle: FIXED_ANGLE_ABSENT,
            scan_mode: None,
            qualifier: String::new(),
        }
    }
}

/// Leading integer of `s`, or 0
fn atoi(s: &str) -> i64 {
    let s = s.trim_start();
    let end = s
        .char_indices()
        .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    s[..end].parse().unwrap_or(0)
}

fn make_time(year: i64, month: i64, day: i64, hour: i64, minute: i64, second: i64, ms: i64) -> DateTime<Utc> {
    let date = NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32);
    date.and_then(|d| d.and_hms_milli_opt(hour as u32, minute as u32, second as u32, ms as u32))
        .map(|t| Utc.from_utc_datetime(&t))
        .unwrap_or(DateTime::UNIX_EPOCH)
}

/// Split "<fixed>_<qualifier>" into its parts
fn fixed_and_qualifier(rest: &str) -> (f32, String) {
    if let Some((angle, qualifier)) = rest.split_once('_') {
        if let Ok(fixed) = angle.parse::<f32>() {
            return (fixed, qualifier.to_string());
        }
    }
    (FIXED_ANGLE_ABSENT, rest.to_string())
}

impl SweepFileName {
    /// Parse a file name, ignoring any leading directories
    pub fn parse(name: &str) -> Self {
        let name = name.rsplit('/').next().unwrap_or(name);
        let name = name.strip_suffix(TMP_SUFFIX).unwrap_or(name);
        if Self::is_underscored(name) {
            Self::parse_underscored(name)
        } else {
            Self::parse_dotted(name)
        }
    }

    fn is_underscored(name: &str) -> bool {
        let tokens: Vec<&str> = name.split('_').collect();
        tokens.len() >= 8 && tokens[2].len() == 8 && tokens[2].bytes().all(|b| b.is_ascii_digit())
    }

    fn parse_dotted(name: &str) -> Self {
        let mut out = Self::default();
        let mut parts = name.splitn(5, '.');

        if let Some(t) = parts.next() {
            out.file_type = t.to_string();
        }
        let stamp = parts.next().unwrap_or("");
        out.radar = parts.next().unwrap_or("").to_string();
        let vm = atoi(parts.next().unwrap_or(""));
        let ms = vm % 1000;
        out.version = (vm / 1000) as i32;

        if stamp.len() >= 10 && stamp.is_char_boundary(stamp.len() - 10) {
            let (year, clock) = stamp.split_at(stamp.len() - 10);
            let field = |i: usize| atoi(clock.get(i..i + 2).unwrap_or(""));
            out.time = make_time(
                1900 + atoi(year),
                field(0),
                field(2),
                field(4),
                field(6),
                field(8),
                ms,
            );
        }

        // Volume and sweep tokens are absent from older names
        let mut rest = parts.next().unwrap_or("");
        for (prefix, slot) in [('v', &mut out.volume_num), ('s', &mut out.sweep_num)] {
            let Some(tail) = rest.strip_prefix(prefix) else {
                break;
            };
            let (num, after) = tail.split_once('.').unwrap_or((tail, ""));
            if num.is_empty() || !num.bytes().all(|b| b.is_ascii_digit()) {
                break;
            }
            *slot = atoi(num) as i32;
            rest = after;
        }

        if !rest.is_empty() {
            let (fixed, qualifier) = fixed_and_qualifier(rest);
            out.fixed_angle = fixed;
            out.qualifier = qualifier;
        }
        out
    }

    fn parse_underscored(name: &str) -> Self {
        let mut out = Self::default();
        let tokens: Vec<&str> = name.splitn(9, '_').collect();
        let tok = |i: usize| tokens.get(i).copied().unwrap_or("");

        out.file_type = tok(0).to_string();
        out.radar = tok(1).to_string();

        let date = tok(2);
        let field = |s: &str, i: usize, n: usize| atoi(s.get(i..i + n).unwrap_or(""));
        let (clock, ms) = tok(3).split_once('.').unwrap_or((tok(3), "0"));
        out.time = make_time(
            field(date, 0, 4),
            field(date, 4, 2),
            field(date, 6, 2),
            field(clock, 0, 2),
            field(clock, 2, 2),
            field(clock, 4, 2),
            atoi(ms),
        );

        out.volume_num = atoi(tok(4).get(1..).unwrap_or("")) as i32;
        out.sweep_num = atoi(tok(5).get(1..).unwrap_or("")) as i32;
        out.fixed_angle = tok(6).parse().unwrap_or(FIXED_ANGLE_ABSENT);
        out.scan_mode = ScanMode::from_mnemonic(tok(7));
        out.qualifier = tok(8).to_string();
        out
    }

    /// Milliseconds of the timestamp
    pub fn millisecond(&self) -> i64 {
        i64::from(self.time.timestamp_subsec_millis())
    }

    /// Time in seconds since the epoch, with millisecond fraction
    pub fn epoch_seconds(&self) -> f64 {
        self.time.timestamp_millis() as f64 / 1000.0
    }

    /// Dotted name without the fixed angle and qualifier
    pub fn base_name(&self) -> String {
        let t = &self.time;
        let ms = self.millisecond();
        let vm = if self.version >= 0 {
            i64::from(self.version) * 1000 + ms
        } else {
            ms
        };
        format!(
            "{}.{:02}{:02}{:02}{:02}{:02}{:02}.{}.{}.v{}.s{}",
            self.file_type,
            t.year() - 1900,
            t.month(),
            t.day(),
            t.hour(),
            t.minute(),
            t.second(),
            self.radar,
            vm,
            self.volume_num,
            self.sweep_num
        )
    }

    /// Name of the file while it is being written
    pub fn tmp_name(&self) -> String {
        format!("{}{}", self.base_name(), TMP_SUFFIX)
    }

    /// Final name, with fixed angle and qualifier appended
    pub fn permanent_name(&self) -> String {
        format!("{}.{:.1}_{}", self.base_name(), self.fixed_angle, self.qualifier)
    }

    pub fn underscored_name(&self) -> String {
        let t = &self.time;
        let mut s = format!(
            "{}_{}_{:04}{:02}{:02}_{:02}{:02}{:02}.{:03}_v{}_s{}_{:.1}_{}",
            self.file_type,
            self.radar,
            t.year(),
            t.month(),
            t.day(),
            t.hour(),
            t.minute(),
            t.second(),
            self.millisecond(),
            self.volume_num,
            self.sweep_num,
            self.fixed_angle,
            self.scan_mode.map_or("???", Into::into),
        );
        if !self.qualifier.is_empty() {
            s.push('_');
            s.push_str(&self.qualifier);
        }
        s
    }
}

impl fmt::Display for SweepFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.permanent_name())
    }
}
