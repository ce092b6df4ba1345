//! Coded enumerations stored as small integers in the descriptors.

use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Antenna scan strategy, RADD `scan_mode`
#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, IntoStaticStr)]
#[strum(ascii_case_insensitive, serialize_all = "UPPERCASE")]
pub enum ScanMode {
    Cal = 0,
    Ppi = 1,
    Cop = 2,
    Rhi = 3,
    Ver = 4,
    Tar = 5,
    Man = 6,
    Idl = 7,
    Sur = 8,
    Air = 9,
}

impl ScanMode {
    pub fn from_code(code: i16) -> Option<Self> {
        Self::from_i16(code)
    }

    /// Three-letter mnemonic; `???` for codes outside the table
    pub fn mnemonic(code: i16) -> &'static str {
        match Self::from_code(code) {
            Some(mode) => mode.into(),
            None => "???",
        }
    }

    /// Parse a mnemonic without regard to case
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        s.parse().ok()
    }
}

/// Sample encoding, PARM `binary_format`
#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryFormat {
    Int8 = 1,
    Int16 = 2,
    Int32 = 3,
    Float32 = 4,
}

impl BinaryFormat {
    pub fn from_code(code: i16) -> Option<Self> {
        Self::from_i16(code)
    }

    /// Bytes per sample
    pub fn width(self) -> usize {
        match self {
            BinaryFormat::Int8 => 1,
            BinaryFormat::Int16 => 2,
            BinaryFormat::Int32 | BinaryFormat::Float32 => 4,
        }
    }
}

/// Field data compression, RADD `data_compress` and SSWB `compression_flag`
#[derive(Primitive, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Compression {
    #[default]
    None = 0,
    Hrd = 1,
}

impl Compression {
    pub fn from_code(code: i16) -> Option<Self> {
        Self::from_i16(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_mode_mnemonics() {
        assert_eq!(ScanMode::mnemonic(1), "PPI");
        assert_eq!(ScanMode::mnemonic(9), "AIR");
        assert_eq!(ScanMode::mnemonic(42), "???");
        assert_eq!(ScanMode::mnemonic(-1), "???");
        assert_eq!(ScanMode::Rhi.to_string(), "RHI");
        assert_eq!(ScanMode::Sur.as_ref(), "SUR");
    }

    #[test]
    fn test_scan_mode_parse_ignores_case() {
        assert_eq!(ScanMode::from_mnemonic("sur"), Some(ScanMode::Sur));
        assert_eq!(ScanMode::from_mnemonic("Tar"), Some(ScanMode::Tar));
        assert_eq!(ScanMode::from_mnemonic("XYZ"), None);
    }

    #[test]
    fn test_binary_formats() {
        assert_eq!(BinaryFormat::from_code(1), Some(BinaryFormat::Int8));
        assert_eq!(BinaryFormat::from_code(4).map(BinaryFormat::width), Some(4));
        assert_eq!(BinaryFormat::from_code(16), None);
        assert_eq!(Compression::from_code(1), Some(Compression::Hrd));
        assert_eq!(Compression::default() as i16, 0);
    }
}
