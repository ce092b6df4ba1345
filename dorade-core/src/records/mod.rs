//! DORADE descriptor schemas.
//!
//! Every descriptor opens with an 8-byte generic header: a 4-character
//! ASCII tag and the descriptor's own declared size. Readers use the size
//! to skip descriptors they do not understand, and to detect byte-swapped
//! files: no legal descriptor is larger than [`MAX_REC_SIZE`], so a
//! declared size above it must be in the other byte order.
//!
//! Records are held as owned values. Decoding brings the raw bytes into
//! host order through the record's recipe in [`crate::crackers`], then
//! deserializes the host-order image. Encoding is the reverse.

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::crackers::{crack, ByteOrder, CrackRow};
use crate::error::ParseError;

pub mod cells;
pub mod parameter;
pub mod passthrough;
pub mod ray;
pub mod volume;

pub use cells::{CellSpacing, CellVector};
pub use parameter::{ParameterData, ParameterInfo};
pub use passthrough::{Comment, ExtraStuff, FieldRadarInfo, NullDescriptor};
pub use ray::{PlatformInfo, RayInfo};
pub use volume::{CorrectionFactors, KeyTable, RadarInfo, SuperSweepInfo, SweepInfo, VolumeInfo};

/// Four-character descriptor identifier
pub type Tag = [u8; 4];

/// Largest legal declared descriptor size
pub const MAX_REC_SIZE: u32 = 65500;

/// Size of the tag plus declared-size prefix
pub const GENERIC_DESCRIPTOR_SIZE: usize = 8;

pub const SSWB: Tag = *b"SSWB";
pub const VOLD: Tag = *b"VOLD";
pub const RADD: Tag = *b"RADD";
pub const PARM: Tag = *b"PARM";
pub const CELV: Tag = *b"CELV";
pub const CSFD: Tag = *b"CSFD";
pub const FRIB: Tag = *b"FRIB";
pub const CFAC: Tag = *b"CFAC";
pub const COMM: Tag = *b"COMM";
pub const SWIB: Tag = *b"SWIB";
pub const RYIB: Tag = *b"RYIB";
pub const ASIB: Tag = *b"ASIB";
pub const XSTF: Tag = *b"XSTF";
pub const RDAT: Tag = *b"RDAT";
pub const QDAT: Tag = *b"QDAT";
pub const NULL: Tag = *b"NULL";
pub const RKTB: Tag = *b"RKTB";

/// Render a tag for messages
pub fn tag_name(tag: &[u8]) -> String {
    String::from_utf8_lossy(&tag[..tag.len().min(4)]).into_owned()
}

/// Tag and declared size of the descriptor at the start of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHeader {
    pub tag: Tag,
    /// Declared size in bytes, already in host order
    pub size: u32,
    /// Byte order the descriptor was written in
    pub order: ByteOrder,
}

impl DescriptorHeader {
    /// Read the generic header, detecting byte order from the size field.
    pub fn peek(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.len() < GENERIC_DESCRIPTOR_SIZE {
            return Err(ParseError::TooShort {
                expected: GENERIC_DESCRIPTOR_SIZE,
                actual: bytes.len(),
            });
        }
        let tag: Tag = [bytes[0], bytes[1], bytes[2], bytes[3]];
        let raw = [bytes[4], bytes[5], bytes[6], bytes[7]];

        let mut order = ByteOrder::Native;
        let mut size = order.read_u32(raw);
        if size > MAX_REC_SIZE {
            order = ByteOrder::Swapped;
            size = order.read_u32(raw);
        }
        if size < GENERIC_DESCRIPTOR_SIZE as u32 || size > MAX_REC_SIZE {
            return Err(ParseError::InvalidDescriptorSize {
                tag: tag_name(&tag),
                size,
            });
        }
        Ok(Self { tag, size, order })
    }

    pub fn is(&self, tag: &Tag) -> bool {
        &self.tag == tag
    }
}

/// Fail unless `bytes` starts with `tag`
pub fn expect_tag(bytes: &[u8], tag: &Tag) -> Result<(), ParseError> {
    if bytes.len() < 4 {
        return Err(ParseError::TooShort {
            expected: 4,
            actual: bytes.len(),
        });
    }
    if &bytes[..4] != tag {
        return Err(ParseError::UnexpectedTag {
            expected: tag_name(tag),
            actual: tag_name(&bytes[..4]),
        });
    }
    Ok(())
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_native_endian()
        .allow_trailing_bytes()
}

/// Deserialize a host-order record image
pub(crate) fn from_host_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ParseError> {
    Ok(codec().deserialize(bytes)?)
}

/// Serialize a record into its host-order image
pub(crate) fn to_host_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, ParseError> {
    Ok(codec().serialize(value)?)
}

/// A fixed-layout descriptor
pub trait Descriptor: Sized {
    const TAG: Tag;
    /// Size of the host-order image
    const SIZE: usize;
    /// Byte-order recipe
    const LAYOUT: &'static [CrackRow];

    /// Decode a host-order image of at least `SIZE` bytes
    fn from_host(bytes: &[u8]) -> Result<Self, ParseError>;

    /// Host-order image
    fn to_host(&self) -> Result<Vec<u8>, ParseError>;

    /// Decode from file bytes in `order`.
    ///
    /// Shorter records written by older software are accepted; the
    /// missing trailing fields decode as zero.
    fn decode(bytes: &[u8], order: ByteOrder) -> Result<Self, ParseError> {
        expect_tag(bytes, &Self::TAG)?;
        let n = bytes.len().min(Self::SIZE);
        let mut host = vec![0u8; Self::SIZE];
        order.normalize(Self::LAYOUT, &bytes[..n], &mut host, n);
        Self::from_host(&host)
    }

    /// Encode for a file in `order`
    fn encode(&self, order: ByteOrder) -> Result<Vec<u8>, ParseError> {
        let host = self.to_host()?;
        Ok(reorder(Self::LAYOUT, host, order))
    }
}

/// Swap a host-order image in place of itself when `order` asks for it
pub(crate) fn reorder(layout: &[CrackRow], host: Vec<u8>, order: ByteOrder) -> Vec<u8> {
    match order {
        ByteOrder::Native => host,
        ByteOrder::Swapped => {
            let mut out = host.clone();
            crack(layout, &host, &mut out, 0);
            out
        }
    }
}

// ===== Host-order field access for hand-laid records =====

pub(crate) fn ensure_len(bytes: &[u8], expected: usize) -> Result<(), ParseError> {
    if bytes.len() < expected {
        return Err(ParseError::TooShort {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

pub(crate) fn get_i16(b: &[u8], at: usize) -> i16 {
    i16::from_ne_bytes([b[at], b[at + 1]])
}

pub(crate) fn get_i32(b: &[u8], at: usize) -> i32 {
    i32::from_ne_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

pub(crate) fn get_f32(b: &[u8], at: usize) -> f32 {
    f32::from_ne_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

pub(crate) fn put_i16(b: &mut [u8], at: usize, v: i16) {
    b[at..at + 2].copy_from_slice(&v.to_ne_bytes());
}

pub(crate) fn put_i32(b: &mut [u8], at: usize, v: i32) {
    b[at..at + 4].copy_from_slice(&v.to_ne_bytes());
}

pub(crate) fn put_f32(b: &mut [u8], at: usize, v: f32) {
    b[at..at + 4].copy_from_slice(&v.to_ne_bytes());
}

pub(crate) fn get_fixed<const N: usize>(b: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&b[at..at + N]);
    out
}

/// Copy a string into a fixed, NUL-padded field
pub fn fixed_str<const N: usize>(s: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let b = s.as_bytes();
    let n = b.len().min(N);
    out[..n].copy_from_slice(&b[..n]);
    out
}

/// Text of a fixed, NUL-padded field with trailing blanks removed
pub fn str_from_fixed(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}
