//! Descriptors carried through unchanged: COMM, XSTF, FRIB and NULL.

use super::{ensure_len, get_i32, put_i32, str_from_fixed, Descriptor, Tag};
use crate::crackers::{ByteOrder, CrackRow, COMMENT_LAYOUT, EXTRA_STUFF_LAYOUT, FIELD_RADAR_LAYOUT, GENERIC_LAYOUT};
use crate::error::ParseError;

const COMMENT_TEXT: usize = 500;

/// COMM: free text attached to the volume
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: Vec<u8>,
}

impl Comment {
    pub fn new(text: &str) -> Self {
        let mut buf = vec![0u8; COMMENT_TEXT];
        let b = text.as_bytes();
        let n = b.len().min(COMMENT_TEXT);
        buf[..n].copy_from_slice(&b[..n]);
        Self { text: buf }
    }

    pub fn as_string(&self) -> String {
        str_from_fixed(&self.text)
    }
}

impl Descriptor for Comment {
    const TAG: Tag = super::COMM;
    const SIZE: usize = 8 + COMMENT_TEXT;
    const LAYOUT: &'static [CrackRow] = COMMENT_LAYOUT;

    fn from_host(b: &[u8]) -> Result<Self, ParseError> {
        ensure_len(b, Self::SIZE)?;
        Ok(Self {
            text: b[8..Self::SIZE].to_vec(),
        })
    }

    fn to_host(&self) -> Result<Vec<u8>, ParseError> {
        let mut b = vec![0u8; Self::SIZE];
        b[0..4].copy_from_slice(&Self::TAG);
        put_i32(&mut b, 4, Self::SIZE as i32);
        let n = self.text.len().min(COMMENT_TEXT);
        b[8..8 + n].copy_from_slice(&self.text[..n]);
        Ok(b)
    }
}

/// Fixed part of an XSTF block
pub const EXTRA_STUFF_HEADER: usize = 24;

/// XSTF: instrument-specific extras. The payload after the header is
/// kept as opaque bytes in the order it was read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtraStuff {
    pub one: i32,
    pub source_format: i32,
    pub offset_to_first_item: i32,
    pub transition_flag: i32,
    pub payload: Vec<u8>,
}

impl ExtraStuff {
    pub fn encoded_len(&self) -> usize {
        EXTRA_STUFF_HEADER + self.payload.len()
    }

    pub fn decode(bytes: &[u8], order: ByteOrder) -> Result<Self, ParseError> {
        super::expect_tag(bytes, &super::XSTF)?;
        ensure_len(bytes, EXTRA_STUFF_HEADER)?;
        let mut head = [0u8; EXTRA_STUFF_HEADER];
        order.normalize(EXTRA_STUFF_LAYOUT, &bytes[..EXTRA_STUFF_HEADER], &mut head, 0);
        Ok(Self {
            one: get_i32(&head, 8),
            source_format: get_i32(&head, 12),
            offset_to_first_item: get_i32(&head, 16),
            transition_flag: get_i32(&head, 20),
            payload: bytes[EXTRA_STUFF_HEADER..].to_vec(),
        })
    }

    pub fn encode(&self, order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&super::XSTF);
        for v in [
            self.encoded_len() as i32,
            self.one,
            self.source_format,
            self.offset_to_first_item,
            self.transition_flag,
        ] {
            out.extend_from_slice(&order.u32_bytes(v as u32));
        }
        out.extend_from_slice(&self.payload);
        out
    }
}

/// FRIB: field radar information, held as its host-order image
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRadarInfo {
    host: Vec<u8>,
}

impl FieldRadarInfo {
    pub fn data_sys_id(&self) -> i32 {
        get_i32(&self.host, 8)
    }

    /// Name of the header file the radar description came from
    pub fn file_name(&self) -> String {
        str_from_fixed(&self.host[184..264])
    }
}

impl Descriptor for FieldRadarInfo {
    const TAG: Tag = super::FRIB;
    const SIZE: usize = 264;
    const LAYOUT: &'static [CrackRow] = FIELD_RADAR_LAYOUT;

    fn from_host(b: &[u8]) -> Result<Self, ParseError> {
        ensure_len(b, Self::SIZE)?;
        Ok(Self {
            host: b[..Self::SIZE].to_vec(),
        })
    }

    fn to_host(&self) -> Result<Vec<u8>, ParseError> {
        Ok(self.host.clone())
    }
}

/// NULL: end-of-data marker written ahead of the rotation table
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NullDescriptor;

impl Descriptor for NullDescriptor {
    const TAG: Tag = super::NULL;
    const SIZE: usize = 8;
    const LAYOUT: &'static [CrackRow] = GENERIC_LAYOUT;

    fn from_host(b: &[u8]) -> Result<Self, ParseError> {
        ensure_len(b, Self::SIZE)?;
        Ok(Self)
    }

    fn to_host(&self) -> Result<Vec<u8>, ParseError> {
        let mut b = vec![0u8; Self::SIZE];
        b[0..4].copy_from_slice(&Self::TAG);
        put_i32(&mut b, 4, Self::SIZE as i32);
        Ok(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_text() {
        let comm = Comment::new("calibrated after maintenance");
        let bytes = comm.encode(ByteOrder::Swapped).unwrap();
        assert_eq!(bytes.len(), 508);
        assert_eq!(&bytes[4..8], &508u32.swap_bytes().to_ne_bytes());
        let back = Comment::decode(&bytes, ByteOrder::Swapped).unwrap();
        assert_eq!(back.as_string(), "calibrated after maintenance");
    }

    #[test]
    fn test_extra_stuff_keeps_payload() {
        let xstf = ExtraStuff {
            one: 1,
            source_format: 3,
            offset_to_first_item: 24,
            transition_flag: 0,
            payload: vec![9, 8, 7, 6],
        };
        let bytes = xstf.encode(ByteOrder::Swapped);
        assert_eq!(bytes.len(), 28);
        let back = ExtraStuff::decode(&bytes, ByteOrder::Swapped).unwrap();
        assert_eq!(back, xstf);
    }

    #[test]
    fn test_field_radar_swaps_header_words() {
        let mut host = vec![0u8; 264];
        host[0..4].copy_from_slice(b"FRIB");
        host[4..8].copy_from_slice(&264i32.to_ne_bytes());
        host[8..12].copy_from_slice(&7i32.to_ne_bytes());
        host[184..192].copy_from_slice(b"eldr.hdr");
        let frib = FieldRadarInfo::from_host(&host).unwrap();
        let bytes = frib.encode(ByteOrder::Swapped).unwrap();
        assert_eq!(&bytes[4..8], &264u32.swap_bytes().to_ne_bytes());
        let back = FieldRadarInfo::decode(&bytes, ByteOrder::Swapped).unwrap();
        assert_eq!(back, frib);
        assert_eq!(back.data_sys_id(), 7);
        assert_eq!(back.file_name(), "eldr.hdr");
    }

    #[test]
    fn test_null_descriptor() {
        let bytes = NullDescriptor.encode(ByteOrder::Native).unwrap();
        assert_eq!(&bytes[..4], b"NULL");
        assert!(NullDescriptor::decode(&bytes, ByteOrder::Native).is_ok());
    }
}
