//! Table-driven byte-order conversion for fixed-layout descriptors.
//!
//! Every DORADE descriptor has a static recipe: an ordered list of rows,
//! each naming a source offset, an element kind, a repeat count, how many
//! rows to advance afterwards and a destination offset. One interpreter
//! walks any recipe, copying byte fields verbatim and reversing the bytes
//! of every multi-byte element. A sibling interpreter walks the same
//! recipe without swapping, which relocates fields between packed and
//! aligned layouts of the same record.
//!
//! ```text
//!   src (file order)            dst (host order)
//!   ┌────┬────────┬──────┐      ┌────┬────────┬──────┐
//!   │SWIB│00 00 28│ ...  │ ───► │SWIB│28 00 00│ ...  │
//!   └────┴────────┴──────┘      └────┴────────┴──────┘
//!    Bytes  Int32   Float32       copied  swapped  swapped
//! ```

use serde::{Deserialize, Serialize};

/// Element kind of a recipe row. Determines the swap width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Character data, never swapped
    Bytes,
    Int16,
    Int32,
    Float32,
    Float64,
}

impl FieldKind {
    /// Width of one element in bytes
    pub const fn width(self) -> usize {
        match self {
            FieldKind::Bytes => 1,
            FieldKind::Int16 => 2,
            FieldKind::Int32 | FieldKind::Float32 => 4,
            FieldKind::Float64 => 8,
        }
    }
}

/// One row of a byte-order recipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrackRow {
    /// Offset of the first element in the source buffer
    pub src_offset: usize,
    /// Element kind
    pub kind: FieldKind,
    /// Number of consecutive elements
    pub repeat: usize,
    /// Rows to advance after this one (at least 1)
    pub skip: usize,
    /// Offset of the first element in the destination buffer
    pub dst_offset: usize,
}

impl CrackRow {
    /// Row whose source and destination offsets are the same
    pub const fn new(offset: usize, kind: FieldKind, repeat: usize) -> Self {
        Self {
            src_offset: offset,
            kind,
            repeat,
            skip: 1,
            dst_offset: offset,
        }
    }

    /// Row that moves its elements to a different offset
    pub const fn relocated(src_offset: usize, kind: FieldKind, repeat: usize, dst_offset: usize) -> Self {
        Self {
            src_offset,
            kind,
            repeat,
            skip: 1,
            dst_offset,
        }
    }

    /// Same row, advancing `skip` rows afterwards
    pub const fn skipping(self, skip: usize) -> Self {
        Self { skip, ..self }
    }

    /// Total bytes covered by this row
    pub const fn len(&self) -> usize {
        self.kind.width() * self.repeat
    }
}

const fn bytes(offset: usize, n: usize) -> CrackRow {
    CrackRow::new(offset, FieldKind::Bytes, n)
}

const fn shorts(offset: usize, n: usize) -> CrackRow {
    CrackRow::new(offset, FieldKind::Int16, n)
}

const fn longs(offset: usize, n: usize) -> CrackRow {
    CrackRow::new(offset, FieldKind::Int32, n)
}

const fn floats(offset: usize, n: usize) -> CrackRow {
    CrackRow::new(offset, FieldKind::Float32, n)
}

/// Reverse the bytes of each `width`-sized element of `src` into `dst`.
///
/// Both slices must have the same length, a multiple of `width`.
pub fn swap_elements(src: &[u8], dst: &mut [u8], width: usize) {
    if width <= 1 {
        dst.copy_from_slice(src);
        return;
    }
    for (s, d) in src.chunks_exact(width).zip(dst.chunks_exact_mut(width)) {
        for (i, b) in s.iter().rev().enumerate() {
            d[i] = *b;
        }
    }
}

/// Swap an array of 16-bit words
pub fn swap_shorts(src: &[u8], dst: &mut [u8]) {
    swap_elements(src, dst, 2);
}

/// Swap an array of 32-bit words
pub fn swap_longs(src: &[u8], dst: &mut [u8]) {
    swap_elements(src, dst, 4);
}

fn walk(table: &[CrackRow], src: &[u8], dst: &mut [u8], limit: usize, swap: bool) -> usize {
    let mut ndx = 0;
    let mut applied = 0;

    while ndx < table.len() {
        let row = &table[ndx];
        if limit > 0 && row.src_offset >= limit {
            break;
        }
        let len = row.len();
        let (Some(s), Some(d)) = (
            src.get(row.src_offset..row.src_offset + len),
            dst.get_mut(row.dst_offset..row.dst_offset + len),
        ) else {
            break;
        };

        if swap {
            swap_elements(s, d, row.kind.width());
        } else {
            d.copy_from_slice(s);
        }
        applied += 1;
        ndx += row.skip.max(1);
    }
    applied
}

/// Convert a descriptor between byte orders following `table`.
///
/// Processing stops before the first row whose source offset reaches
/// `limit` (when `limit > 0`) or whose span would leave either buffer.
/// Returns the number of rows applied.
pub fn crack(table: &[CrackRow], src: &[u8], dst: &mut [u8], limit: usize) -> usize {
    walk(table, src, dst, limit, true)
}

/// Identity-copy sibling of [`crack`]: moves every field to its
/// destination offset without swapping.
pub fn copy_fields(table: &[CrackRow], src: &[u8], dst: &mut [u8], limit: usize) -> usize {
    walk(table, src, dst, limit, false)
}

/// Byte order of a file relative to the host reading it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ByteOrder {
    /// Same order as this host
    #[default]
    Native,
    /// Opposite order; every multi-byte element must be swapped
    Swapped,
}

impl ByteOrder {
    /// Byte order of data written by a host with the given endianness
    pub fn from_writer(little_endian: bool) -> Self {
        if little_endian == cfg!(target_endian = "little") {
            ByteOrder::Native
        } else {
            ByteOrder::Swapped
        }
    }

    pub fn is_swapped(self) -> bool {
        self == ByteOrder::Swapped
    }

    /// Bring `src` into host order in `dst` using `table`
    pub fn normalize(self, table: &[CrackRow], src: &[u8], dst: &mut [u8], limit: usize) -> usize {
        match self {
            ByteOrder::Native => copy_fields(table, src, dst, limit),
            ByteOrder::Swapped => crack(table, src, dst, limit),
        }
    }

    pub fn read_u16(self, b: [u8; 2]) -> u16 {
        let v = u16::from_ne_bytes(b);
        if self.is_swapped() {
            v.swap_bytes()
        } else {
            v
        }
    }

    pub fn read_u32(self, b: [u8; 4]) -> u32 {
        let v = u32::from_ne_bytes(b);
        if self.is_swapped() {
            v.swap_bytes()
        } else {
            v
        }
    }

    pub fn u32_bytes(self, v: u32) -> [u8; 4] {
        if self.is_swapped() {
            v.swap_bytes().to_ne_bytes()
        } else {
            v.to_ne_bytes()
        }
    }
}

// ===== Descriptor recipes =====

/// VOLD, 72 bytes
pub const VOLUME_LAYOUT: &[CrackRow] = &[
    bytes(0, 4),
    longs(4, 1),
    shorts(8, 2),
    longs(12, 1),
    bytes(16, 20),
    shorts(36, 6),
    bytes(48, 8),
    bytes(56, 8),
    shorts(64, 4),
];

/// RADD, 300 bytes
pub const RADAR_LAYOUT: &[CrackRow] = &[
    bytes(0, 4),
    longs(4, 1),
    bytes(8, 8),
    floats(16, 8),
    shorts(48, 2),
    floats(52, 3),
    shorts(64, 4),
    floats(72, 7),
    shorts(100, 2),
    floats(104, 10),
    longs(144, 1),
    bytes(148, 8),
    longs(156, 1),
    floats(160, 29),
    longs(276, 1),
    bytes(280, 20),
];

/// PARM, 216 bytes
pub const PARAMETER_LAYOUT: &[CrackRow] = &[
    bytes(0, 4),
    longs(4, 1),
    bytes(8, 8),
    bytes(16, 40),
    bytes(56, 8),
    shorts(64, 2),
    floats(68, 1),
    shorts(72, 4),
    bytes(80, 8),
    floats(88, 3),
    longs(100, 2),
    bytes(108, 8),
    longs(116, 2),
    floats(124, 1),
    longs(128, 1),
    bytes(132, 32),
    longs(164, 1),
    bytes(168, 32),
    longs(200, 1),
    floats(204, 3),
];

/// CELV header; the distance array that follows is swapped as longs
pub const CELL_VECTOR_LAYOUT: &[CrackRow] = &[bytes(0, 4), longs(4, 2)];

/// CSFD, 64 bytes
pub const CELL_SPACING_LAYOUT: &[CrackRow] = &[
    bytes(0, 4),
    longs(4, 2),
    floats(12, 9),
    shorts(48, 8),
];

/// CFAC, 72 bytes
pub const CORRECTION_LAYOUT: &[CrackRow] = &[bytes(0, 4), longs(4, 1), floats(8, 16)];

/// RKTB header, 28 bytes
pub const ROTATION_TABLE_LAYOUT: &[CrackRow] = &[
    bytes(0, 4),
    longs(4, 1),
    floats(8, 1),
    longs(12, 4),
];

/// One RKTB entry: angle, offset, size
pub const ROTATION_ENTRY_LAYOUT: &[CrackRow] = &[floats(0, 1), longs(4, 2)];

/// SSWB as written by hosts that align doubles on 8 bytes (200 bytes)
pub const SUPER_SWEEP_LAYOUT: &[CrackRow] = &[
    bytes(0, 4),
    longs(4, 8),
    bytes(36, 8),
    CrackRow::new(48, FieldKind::Float64, 2),
    longs(64, 34),
];

/// SSWB as written by hosts that pack doubles on 4 bytes (196 bytes),
/// relocated into the aligned layout
pub const PACKED_SUPER_SWEEP_LAYOUT: &[CrackRow] = &[
    bytes(0, 4),
    longs(4, 8),
    bytes(36, 8),
    CrackRow::relocated(44, FieldKind::Float64, 2, 48),
    CrackRow::relocated(60, FieldKind::Int32, 34, 64),
];

/// SWIB, 40 bytes
pub const SWEEP_LAYOUT: &[CrackRow] = &[
    bytes(0, 4),
    longs(4, 1),
    bytes(8, 8),
    longs(16, 2),
    floats(24, 3),
    longs(36, 1),
];

/// RYIB, 44 bytes
pub const RAY_LAYOUT: &[CrackRow] = &[
    bytes(0, 4),
    longs(4, 3),
    shorts(16, 4),
    floats(24, 4),
    longs(40, 1),
];

/// ASIB, 80 bytes
pub const PLATFORM_LAYOUT: &[CrackRow] = &[bytes(0, 4), longs(4, 1), floats(8, 18)];

/// QDAT, 56 bytes. RDAT uses the first 16.
pub const PARAMETER_DATA_LAYOUT: &[CrackRow] = &[
    bytes(0, 4),
    longs(4, 1),
    bytes(8, 8),
    longs(16, 2),
    shorts(24, 8),
    floats(40, 4),
];

/// XSTF fixed header, 24 bytes; the payload is opaque
pub const EXTRA_STUFF_LAYOUT: &[CrackRow] = &[bytes(0, 4), longs(4, 5)];

/// Any descriptor reduced to its tag and declared size
pub const GENERIC_LAYOUT: &[CrackRow] = &[bytes(0, 4), longs(4, 1)];

/// COMM, 508 bytes
pub const COMMENT_LAYOUT: &[CrackRow] = &[bytes(0, 4), longs(4, 1), bytes(8, 500)];

/// FRIB, 264 bytes
pub const FIELD_RADAR_LAYOUT: &[CrackRow] = &[
    bytes(0, 4),
    longs(4, 2).skipping(2),
    longs(8, 1),
    floats(12, 30),
    longs(132, 5),
    floats(152, 6),
    shorts(176, 4),
    bytes(184, 80),
];
