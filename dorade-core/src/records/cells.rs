//! Range-gate geometry: explicit CELV vectors and segmented CSFD spacing.

use serde::{Deserialize, Serialize};

use super::{ensure_len, from_host_bytes, get_f32, get_i32, to_host_bytes, Descriptor, Tag};
use crate::crackers::{swap_longs, ByteOrder, CrackRow, CELL_SPACING_LAYOUT, CELL_VECTOR_LAYOUT};
use crate::error::ParseError;

use super::volume::serde_descriptor;

/// Upper bound on gates in one cell vector
pub const MAX_CELLS: usize = 1500;

/// Fixed part of a CELV descriptor
pub const CELL_VECTOR_HEADER: usize = 12;

/// CELV: distance in meters from the radar to every gate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellVector {
    pub dist_cells: Vec<f32>,
}

impl CellVector {
    pub fn new(dist_cells: Vec<f32>) -> Self {
        Self { dist_cells }
    }

    pub fn number_cells(&self) -> usize {
        self.dist_cells.len()
    }

    /// Declared size of the encoded descriptor
    pub fn encoded_len(&self) -> usize {
        CELL_VECTOR_HEADER + 4 * self.dist_cells.len()
    }

    /// Decode from file bytes in `order`. The gate count is clamped to
    /// what the declared size actually holds.
    pub fn decode(bytes: &[u8], order: ByteOrder) -> Result<Self, ParseError> {
        super::expect_tag(bytes, &super::CELV)?;
        ensure_len(bytes, CELL_VECTOR_HEADER)?;
        let mut head = [0u8; CELL_VECTOR_HEADER];
        order.normalize(CELL_VECTOR_LAYOUT, &bytes[..CELL_VECTOR_HEADER], &mut head, 0);

        let declared = get_i32(&head, 8).max(0) as usize;
        let room = (bytes.len() - CELL_VECTOR_HEADER) / 4;
        let n = declared.min(room).min(MAX_CELLS);

        let src = &bytes[CELL_VECTOR_HEADER..CELL_VECTOR_HEADER + 4 * n];
        let mut host = vec![0u8; src.len()];
        if order.is_swapped() {
            swap_longs(src, &mut host);
        } else {
            host.copy_from_slice(src);
        }
        let dist_cells = (0..n).map(|i| get_f32(&host, 4 * i)).collect();
        Ok(Self { dist_cells })
    }

    pub fn encode(&self, order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&super::CELV);
        out.extend_from_slice(&order.u32_bytes(self.encoded_len() as u32));
        out.extend_from_slice(&order.u32_bytes(self.dist_cells.len() as u32));
        for d in &self.dist_cells {
            out.extend_from_slice(&order.u32_bytes(d.to_bits()));
        }
        out
    }
}

/// CSFD: gate spacing as up to eight uniform segments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSpacing {
    pub id: Tag,
    pub nbytes: i32,
    pub num_segments: i32,
    pub dist_to_first: f32,
    pub spacing: [f32; 8],
    pub num_cells: [i16; 8],
}

impl Default for CellSpacing {
    fn default() -> Self {
        Self {
            id: super::CSFD,
            nbytes: Self::SIZE as i32,
            num_segments: 0,
            dist_to_first: 0.0,
            spacing: [0.0; 8],
            num_cells: [0; 8],
        }
    }
}

impl CellSpacing {
    /// Single uniform segment
    pub fn uniform(dist_to_first: f32, spacing: f32, num_cells: i16) -> Self {
        let mut csfd = Self {
            num_segments: 1,
            dist_to_first,
            ..Self::default()
        };
        csfd.spacing[0] = spacing;
        csfd.num_cells[0] = num_cells;
        csfd
    }

    /// Expand the segments into an explicit cell vector
    pub fn to_cell_vector(&self) -> CellVector {
        let segments = self.num_segments.clamp(0, 8) as usize;
        let mut dist = Vec::new();
        let mut range = self.dist_to_first;
        for seg in 0..segments {
            for _ in 0..self.num_cells[seg].max(0) {
                if dist.len() >= MAX_CELLS {
                    break;
                }
                dist.push(range);
                range += self.spacing[seg];
            }
        }
        CellVector { dist_cells: dist }
    }
}

serde_descriptor!(CellSpacing, super::CSFD, 64, CELL_SPACING_LAYOUT);
