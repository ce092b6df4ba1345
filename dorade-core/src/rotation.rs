//! RKTB rotation-angle key table: finds rays by angle in a sweep file.
//!
//! ```text
//!   0      28   32                       1472
//!   ┌──────┬────┬────────────────────────┬──────────────────────────┐
//!   │header│pad │ 360 bucket ray numbers │ (angle, offset, size) × N │
//!   └──────┴────┴────────────────────────┴──────────────────────────┘
//! ```
//!
//! Each one-degree bucket holds the number of the last ray whose rotation
//! angle fell in it, or -1.

use crate::crackers::{swap_longs, ByteOrder, ROTATION_ENTRY_LAYOUT, ROTATION_TABLE_LAYOUT};
use crate::error::ParseError;
use crate::records::{ensure_len, expect_tag, get_f32, get_i32, RKTB};

/// Number of angle buckets
pub const ANGLE_BUCKETS: usize = 360;

const HEADER_SIZE: usize = 28;
/// Tables start on an 8-byte boundary
const ANGLE_TABLE_OFFSET: usize = 32;
const FIRST_KEY_OFFSET: usize = ANGLE_TABLE_OFFSET + 4 * ANGLE_BUCKETS;
const ENTRY_SIZE: usize = 12;
const GROWTH: usize = 1000;

/// Location of one ray in the sweep file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationEntry {
    pub rotation_angle: f32,
    pub offset: i32,
    pub size: i32,
}

/// Normalize an angle into [0, 360)
pub fn fmod360(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Smallest angular separation of two angles, in [0, 180]
pub fn angular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

#[derive(Debug, Clone, PartialEq)]
pub struct RotationAngleTable {
    angle2ndx: f32,
    buckets: Vec<i32>,
    entries: Vec<RotationEntry>,
}

impl Default for RotationAngleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RotationAngleTable {
    pub fn new() -> Self {
        Self {
            angle2ndx: ANGLE_BUCKETS as f32 / 360.0,
            buckets: vec![-1; ANGLE_BUCKETS],
            entries: Vec::with_capacity(GROWTH),
        }
    }

    /// Forget all rays
    pub fn reset(&mut self) {
        self.buckets.fill(-1);
        self.entries.clear();
    }

    pub fn num_rays(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, ray: usize) -> Option<&RotationEntry> {
        self.entries.get(ray)
    }

    pub fn entries(&self) -> &[RotationEntry] {
        &self.entries
    }

    fn bucket_of(&self, angle: f64) -> usize {
        ((fmod360(angle) as f32 * self.angle2ndx) as usize).min(self.buckets.len() - 1)
    }

    /// Record a new ray at `offset` and return its ray number
    pub fn push(&mut self, angle: f64, offset: i32) -> usize {
        if self.entries.len() == self.entries.capacity() {
            self.entries.reserve(GROWTH);
        }
        let ray = self.entries.len();
        let ndx = self.bucket_of(angle);
        self.buckets[ndx] = ray as i32;
        self.entries.push(RotationEntry {
            rotation_angle: angle as f32,
            offset,
            size: 0,
        });
        ray
    }

    /// Set the stored size of the most recent ray
    pub fn set_last_size(&mut self, size: i32) {
        if let Some(e) = self.entries.last_mut() {
            e.size = size;
        }
    }

    /// Declared size of the encoded table
    pub fn encoded_len(&self) -> usize {
        FIRST_KEY_OFFSET + ENTRY_SIZE * self.entries.len()
    }

    /// Ray whose rotation angle is nearest `angle`, considering the
    /// bucket the angle falls in and the nearest occupied bucket on
    /// either side of it.
    pub fn nearest(&self, angle: f64) -> Option<usize> {
        if self.entries.is_empty() {
            return None;
        }
        let angle = fmod360(angle);
        let nqs = self.buckets.len();
        let ndx0 = self.bucket_of(angle);

        let distance = |ray: i32| {
            self.entries
                .get(ray as usize)
                .map(|e| angular_distance(f64::from(e.rotation_angle), angle))
        };

        let mut best: Option<(usize, f64)> = None;
        let mut consider = |ray: i32| {
            if ray < 0 {
                return;
            }
            if let Some(d) = distance(ray) {
                if best.map_or(true, |(_, bd)| d < bd) {
                    best = Some((ray as usize, d));
                }
            }
        };

        consider(self.buckets[ndx0]);
        // Clockwise, then counter-clockwise, to the next occupied bucket
        for step in [1, nqs - 1] {
            let mut ndx = ndx0;
            for _ in 0..nqs {
                ndx = (ndx + step) % nqs;
                if self.buckets[ndx] >= 0 {
                    consider(self.buckets[ndx]);
                    break;
                }
            }
        }
        best.map(|(ray, _)| ray)
    }

    pub fn encode(&self, order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&RKTB);
        let words = [
            self.encoded_len() as u32,
            self.angle2ndx.to_bits(),
            self.buckets.len() as u32,
            FIRST_KEY_OFFSET as u32,
            ANGLE_TABLE_OFFSET as u32,
            self.entries.len() as u32,
        ];
        for w in words {
            out.extend_from_slice(&order.u32_bytes(w));
        }
        out.resize(ANGLE_TABLE_OFFSET, 0);
        for b in &self.buckets {
            out.extend_from_slice(&order.u32_bytes(*b as u32));
        }
        for e in &self.entries {
            out.extend_from_slice(&order.u32_bytes(e.rotation_angle.to_bits()));
            out.extend_from_slice(&order.u32_bytes(e.offset as u32));
            out.extend_from_slice(&order.u32_bytes(e.size as u32));
        }
        out
    }

    /// Decode a table read from a file in `order`
    pub fn decode(bytes: &[u8], order: ByteOrder) -> Result<Self, ParseError> {
        expect_tag(bytes, &RKTB)?;
        ensure_len(bytes, HEADER_SIZE)?;
        let mut head = [0u8; HEADER_SIZE];
        order.normalize(ROTATION_TABLE_LAYOUT, &bytes[..HEADER_SIZE], &mut head, 0);

        let angle2ndx = get_f32(&head, 8);
        let nqs = get_i32(&head, 12).max(0) as usize;
        let first_key = get_i32(&head, 16).max(0) as usize;
        let angle_table = get_i32(&head, 20).max(0) as usize;
        let num_rays = get_i32(&head, 24).max(0) as usize;

        if nqs == 0 {
            return Err(ParseError::DeserializationFailed(
                "rotation table has no angle buckets".to_string(),
            ));
        }

        let words = |at: usize, n: usize| -> Result<Vec<u8>, ParseError> {
            ensure_len(bytes, at + 4 * n)?;
            let src = &bytes[at..at + 4 * n];
            let mut host = vec![0u8; src.len()];
            if order.is_swapped() {
                swap_longs(src, &mut host);
            } else {
                host.copy_from_slice(src);
            }
            Ok(host)
        };

        let raw = words(angle_table, nqs)?;
        let buckets = (0..nqs)
            .map(|i| {
                let ray = get_i32(&raw, 4 * i);
                if ray >= num_rays as i32 { -1 } else { ray }
            })
            .collect();

        ensure_len(bytes, first_key + ENTRY_SIZE * num_rays)?;
        let entries = bytes[first_key..first_key + ENTRY_SIZE * num_rays]
            .chunks_exact(ENTRY_SIZE)
            .map(|src| {
                let mut host = [0u8; ENTRY_SIZE];
                order.normalize(ROTATION_ENTRY_LAYOUT, src, &mut host, 0);
                RotationEntry {
                    rotation_angle: get_f32(&host, 0),
                    offset: get_i32(&host, 4),
                    size: get_i32(&host, 8),
                }
            })
            .collect();

        Ok(Self {
            angle2ndx,
            buckets,
            entries,
        })
    }
}
