//! # DORADE Core
//!
//! Platform-independent codecs for DORADE radar sweep files.
//!
//! This crate contains pure format logic with **no I/O dependencies**: it
//! turns byte slices into descriptor records and back. Opening, writing and
//! renaming files is left to `dorade-sweep`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  dorade-core (pure, no filesystem)                          │
//! │  ├── crackers/  (table-driven byte-order conversion)        │
//! │  ├── records/   (descriptor schemas: SSWB, VOLD, RYIB, ...) │
//! │  ├── hrd/       (run-length codec for 16-bit samples)       │
//! │  ├── rotation/  (RKTB angle index)                          │
//! │  └── filename/  (sweep-file naming)                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                 ┌────────────┴────────────┐
//!                 │  dorade-sweep           │
//!                 │  (writers, reader, dir) │
//!                 └─────────────────────────┘
//! ```
//!
//! ## Example: Reading a descriptor header
//!
//! ```rust
//! use dorade_core::records::{DescriptorHeader, SWIB};
//! use dorade_core::ByteOrder;
//!
//! let mut buf = b"SWIB".to_vec();
//! buf.extend_from_slice(&40u32.swap_bytes().to_ne_bytes());
//!
//! let header = DescriptorHeader::peek(&buf).unwrap();
//! assert!(header.is(&SWIB));
//! assert_eq!(header.size, 40);
//! assert_eq!(header.order, ByteOrder::Swapped);
//! ```
//!
//! ## Example: HRD compression
//!
//! ```rust
//! use dorade_core::hrd;
//! use dorade_core::ByteOrder;
//!
//! let bad = 0x8000u16;
//! let samples = [12, 14, bad, bad, bad, bad, 9];
//! let words = hrd::compress(&samples, bad);
//! let bytes = hrd::words_to_bytes(&words, ByteOrder::Native);
//! let out = hrd::decompress(&bytes, ByteOrder::Native, bad, samples.len());
//! assert_eq!(out.samples, samples);
//! ```

pub mod crackers;
pub mod error;
pub mod filename;
pub mod hrd;
pub mod records;
pub mod rotation;
pub mod types;

// Re-export commonly used types
pub use crackers::ByteOrder;
pub use error::ParseError;
pub use filename::{SweepFileName, FIXED_ANGLE_ABSENT};
pub use records::{Descriptor, DescriptorHeader, MAX_REC_SIZE};
pub use rotation::{fmod360, RotationAngleTable};
pub use types::{BinaryFormat, Compression, ScanMode};
