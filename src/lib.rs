//! # DORADE Sweep
//!
//! Writing, reading and housekeeping of DORADE radar sweep files.
//!
//! The record codecs live in [`dorade_core`]; this crate adds the parts
//! that touch files and buffers:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  dorade-sweep                                                 │
//! │  ├── mapper       (RayMapper: state of the current ray)       │
//! │  ├── sweepfile/   (SweepFileWriter, InMemorySweepFileWriter,  │
//! │  │                 SweepFileReader)                           │
//! │  ├── maintenance  (SweepDirectory: list, clean, mirror)       │
//! │  ├── fortran      (length-framed records)                     │
//! │  └── config       (WriterConfig, loaded from JSON)            │
//! └───────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                 ┌─────────────────────────┐
//!                 │  dorade-core            │
//!                 │  (records, HRD, names)  │
//!                 └─────────────────────────┘
//! ```
//!
//! ## Example: a sweep in memory
//!
//! ```rust
//! use std::io::Cursor;
//!
//! use chrono::{TimeZone, Utc};
//! use dorade_sweep::dorade_core::records::{CellVector, ParameterInfo, RadarInfo};
//! use dorade_sweep::{InMemorySweepFileWriter, RayMapper, SweepFileReader, WriterConfig};
//!
//! let mut mapper = RayMapper::new(RadarInfo::with_name("DEMO"));
//! let dbz = mapper.add_field(ParameterInfo::new("DBZ", 100.0, 0.0));
//! mapper.set_cells(CellVector::new(vec![150.0, 300.0, 450.0]));
//! mapper.set_time(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
//!
//! let mut writer = InMemorySweepFileWriter::new(WriterConfig::default()).unwrap();
//! writer.begin_sweepfile(&mapper, "", None).unwrap();
//! for azimuth in [0.0, 1.0, 2.0] {
//!     mapper.set_pointing(azimuth, 0.5);
//!     mapper.set_samples(dbz, vec![1200, 1250, -32768]);
//!     writer.add_to_sweepfile(&mapper).unwrap();
//! }
//! let image = writer.end_sweepfile(false).unwrap().unwrap().to_vec();
//!
//! let reader = SweepFileReader::from_reader(Cursor::new(image)).unwrap();
//! assert_eq!(reader.ray_count(), 3);
//! let (values, _bad) = reader.mapper().field_values("DBZ").unwrap();
//! assert_eq!(values[0], 12.0);
//! ```

pub mod config;
pub mod error;
pub mod fortran;
pub mod maintenance;
pub mod mapper;
pub mod sweepfile;

// Re-export commonly used types
pub use config::WriterConfig;
pub use error::{Result, SweepFileError};
pub use maintenance::SweepDirectory;
pub use mapper::{FieldData, RayMapper};
pub use sweepfile::{InMemorySweepFileWriter, SweepFileReader, SweepFileWriter};

pub use dorade_core;
