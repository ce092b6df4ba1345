//! Error types for sweep-file I/O.

use dorade_core::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SweepFileError {
    #[error("I/O operation failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot decode descriptor: {0}")]
    Parse(#[from] ParseError),
    #[error("No SSWB at the start of the sweep file")]
    NoSuperSweepInfo,
    #[error("No ray found in the sweep file header")]
    NoRayInfo,
    #[error("No RKTB at the recorded offset")]
    NoRotationTable,
    #[error("Internal ({declared}) and external ({actual}) file size mismatch")]
    FileSizeMismatch { declared: u64, actual: u64 },
    #[error("Ray {ray} out of range, sweep has {count} rays")]
    RayOutOfRange { ray: usize, count: usize },
    #[error("No sweep file is open")]
    NotOpen,
    #[error("Ray {ray} is {expected} bytes, replacement is {actual}")]
    RaySizeChanged {
        ray: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Field has {0} cells, more than a ray can hold")]
    TooManyCells(usize),
    #[error("Invalid writer configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SweepFileError>;
