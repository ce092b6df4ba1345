//! Writer configuration.
//!
//! Everything a writer needs is passed in explicitly; there is no
//! process-wide state. The JSON form uses camelCase keys:
//!
//! ```json
//! {
//!   "minRaysPerSweep": 10,
//!   "compression": "hrd",
//!   "eightBit": [{ "scale": 2.0, "bias": -32.0 }],
//!   "cellSpacing": { "gateSkip": 2, "numGates": 400 }
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use dorade_core::{ByteOrder, Compression};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepFileError};

/// Default size of the in-memory writer's buffer
pub const DEFAULT_MEMORY_CAPACITY: usize = 6 * 1024 * 1024;

/// Target scale and bias of one field stored as 8-bit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EightBitScale {
    pub scale: f32,
    pub bias: f32,
}

impl Default for EightBitScale {
    fn default() -> Self {
        Self {
            scale: 1.0,
            bias: 0.0,
        }
    }
}

/// Gate decimation, written as a single-segment CSFD
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSpacingConfig {
    /// Keep every `gate_skip`-th gate
    #[serde(default = "default_gate_skip")]
    pub gate_skip: usize,
    /// Gates to write; all remaining gates when absent
    #[serde(default)]
    pub num_gates: Option<usize>,
}

fn default_gate_skip() -> usize {
    1
}

fn default_min_rays() -> usize {
    1
}

fn default_memory_capacity() -> usize {
    DEFAULT_MEMORY_CAPACITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterConfig {
    /// Sweeps with fewer rays are discarded at end
    #[serde(default = "default_min_rays")]
    pub min_rays_per_sweep: usize,
    #[serde(default)]
    pub compression: Compression,
    /// Per-field 8-bit down-conversion, indexed like the mapper's fields
    #[serde(default)]
    pub eight_bit: Option<Vec<EightBitScale>>,
    #[serde(default)]
    pub cell_spacing: Option<CellSpacingConfig>,
    /// Write in the opposite byte order of this host
    #[serde(default)]
    pub swap_bytes: bool,
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            min_rays_per_sweep: default_min_rays(),
            compression: Compression::None,
            eight_bit: None,
            cell_spacing: None,
            swap_bytes: false,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

impl WriterConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: WriterConfig = serde_json::from_reader(reader)
            .map_err(|e| SweepFileError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        debug!("Loaded writer config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(cs) = &self.cell_spacing {
            if cs.gate_skip == 0 {
                return Err(SweepFileError::Config("gateSkip must be at least 1".to_string()));
            }
        }
        if let Some(scales) = &self.eight_bit {
            if scales.iter().any(|s| s.scale == 0.0) {
                return Err(SweepFileError::Config("8-bit scale must not be zero".to_string()));
            }
        }
        Ok(())
    }

    pub fn byte_order(&self) -> ByteOrder {
        if self.swap_bytes {
            ByteOrder::Swapped
        } else {
            ByteOrder::Native
        }
    }

    /// 8-bit target for field `field`, if down-conversion is on
    pub fn eight_bit_for(&self, field: usize) -> Option<EightBitScale> {
        self.eight_bit
            .as_ref()
            .map(|scales| scales.get(field).copied().unwrap_or_default())
    }
}
