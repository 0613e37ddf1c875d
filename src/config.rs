//! Configuration for the tunable coders.
//!
//! All sections default sensibly, so a partial JSON document (or `{}`) is a
//! valid configuration file.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Arithmetic coder precision settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArithmeticConfig {
    /// Number of decimal digits carried by the fixed-point interval bounds
    pub precision: u32,
    /// Raise the precision per message to the bound needed for a lossless decode
    pub adaptive: bool,
}

impl Default for ArithmeticConfig {
    fn default() -> Self {
        Self {
            precision: 50,
            adaptive: true,
        }
    }
}

impl ArithmeticConfig {
    pub fn validate(&self) -> Result<()> {
        if self.precision == 0 {
            return Err(Error::invalid_config("arithmetic precision must be positive"));
        }
        Ok(())
    }
}

/// Post-reconstruction boost applied to small LPC samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    /// Samples whose magnitude is below this value are amplified
    pub threshold: f64,
    /// Gain applied to those samples
    pub gain: f64,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            gain: 10.0,
        }
    }
}

impl EnhancementConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(Error::invalid_config(
                "enhancement threshold must be a non-negative number",
            ));
        }
        if !(self.gain.is_finite() && self.gain > 0.0) {
            return Err(Error::invalid_config("enhancement gain must be positive"));
        }
        Ok(())
    }
}

/// LPC audio coder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LpcConfig {
    /// Prediction order
    pub order: usize,
    /// Optional small-sample amplification stage, off unless set
    pub enhancement: Option<EnhancementConfig>,
}

impl Default for LpcConfig {
    fn default() -> Self {
        Self {
            order: 10,
            enhancement: None,
        }
    }
}

impl LpcConfig {
    pub fn validate(&self) -> Result<()> {
        if self.order == 0 {
            return Err(Error::invalid_config("LPC order must be at least 1"));
        }
        if let Some(enhancement) = &self.enhancement {
            enhancement.validate()?;
        }
        Ok(())
    }
}

/// Motion-compensated video coder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Side length of the square blocks used for motion search
    pub block_size: usize,
    /// Maximum displacement searched in each direction
    pub search_range: usize,
    /// Cap on the number of frames read from a source
    pub max_frames: usize,
    /// Residual quantizer step, 1 keeps residuals exact
    pub residual_step: u8,
    /// Search the blocks of a frame in parallel
    pub parallel_search: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            block_size: 16,
            search_range: 8,
            max_frames: 50,
            residual_step: 1,
            parallel_search: true,
        }
    }
}

impl VideoConfig {
    pub fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            return Err(Error::invalid_config("block size must be positive"));
        }
        if self.max_frames == 0 {
            return Err(Error::invalid_config("max_frames must be positive"));
        }
        if self.residual_step == 0 {
            return Err(Error::invalid_config("residual step must be positive"));
        }
        Ok(())
    }
}

/// Configuration for every tunable coder in the crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodingConfig {
    pub arithmetic: ArithmeticConfig,
    pub lpc: LpcConfig,
    pub video: VideoConfig,
}

impl CodingConfig {
    pub fn validate(&self) -> Result<()> {
        self.arithmetic.validate()?;
        self.lpc.validate()?;
        self.video.validate()
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}
