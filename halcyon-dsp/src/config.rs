//! Engine format
//!
//! The runtime hands this core fixed-size stereo blocks at a fixed sample
//! rate. Both are validated once at construction; the audio path itself has
//! no error returns.

use thiserror::Error;

/// Rejections from [`EngineFormat::new`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f32),
    #[error("block size must be non-zero")]
    ZeroBlockSize,
}

/// Sample rate and block size the voice runs at.
///
/// The filters in this crate are tuned for 48 kHz. Other rates are accepted
/// but shift the tuning with them; supporting them properly is a non-goal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineFormat {
    sample_rate: f32,
    block_size: usize,
}

impl EngineFormat {
    pub fn new(sample_rate: f32, block_size: usize) -> Result<Self, ConfigError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            tracing::warn!(sample_rate, "rejected engine format");
            return Err(ConfigError::InvalidSampleRate(sample_rate));
        }
        if block_size == 0 {
            tracing::warn!("rejected engine format: zero block size");
            return Err(ConfigError::ZeroBlockSize);
        }
        Ok(Self {
            sample_rate,
            block_size,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Rate at which per-block components tick (e.g. the pan LFO).
    pub fn block_rate(&self) -> f32 {
        self.sample_rate / self.block_size as f32
    }
}

impl Default for EngineFormat {
    /// 48 kHz, 64-sample blocks (750 Hz block rate).
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            block_size: 64,
        }
    }
}
