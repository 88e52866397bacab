//! Engine configuration.
//!
//! Every field has a default, so a host can pass a partial JSON document
//! (or nothing at all) and only override what it cares about.

use serde::{Deserialize, Serialize};

use crate::effects::DELAY_TIME_MAX;
use crate::error::MixError;

/// Rebuild/gain ramps at or above this length become audible as a dropout.
pub const MAX_GAIN_RAMP_MS: f64 = 10.0;

/// Configuration shared by the live graph, the offline renderer and the encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Context sample rate in Hz, for both live playback and mixdown.
    pub sample_rate: u32,
    /// Frames rendered per graph pull.
    pub block_size: usize,
    /// Declick ramp applied to strip gain changes and chain rebuilds.
    pub gain_ramp_ms: f64,
    /// Upper bound for the delay effect's time parameter (sizes the delay line).
    pub max_delay_secs: f64,
    /// Output bit depth for WAV export.
    pub bit_depth: u16,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_size: 128,
            gain_ramp_ms: 5.0,
            max_delay_secs: 2.0,
            bit_depth: 16,
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json(json: &str) -> Result<Self, MixError> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| MixError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MixError> {
        if self.sample_rate == 0 {
            return Err(MixError::Config("sampleRate must be non-zero".into()));
        }
        if self.block_size == 0 {
            return Err(MixError::Config("blockSize must be non-zero".into()));
        }
        if !(0.0..MAX_GAIN_RAMP_MS).contains(&self.gain_ramp_ms) {
            return Err(MixError::Config(format!(
                "gainRampMs must be in [0, {MAX_GAIN_RAMP_MS}), got {}",
                self.gain_ramp_ms
            )));
        }
        if !(self.max_delay_secs > 0.0 && self.max_delay_secs <= DELAY_TIME_MAX) {
            return Err(MixError::Config(format!(
                "maxDelaySecs must be in (0, {DELAY_TIME_MAX}], got {}",
                self.max_delay_secs
            )));
        }
        if self.bit_depth != 16 {
            return Err(MixError::UnsupportedBitDepth(self.bit_depth));
        }
        Ok(())
    }

    /// Length of the declick ramp in frames.
    pub fn ramp_frames(&self) -> usize {
        (self.gain_ramp_ms / 1000.0 * self.sample_rate as f64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = EngineConfig::from_json(r#"{ "sampleRate": 48000 }"#).unwrap();
        assert_eq!(cfg.sample_rate, 48_000);
        assert_eq!(cfg.block_size, 128);
        assert_eq!(cfg.bit_depth, 16);
    }

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_rejects_long_ramp() {
        let err = EngineConfig::from_json(r#"{ "gainRampMs": 12.0 }"#).unwrap_err();
        assert!(matches!(err, MixError::Config(_)));
    }

    #[test]
    fn test_rejects_24_bit() {
        let err = EngineConfig::from_json(r#"{ "bitDepth": 24 }"#).unwrap_err();
        assert!(matches!(err, MixError::UnsupportedBitDepth(24)));
    }

    #[test]
    fn test_rejects_delay_line_beyond_param_range() {
        let err = EngineConfig::from_json(r#"{ "maxDelaySecs": 8.0 }"#).unwrap_err();
        assert!(matches!(err, MixError::Config(_)));
        assert!(EngineConfig::from_json(r#"{ "maxDelaySecs": 5.0 }"#).is_ok());
    }

    #[test]
    fn test_ramp_frames_at_default_rate() {
        // 5 ms at 44.1 kHz
        assert_eq!(EngineConfig::default().ramp_frames(), 220);
    }
}
