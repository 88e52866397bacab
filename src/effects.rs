//! Effect set — the declarative description of a track's insert effects.
//!
//! The effect chain topology is never stored; it is derived from the enable
//! flags by [`compute_chain_order`], and the graph wiring is generated from
//! that list.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::MixError;

/// EQ band gain range in dB.
pub const EQ_GAIN_RANGE: (f64, f64) = (-12.0, 12.0);
/// Feedback above this rings forever.
pub const DELAY_FEEDBACK_MAX: f64 = 0.9;
pub const DELAY_TIME_MAX: f64 = 5.0;

/// The four insert effects, in their fixed processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Eq,
    Compressor,
    Reverb,
    Delay,
}

impl EffectKind {
    /// Every kind in chain order.
    pub const ORDER: [EffectKind; 4] = [
        EffectKind::Eq,
        EffectKind::Compressor,
        EffectKind::Reverb,
        EffectKind::Delay,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Eq => "eq",
            EffectKind::Compressor => "compressor",
            EffectKind::Reverb => "reverb",
            EffectKind::Delay => "delay",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        EffectKind::ORDER.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 3-band equalizer: low shelf, mid peak, high shelf.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EqParams {
    pub enabled: bool,
    pub low_db: f64,
    pub mid_db: f64,
    pub high_db: f64,
}

impl Default for EqParams {
    fn default() -> Self {
        Self {
            enabled: false,
            low_db: 0.0,
            mid_db: 0.0,
            high_db: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompressorParams {
    pub enabled: bool,
    pub threshold_db: f64,
    pub ratio: f64,
    /// Attack time in seconds.
    pub attack: f64,
    /// Release time in seconds.
    pub release: f64,
}

impl Default for CompressorParams {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_db: -24.0,
            ratio: 4.0,
            attack: 0.003,
            release: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReverbParams {
    pub enabled: bool,
    /// Decay (RT60) in seconds.
    pub decay: f64,
    pub wet: f64,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            enabled: false,
            decay: 1.5,
            wet: 0.3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DelayParams {
    pub enabled: bool,
    /// Delay time in seconds.
    pub time: f64,
    pub feedback: f64,
    pub wet: f64,
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            enabled: false,
            time: 0.25,
            feedback: 0.3,
            wet: 0.25,
        }
    }
}

/// All insert effects of one track.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectSet {
    pub eq: EqParams,
    pub compressor: CompressorParams,
    pub reverb: ReverbParams,
    pub delay: DelayParams,
}

/// Enable flags, one per [`EffectKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnabledFlags {
    pub eq: bool,
    pub compressor: bool,
    pub reverb: bool,
    pub delay: bool,
}

impl EnabledFlags {
    pub fn get(&self, kind: EffectKind) -> bool {
        match kind {
            EffectKind::Eq => self.eq,
            EffectKind::Compressor => self.compressor,
            EffectKind::Reverb => self.reverb,
            EffectKind::Delay => self.delay,
        }
    }
}

/// The ordered list of enabled effects. Pure; the graph wiring is generated
/// from this.
pub fn compute_chain_order(flags: EnabledFlags) -> Vec<EffectKind> {
    EffectKind::ORDER
        .into_iter()
        .filter(|&k| flags.get(k))
        .collect()
}

impl EffectSet {
    pub fn enabled_flags(&self) -> EnabledFlags {
        EnabledFlags {
            eq: self.eq.enabled,
            compressor: self.compressor.enabled,
            reverb: self.reverb.enabled,
            delay: self.delay.enabled,
        }
    }

    pub fn is_enabled(&self, kind: EffectKind) -> bool {
        self.enabled_flags().get(kind)
    }

    /// Flip one effect's enable flag, returning the new value.
    pub fn toggle(&mut self, kind: EffectKind) -> bool {
        let flag = match kind {
            EffectKind::Eq => &mut self.eq.enabled,
            EffectKind::Compressor => &mut self.compressor.enabled,
            EffectKind::Reverb => &mut self.reverb.enabled,
            EffectKind::Delay => &mut self.delay.enabled,
        };
        *flag = !*flag;
        *flag
    }

    pub fn chain_order(&self) -> Vec<EffectKind> {
        compute_chain_order(self.enabled_flags())
    }

    /// Write one parameter, clamped to its range. Non-finite values are
    /// ignored. Returns the value now in effect.
    pub fn set_param(&mut self, param: EffectParam, value: f64) -> f64 {
        let slot = match param {
            EffectParam::EqLow => &mut self.eq.low_db,
            EffectParam::EqMid => &mut self.eq.mid_db,
            EffectParam::EqHigh => &mut self.eq.high_db,
            EffectParam::CompThreshold => &mut self.compressor.threshold_db,
            EffectParam::CompRatio => &mut self.compressor.ratio,
            EffectParam::CompAttack => &mut self.compressor.attack,
            EffectParam::CompRelease => &mut self.compressor.release,
            EffectParam::ReverbDecay => &mut self.reverb.decay,
            EffectParam::ReverbWet => &mut self.reverb.wet,
            EffectParam::DelayTime => &mut self.delay.time,
            EffectParam::DelayFeedback => &mut self.delay.feedback,
            EffectParam::DelayWet => &mut self.delay.wet,
        };
        if value.is_finite() {
            let (lo, hi) = param.range();
            *slot = value.clamp(lo, hi);
        }
        *slot
    }

    /// Cap the delay time at what the engine's delay lines hold. Returns the
    /// time now in effect.
    pub fn limit_delay_time(&mut self, max_secs: f64) -> f64 {
        self.delay.time = self.delay.time.min(max_secs);
        self.delay.time
    }
}

/// A single hot-swappable effect parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectParam {
    EqLow,
    EqMid,
    EqHigh,
    CompThreshold,
    CompRatio,
    CompAttack,
    CompRelease,
    ReverbDecay,
    ReverbWet,
    DelayTime,
    DelayFeedback,
    DelayWet,
}

impl EffectParam {
    pub fn kind(self) -> EffectKind {
        match self {
            EffectParam::EqLow | EffectParam::EqMid | EffectParam::EqHigh => EffectKind::Eq,
            EffectParam::CompThreshold
            | EffectParam::CompRatio
            | EffectParam::CompAttack
            | EffectParam::CompRelease => EffectKind::Compressor,
            EffectParam::ReverbDecay | EffectParam::ReverbWet => EffectKind::Reverb,
            EffectParam::DelayTime | EffectParam::DelayFeedback | EffectParam::DelayWet => {
                EffectKind::Delay
            }
        }
    }

    /// Valid range for the parameter.
    pub fn range(self) -> (f64, f64) {
        match self {
            EffectParam::EqLow | EffectParam::EqMid | EffectParam::EqHigh => EQ_GAIN_RANGE,
            EffectParam::CompThreshold => (-60.0, 0.0),
            EffectParam::CompRatio => (1.0, 20.0),
            EffectParam::CompAttack => (0.0001, 1.0),
            EffectParam::CompRelease => (0.001, 1.0),
            EffectParam::ReverbDecay => (0.1, 10.0),
            EffectParam::ReverbWet | EffectParam::DelayWet => (0.0, 1.0),
            EffectParam::DelayTime => (0.0, DELAY_TIME_MAX),
            EffectParam::DelayFeedback => (0.0, DELAY_FEEDBACK_MAX),
        }
    }

    /// Resolve a UI parameter name (`"low"`, `"threshold"`, `"wet"`, ...) for an effect.
    pub fn parse(kind: EffectKind, name: &str) -> Result<Self, MixError> {
        let param = match (kind, name) {
            (EffectKind::Eq, "low") => EffectParam::EqLow,
            (EffectKind::Eq, "mid") => EffectParam::EqMid,
            (EffectKind::Eq, "high") => EffectParam::EqHigh,
            (EffectKind::Compressor, "threshold") => EffectParam::CompThreshold,
            (EffectKind::Compressor, "ratio") => EffectParam::CompRatio,
            (EffectKind::Compressor, "attack") => EffectParam::CompAttack,
            (EffectKind::Compressor, "release") => EffectParam::CompRelease,
            (EffectKind::Reverb, "decay") => EffectParam::ReverbDecay,
            (EffectKind::Reverb, "wet") => EffectParam::ReverbWet,
            (EffectKind::Delay, "time") => EffectParam::DelayTime,
            (EffectKind::Delay, "feedback") => EffectParam::DelayFeedback,
            (EffectKind::Delay, "wet") => EffectParam::DelayWet,
            _ => {
                return Err(MixError::UnknownParam {
                    kind,
                    name: name.to_string(),
                });
            }
        };
        Ok(param)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags_from_mask(mask: u8) -> EnabledFlags {
        EnabledFlags {
            eq: mask & 1 != 0,
            compressor: mask & 2 != 0,
            reverb: mask & 4 != 0,
            delay: mask & 8 != 0,
        }
    }

    #[test]
    fn test_chain_order_every_subset() {
        for mask in 0u8..16 {
            let flags = flags_from_mask(mask);
            let order = compute_chain_order(flags);
            let expected: Vec<_> = EffectKind::ORDER
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, k)| *k)
                .collect();
            assert_eq!(order, expected, "mask {mask:04b}");
        }
    }

    #[test]
    fn test_toggle_flips_only_one_flag() {
        let mut fx = EffectSet::default();
        assert!(fx.toggle(EffectKind::Reverb));
        assert_eq!(fx.chain_order(), vec![EffectKind::Reverb]);
        assert!(fx.toggle(EffectKind::Eq));
        assert_eq!(fx.chain_order(), vec![EffectKind::Eq, EffectKind::Reverb]);
        assert!(!fx.toggle(EffectKind::Reverb));
        assert_eq!(fx.chain_order(), vec![EffectKind::Eq]);
    }

    #[test]
    fn test_set_param_clamps_to_range() {
        let mut fx = EffectSet::default();
        assert_eq!(fx.set_param(EffectParam::EqLow, 20.0), 12.0);
        assert_eq!(fx.set_param(EffectParam::DelayFeedback, 0.99), 0.9);
        assert_eq!(fx.set_param(EffectParam::ReverbWet, -1.0), 0.0);
        assert_eq!(fx.eq.low_db, 12.0);
    }

    #[test]
    fn test_set_param_ignores_nan() {
        let mut fx = EffectSet::default();
        fx.set_param(EffectParam::CompRatio, 8.0);
        assert_eq!(fx.set_param(EffectParam::CompRatio, f64::NAN), 8.0);
    }

    #[test]
    fn test_delay_time_limited_to_line_length() {
        let mut fx = EffectSet::default();
        assert_eq!(fx.set_param(EffectParam::DelayTime, 3.0), 3.0);
        assert_eq!(fx.limit_delay_time(2.0), 2.0);
        assert_eq!(fx.delay.time, 2.0);
        fx.set_param(EffectParam::DelayTime, 0.5);
        assert_eq!(fx.limit_delay_time(2.0), 0.5);
    }

    #[test]
    fn test_parse_param_names() {
        assert_eq!(
            EffectParam::parse(EffectKind::Delay, "wet").unwrap(),
            EffectParam::DelayWet
        );
        assert_eq!(
            EffectParam::parse(EffectKind::Reverb, "wet").unwrap(),
            EffectParam::ReverbWet
        );
        assert!(matches!(
            EffectParam::parse(EffectKind::Eq, "wet"),
            Err(MixError::UnknownParam { kind: EffectKind::Eq, .. })
        ));
    }

    #[test]
    fn test_effect_kind_names_round_trip() {
        for kind in EffectKind::ORDER {
            assert_eq!(EffectKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(EffectKind::from_name("chorus"), None);
    }

    #[test]
    fn test_partial_effect_json_fills_defaults() {
        let fx: EffectSet = serde_json::from_str(r#"{ "delay": { "enabled": true, "time": 0.5 } }"#).unwrap();
        assert!(fx.delay.enabled);
        assert_eq!(fx.delay.time, 0.5);
        assert_eq!(fx.delay.feedback, 0.3);
        assert!(!fx.eq.enabled);
    }
}
