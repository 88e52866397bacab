//! Gain staging helpers: dB conversion, declick ramps, and stereo panning.

use std::f64::consts::FRAC_PI_2;

use crate::track::MIN_VOLUME_DB;

/// dB → linear amplitude. The bottom of the fader range is true silence.
#[inline]
pub fn db_to_gain(db: f64) -> f64 {
    if db <= MIN_VOLUME_DB {
        0.0
    } else {
        10.0_f64.powf(db / 20.0)
    }
}

/// A linear gain smoother. Target changes reach the new value after
/// `ramp_frames` frames instead of stepping.
#[derive(Debug, Clone)]
pub struct GainRamp {
    current: f64,
    target: f64,
    step: f64,
    ramp_frames: usize,
}

impl GainRamp {
    pub fn new(gain: f64, ramp_frames: usize) -> Self {
        Self {
            current: gain,
            target: gain,
            step: 0.0,
            ramp_frames,
        }
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
        if self.ramp_frames == 0 {
            self.current = target;
            self.step = 0.0;
        } else {
            self.step = (target - self.current) / self.ramp_frames as f64;
        }
    }

    /// Drop to silence immediately, then ramp back up to the target.
    pub fn duck(&mut self) {
        self.current = 0.0;
        let target = self.target;
        self.set_target(target);
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    #[inline]
    pub fn next(&mut self) -> f64 {
        if self.step != 0.0 {
            self.current += self.step;
            let arrived = (self.step > 0.0 && self.current >= self.target)
                || (self.step < 0.0 && self.current <= self.target);
            if arrived {
                self.current = self.target;
                self.step = 0.0;
            }
        }
        self.current
    }
}

/// Stereo panner with the WebAudio StereoPannerNode law for stereo input:
/// center leaves both channels untouched, hard left folds the right channel
/// into the left.
#[inline]
pub fn pan_stereo(pan: f64, left: f32, right: f32) -> (f32, f32) {
    let p = pan.clamp(-1.0, 1.0);
    let x = if p <= 0.0 { p + 1.0 } else { p };
    let gain_l = (x * FRAC_PI_2).cos() as f32;
    let gain_r = (x * FRAC_PI_2).sin() as f32;
    if p <= 0.0 {
        (left + right * gain_l, right * gain_r)
    } else {
        (left * gain_l, right + left * gain_r)
    }
}
