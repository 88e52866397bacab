//! Compressor effect — dynamics processing for channel leveling.
//!
//! Feed-forward peak compressor with threshold, ratio, knee, attack, and
//! release, modeled on the WebAudio DynamicsCompressorNode controls.

/// A stereo dynamics compressor.
#[derive(Debug, Clone)]
pub struct Compressor {
    sample_rate: f64,

    /// Threshold in dB (−60 to 0).
    threshold: f64,
    /// Compression ratio (e.g., 4.0 = 4:1 compression).
    ratio: f64,
    /// Knee width in dB (0 = hard knee).
    knee: f64,
    /// Attack time in seconds.
    attack: f64,
    /// Release time in seconds.
    release: f64,

    attack_coef: f64,
    release_coef: f64,
    envelope: f64,
}

impl Compressor {
    /// Create a new compressor with default settings.
    pub fn new(sample_rate: f64) -> Self {
        let mut c = Self {
            sample_rate,
            threshold: -24.0,
            ratio: 4.0,
            knee: 6.0,
            attack: 0.003,
            release: 0.25,
            attack_coef: 0.0,
            release_coef: 0.0,
            envelope: 0.0,
        };
        c.update_coefficients();
        c
    }

    /// Create a compressor with specific parameters.
    pub fn with_params(
        sample_rate: f64,
        threshold: f64,
        ratio: f64,
        attack: f64,
        release: f64,
    ) -> Self {
        let mut c = Self::new(sample_rate);
        c.set_params(threshold, ratio, attack, release);
        c
    }

    /// Update all parameters without resetting the envelope.
    pub fn set_params(&mut self, threshold: f64, ratio: f64, attack: f64, release: f64) {
        self.threshold = threshold.clamp(-60.0, 0.0);
        self.ratio = ratio.clamp(1.0, 20.0);
        self.attack = attack.clamp(0.0001, 1.0);
        self.release = release.clamp(0.001, 1.0);
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        self.attack_coef = (-1.0 / (self.attack * self.sample_rate)).exp();
        self.release_coef = (-1.0 / (self.release * self.sample_rate)).exp();
    }

    #[inline]
    fn linear_to_db(linear: f64) -> f64 {
        if linear <= 0.0 {
            -120.0
        } else {
            20.0 * linear.log10()
        }
    }

    #[inline]
    fn db_to_linear(db: f64) -> f64 {
        10.0_f64.powf(db / 20.0)
    }

    /// Gain reduction (≤ 0 dB) for a given detector level.
    #[inline]
    fn compute_gain(&self, input_db: f64) -> f64 {
        let slope = 1.0 - 1.0 / self.ratio;

        if self.knee <= 0.0 {
            if input_db <= self.threshold {
                0.0
            } else {
                (self.threshold - input_db) * slope
            }
        } else {
            let half_knee = self.knee / 2.0;
            let knee_start = self.threshold - half_knee;
            let knee_end = self.threshold + half_knee;

            if input_db <= knee_start {
                0.0
            } else if input_db >= knee_end {
                (self.threshold - input_db) * slope
            } else {
                let x = input_db - knee_start;
                -(x * x) / (2.0 * self.knee) * slope
            }
        }
    }

    /// Process a stereo sample pair.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let input_level = left.abs().max(right.abs()) as f64;

        let coef = if input_level > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        self.envelope = coef * self.envelope + (1.0 - coef) * input_level;

        let gain_reduction_db = self.compute_gain(Self::linear_to_db(self.envelope));
        let gain = Self::db_to_linear(gain_reduction_db) as f32;

        (left * gain, right * gain)
    }

    /// Process a block of stereo audio in-place.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        for i in 0..left.len().min(right.len()) {
            let (out_l, out_r) = self.process(left[i], right[i]);
            left[i] = out_l;
            right[i] = out_r;
        }
    }

    /// Reset the detector.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
    }
}
