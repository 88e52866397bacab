//! Delay effect — stereo feedback delay line with wet control.

use crate::effects::DELAY_FEEDBACK_MAX;

/// A stereo delay effect with configurable time, feedback, and wet level.
///
/// The buffer holds up to `max_delay_seconds` of audio; the delay time can be
/// changed while running without reallocating.
#[derive(Debug, Clone)]
pub struct Delay {
    buffer_l: Vec<f32>,
    buffer_r: Vec<f32>,
    write_pos: usize,
    sample_rate: f64,
    max_delay_seconds: f64,

    delay_time: f64,
    feedback: f32,
    wet: f32,
}

impl Delay {
    pub fn new(sample_rate: f64, max_delay_seconds: f64) -> Self {
        let buffer_size = (sample_rate * max_delay_seconds) as usize + 1;
        Self {
            buffer_l: vec![0.0; buffer_size],
            buffer_r: vec![0.0; buffer_size],
            write_pos: 0,
            sample_rate,
            max_delay_seconds,
            delay_time: 0.25,
            feedback: 0.3,
            wet: 0.25,
        }
    }

    pub fn with_params(
        sample_rate: f64,
        max_delay_seconds: f64,
        delay_time: f64,
        feedback: f64,
        wet: f64,
    ) -> Self {
        let mut d = Self::new(sample_rate, max_delay_seconds);
        d.set_params(delay_time, feedback, wet);
        d
    }

    /// Time is clamped to the buffer length, feedback to 0..0.9.
    pub fn set_params(&mut self, delay_time: f64, feedback: f64, wet: f64) {
        self.delay_time = delay_time.clamp(0.0, self.max_delay_seconds);
        self.feedback = feedback.clamp(0.0, DELAY_FEEDBACK_MAX) as f32;
        self.wet = wet.clamp(0.0, 1.0) as f32;
    }

    /// Process a stereo sample pair, returning the processed output.
    ///
    /// A zero delay time passes the input straight through as the echo and
    /// feeds nothing back.
    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        let buffer_len = self.buffer_l.len();
        let delay_samples = ((self.delay_time * self.sample_rate) as usize).min(buffer_len - 1);

        let (delayed_l, delayed_r, feedback) = if delay_samples == 0 {
            (left, right, 0.0)
        } else {
            let read_pos = if self.write_pos >= delay_samples {
                self.write_pos - delay_samples
            } else {
                buffer_len - (delay_samples - self.write_pos)
            };
            (self.buffer_l[read_pos], self.buffer_r[read_pos], self.feedback)
        };

        self.buffer_l[self.write_pos] = left + delayed_l * feedback;
        self.buffer_r[self.write_pos] = right + delayed_r * feedback;
        self.write_pos = (self.write_pos + 1) % buffer_len;

        let wet = self.wet;
        (
            left * (1.0 - wet) + delayed_l * wet,
            right * (1.0 - wet) + delayed_r * wet,
        )
    }

    /// Process a block of stereo audio in-place.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        for i in 0..left.len().min(right.len()) {
            let (out_l, out_r) = self.process(left[i], right[i]);
            left[i] = out_l;
            right[i] = out_r;
        }
    }

    /// Drop any echoes still in the line.
    pub fn clear(&mut self) {
        self.buffer_l.fill(0.0);
        self.buffer_r.fill(0.0);
        self.write_pos = 0;
    }
}
