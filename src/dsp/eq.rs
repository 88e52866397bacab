//! Three-band channel EQ: low shelf, mid peak, high shelf per channel.

use super::filter::{BiquadFilter, FilterType};

pub const LOW_SHELF_HZ: f64 = 400.0;
pub const MID_PEAK_HZ: f64 = 1000.0;
pub const HIGH_SHELF_HZ: f64 = 2500.0;

#[derive(Debug, Clone)]
struct Bands {
    low: BiquadFilter,
    mid: BiquadFilter,
    high: BiquadFilter,
}

impl Bands {
    fn new(sample_rate: f64) -> Self {
        let mut mid = BiquadFilter::new(FilterType::Peaking, MID_PEAK_HZ, sample_rate);
        mid.q = 0.7;
        Self {
            low: BiquadFilter::new(FilterType::LowShelf, LOW_SHELF_HZ, sample_rate),
            mid,
            high: BiquadFilter::new(FilterType::HighShelf, HIGH_SHELF_HZ, sample_rate),
        }
    }

    #[inline]
    fn process(&mut self, x: f64) -> f64 {
        self.high.process(self.mid.process(self.low.process(x)))
    }

    fn set_gains(&mut self, low_db: f64, mid_db: f64, high_db: f64) {
        self.low.set_gain_db(low_db);
        self.mid.set_gain_db(mid_db);
        self.high.set_gain_db(high_db);
    }

    fn reset(&mut self) {
        self.low.reset();
        self.mid.reset();
        self.high.reset();
    }
}

/// A stereo 3-band equalizer.
#[derive(Debug, Clone)]
pub struct ThreeBandEq {
    left: Bands,
    right: Bands,
}

impl ThreeBandEq {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            left: Bands::new(sample_rate),
            right: Bands::new(sample_rate),
        }
    }

    pub fn with_gains(sample_rate: f64, low_db: f64, mid_db: f64, high_db: f64) -> Self {
        let mut eq = Self::new(sample_rate);
        eq.set_gains(low_db, mid_db, high_db);
        eq
    }

    pub fn set_gains(&mut self, low_db: f64, mid_db: f64, high_db: f64) {
        self.left.set_gains(low_db, mid_db, high_db);
        self.right.set_gains(low_db, mid_db, high_db);
    }

    #[inline]
    pub fn process(&mut self, left: f32, right: f32) -> (f32, f32) {
        (
            self.left.process(left as f64) as f32,
            self.right.process(right as f64) as f32,
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

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}
