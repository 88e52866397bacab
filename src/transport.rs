//! Transport — play/pause/stop state and the single reference clock.
//!
//! Position is never read from individual tracks. While playing it is
//! derived from one reference instant:
//! `position = now − reference + offset_at_start`, so every track reports
//! the same time by construction.

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::error::MixError;

/// A monotonic time source in seconds.
pub trait Clock: Send {
    fn now(&self) -> f64;
}

/// Wall clock based on `Instant`.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock advanced by its owner: the host's audio clock in the browser, a
/// test harness elsewhere. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    time: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            time: Arc::new(Mutex::new(start)),
        }
    }

    pub fn set(&self, secs: f64) {
        if let Ok(mut t) = self.time.lock() {
            *t = secs;
        }
    }

    pub fn advance(&self, secs: f64) {
        if let Ok(mut t) = self.time.lock() {
            *t += secs;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.time.lock().map(|t| *t).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    Stopped,
    Playing,
    Paused,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Stopped => write!(f, "stopped"),
            TransportState::Playing => write!(f, "playing"),
            TransportState::Paused => write!(f, "paused"),
        }
    }
}

/// Result of polling a playing transport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub position: f64,
    /// The mix reached its end during this poll and the transport stopped.
    pub ended: bool,
}

#[derive(Debug, Clone)]
pub struct Transport {
    state: TransportState,
    /// Clock reading when playback last started.
    reference: f64,
    /// Mix position at `reference`.
    offset_at_start: f64,
    /// Position while not playing.
    frozen: f64,
    duration: f64,
}

impl Default for Transport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport {
    pub fn new() -> Self {
        Self {
            state: TransportState::Stopped,
            reference: 0.0,
            offset_at_start: 0.0,
            frozen: 0.0,
            duration: 0.0,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Update the mix length. A stopped or paused position past the new end
    /// is pulled back to it.
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
        if self.frozen > self.duration {
            self.frozen = self.duration;
        }
    }

    /// Current mix position.
    pub fn position(&self, now: f64) -> f64 {
        match self.state {
            TransportState::Playing => (self.offset_at_start + (now - self.reference)).max(0.0),
            _ => self.frozen,
        }
    }

    /// Start from the current position. Returns the offset every source must
    /// start at.
    pub fn play(&mut self, now: f64) -> Result<f64, MixError> {
        if self.state == TransportState::Playing {
            return Err(MixError::InvalidTransition {
                from: self.state,
                action: "play",
            });
        }
        self.offset_at_start = self.frozen;
        self.reference = now;
        self.state = TransportState::Playing;
        log::debug!("transport: play from {:.3}s", self.offset_at_start);
        Ok(self.offset_at_start)
    }

    pub fn pause(&mut self, now: f64) -> Result<f64, MixError> {
        if self.state != TransportState::Playing {
            return Err(MixError::InvalidTransition {
                from: self.state,
                action: "pause",
            });
        }
        self.frozen = self.position(now).min(self.duration);
        self.state = TransportState::Paused;
        log::debug!("transport: paused at {:.3}s", self.frozen);
        Ok(self.frozen)
    }

    /// Valid from any state; always rewinds to 0.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.frozen = 0.0;
        log::debug!("transport: stopped");
    }

    /// Move to `secs` (clamped to the mix). While playing, the reference is
    /// reset so the new position takes effect immediately; the returned value
    /// is the offset sources must restart at.
    pub fn seek(&mut self, now: f64, secs: f64) -> f64 {
        let target = if secs.is_finite() { secs.clamp(0.0, self.duration) } else { 0.0 };
        self.frozen = target;
        if self.state == TransportState::Playing {
            self.offset_at_start = target;
            self.reference = now;
        }
        target
    }

    /// Poll the position, stopping automatically at the end of the mix.
    pub fn tick(&mut self, now: f64) -> Tick {
        let position = self.position(now);
        if self.state == TransportState::Playing && position >= self.duration {
            self.stop();
            return Tick {
                position: 0.0,
                ended: true,
            };
        }
        Tick {
            position,
            ended: false,
        }
    }
}
