//! Offline renderer — rebuilds a mix snapshot in a fresh offline graph and
//! runs it to completion.
//!
//! Nothing here touches the live session: the renderer reads a
//! [`MixSnapshot`], builds its own channel strips against its own master
//! bus, and drops the whole offline graph once the buffer is out.

use crate::config::EngineConfig;
use crate::dsp::gain::db_to_gain;
use crate::error::{MixError, RenderFailure};
use crate::graph::AudioGraph;
use crate::solo::resolve_audibility;
use crate::strip::{ChannelStrip, SourceState};
use crate::track::Track;

/// One track as it was when the snapshot was taken.
#[derive(Debug, Clone)]
pub struct TrackSnapshot {
    pub track: Track,
    pub source: SourceState,
}

/// Immutable copy of a session for export.
#[derive(Debug, Clone)]
pub struct MixSnapshot {
    pub tracks: Vec<TrackSnapshot>,
    pub master_volume_db: f64,
    pub duration_secs: f64,
}

impl MixSnapshot {
    /// Output length in frames at `sample_rate`.
    pub fn length_frames(&self, sample_rate: u32) -> usize {
        (self.duration_secs.max(0.0) * sample_rate as f64).round() as usize
    }
}

/// A finished stereo render. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMix {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
}

impl RenderedMix {
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Planar channels, left first.
    pub fn channels(&self) -> [&[f32]; 2] {
        [&self.left, &self.right]
    }
}

/// A render plus the tracks that could not take part in it.
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub mix: RenderedMix,
    pub failures: Vec<RenderFailure>,
}

/// Render `snapshot` offline.
///
/// Audible tracks that failed to load, or whose strip cannot be built, are
/// reported in [`RenderOutcome::failures`] while the rest still render. With
/// no renderable track left the call fails with
/// [`MixError::NoRenderableTracks`]. `cancelled` is polled between blocks.
pub fn render_offline(
    snapshot: &MixSnapshot,
    config: &EngineConfig,
    cancelled: &dyn Fn() -> bool,
) -> Result<RenderOutcome, MixError> {
    config.validate()?;
    let audible = resolve_audibility(snapshot.tracks.iter().map(|t| &t.track));
    let length = snapshot.length_frames(config.sample_rate);
    log::info!(
        "offline render: {} tracks, {:.3}s ({length} frames @ {} Hz)",
        snapshot.tracks.len(),
        snapshot.duration_secs,
        config.sample_rate
    );

    // No declick ramp offline: there is no prior state to click against.
    let mut graph = AudioGraph::offline(length, config.sample_rate, config.block_size)
        .with_max_delay(config.max_delay_secs);
    let master = graph.create_master(db_to_gain(snapshot.master_volume_db));
    graph.connect_to_destination(master)?;

    let mut failures = Vec::new();
    let mut rendered = 0usize;
    for entry in &snapshot.tracks {
        let id = &entry.track.id;
        if !audible.get(id).copied().unwrap_or(false) {
            continue;
        }
        if let SourceState::Failed(reason) = &entry.source {
            log::warn!("offline render: skipping track {id}: {reason}");
            failures.push(RenderFailure {
                track_id: id.clone(),
                reason: reason.clone(),
            });
            continue;
        }

        let started = ChannelStrip::build(&mut graph, entry.track.clone(), entry.source.clone(), master, true)
            .and_then(|strip| strip.start(&mut graph, 0.0).map(|()| strip));
        match started {
            Ok(strip) => {
                if strip.is_bypassed() {
                    log::warn!("offline render: track {id} renders without effects");
                }
                rendered += 1;
            }
            Err(e) => {
                log::warn!("offline render: track {id} failed: {e}");
                failures.push(RenderFailure {
                    track_id: id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if rendered == 0 {
        return Err(MixError::NoRenderableTracks);
    }

    let buffer = graph
        .start_rendering(cancelled)?
        .ok_or(MixError::RenderCancelled)?;
    log::info!(
        "offline render finished: {rendered} tracks, {} skipped",
        failures.len()
    );

    Ok(RenderOutcome {
        mix: RenderedMix {
            left: buffer.left,
            right: buffer.right,
            sample_rate: config.sample_rate,
        },
        failures,
    })
}
