//! Mix session — the single mutable aggregate behind the UI.
//!
//! The session owns the live [`AudioGraph`], one [`ChannelStrip`] per track
//! (keyed by track id, in display order), the master bus and the transport.
//! Every UI command goes through here. Per-track problems never fail a
//! command for other tracks; they are queued as [`MixEvent`]s instead.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::asset::DecodedAudio;
use crate::config::EngineConfig;
use crate::dsp::gain::db_to_gain;
use crate::effects::{EffectKind, EffectParam};
use crate::error::{AssetLoadError, MixError};
use crate::graph::{AudioGraph, NodeId};
use crate::render::{MixSnapshot, TrackSnapshot};
use crate::solo::resolve_audibility;
use crate::strip::{ChannelStrip, SourceState};
use crate::track::{Track, TrackId, clamp_volume_db};
use crate::transport::{Clock, SystemClock, Transport, TransportState};

/// Something the UI should hear about that did not fail the command that
/// caused it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MixEvent {
    #[serde(rename_all = "camelCase")]
    AssetLoadFailed { track_id: TrackId, reason: String },
    #[serde(rename_all = "camelCase")]
    ChainBypassed { track_id: TrackId, reason: String },
    PlaybackEnded,
}

/// Per-track view for the UI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackState {
    #[serde(flatten)]
    pub track: Track,
    pub audible: bool,
    pub load_failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_error: Option<String>,
    pub bypassed: bool,
    pub duration_sec: f64,
}

/// Serializable view of the whole session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixState {
    pub tracks: Vec<TrackState>,
    pub master_volume_db: f64,
    pub current_time_sec: f64,
    pub duration_sec: f64,
    pub is_playing: bool,
    pub transport: TransportState,
}

pub struct MixSession {
    config: EngineConfig,
    graph: AudioGraph,
    master: NodeId,
    master_volume_db: f64,
    strips: HashMap<TrackId, ChannelStrip>,
    order: Vec<TrackId>,
    transport: Transport,
    clock: Box<dyn Clock>,
    events: Vec<MixEvent>,
}

impl MixSession {
    /// A session driven by the system clock.
    pub fn new(config: EngineConfig) -> Result<Self, MixError> {
        Self::with_clock(config, Box::new(SystemClock::new()))
    }

    pub fn with_clock(config: EngineConfig, clock: Box<dyn Clock>) -> Result<Self, MixError> {
        config.validate()?;
        let mut graph = AudioGraph::realtime(config.sample_rate, config.block_size)
            .with_ramp_frames(config.ramp_frames())
            .with_max_delay(config.max_delay_secs);
        let master = graph.create_master(1.0);
        graph.connect_to_destination(master)?;

        Ok(Self {
            config,
            graph,
            master,
            master_volume_db: 0.0,
            strips: HashMap::new(),
            order: Vec::new(),
            transport: Transport::new(),
            clock,
            events: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Tracks ──────────────────────────────────────────────

    /// Attach a track with the result of loading its source. A load error
    /// does not fail the call: the track is added in the load-failed state
    /// and an [`MixEvent::AssetLoadFailed`] is queued.
    pub fn add_track(
        &mut self,
        track: Track,
        audio: Result<DecodedAudio, AssetLoadError>,
    ) -> Result<(), MixError> {
        if self.strips.contains_key(&track.id) {
            return Err(MixError::DuplicateTrack(track.id));
        }
        let id = track.id.clone();
        let source = self.source_state(&id, audio);
        let strip = ChannelStrip::build(&mut self.graph, track, source, self.master, true)?;
        self.report_bypass(&strip);
        log::debug!("track {id} added ({} tracks)", self.order.len() + 1);
        self.strips.insert(id.clone(), strip);
        self.order.push(id.clone());
        self.after_topology_change(&id)
    }

    /// Detach a track and release all of its nodes.
    pub fn remove_track(&mut self, id: &TrackId) -> Result<Track, MixError> {
        let strip = self
            .strips
            .remove(id)
            .ok_or_else(|| MixError::UnknownTrack(id.clone()))?;
        self.order.retain(|t| t != id);
        let track = strip.track().clone();
        strip.dispose(&mut self.graph);
        self.refresh_duration();
        self.apply_audibility()?;
        log::debug!("track {id} removed");
        Ok(track)
    }

    /// Swap a track's source for a newly loaded one (or a new failure). The
    /// track's settings and its place in the order are kept.
    pub fn reload_track(
        &mut self,
        id: &TrackId,
        audio: Result<DecodedAudio, AssetLoadError>,
    ) -> Result<(), MixError> {
        let old = self
            .strips
            .remove(id)
            .ok_or_else(|| MixError::UnknownTrack(id.clone()))?;
        let track = old.track().clone();
        old.dispose(&mut self.graph);

        let source = self.source_state(id, audio);
        let strip = match ChannelStrip::build(&mut self.graph, track, source, self.master, true) {
            Ok(strip) => strip,
            Err(e) => {
                self.order.retain(|t| t != id);
                self.refresh_duration();
                return Err(e);
            }
        };
        self.report_bypass(&strip);
        self.strips.insert(id.clone(), strip);
        log::debug!("track {id} reloaded");
        self.after_topology_change(id)
    }

    fn source_state(&mut self, id: &TrackId, audio: Result<DecodedAudio, AssetLoadError>) -> SourceState {
        match audio {
            Ok(audio) => SourceState::Loaded(Arc::new(audio)),
            Err(e) => {
                log::warn!("track {id}: {e}");
                let reason = e.to_string();
                self.events.push(MixEvent::AssetLoadFailed {
                    track_id: id.clone(),
                    reason: reason.clone(),
                });
                SourceState::Failed(reason)
            }
        }
    }

    fn report_bypass(&mut self, strip: &ChannelStrip) {
        if strip.is_bypassed() {
            self.events.push(MixEvent::ChainBypassed {
                track_id: strip.track().id.clone(),
                reason: "effect chain could not be wired on creation".into(),
            });
        }
    }

    fn after_topology_change(&mut self, id: &TrackId) -> Result<(), MixError> {
        self.refresh_duration();
        self.apply_audibility()?;
        if self.transport.is_playing() {
            let offset = self.transport.position(self.clock.now());
            if let Some(strip) = self.strips.get(id) {
                if let Err(e) = strip.start(&mut self.graph, offset) {
                    log::warn!("track {id}: could not start source: {e}");
                }
            }
        }
        Ok(())
    }

    pub fn track_ids(&self) -> &[TrackId] {
        &self.order
    }

    pub fn track(&self, id: &TrackId) -> Result<&Track, MixError> {
        self.strip(id).map(ChannelStrip::track)
    }

    fn strip(&self, id: &TrackId) -> Result<&ChannelStrip, MixError> {
        self.strips.get(id).ok_or_else(|| MixError::UnknownTrack(id.clone()))
    }

    fn strip_mut(&mut self, id: &TrackId) -> Result<&mut ChannelStrip, MixError> {
        self.strips
            .get_mut(id)
            .ok_or_else(|| MixError::UnknownTrack(id.clone()))
    }

    fn tracks(&self) -> impl Iterator<Item = &Track> + Clone + '_ {
        self.order
            .iter()
            .filter_map(|id| self.strips.get(id))
            .map(ChannelStrip::track)
    }

    // ── Strip commands ──────────────────────────────────────

    pub fn set_track_volume(&mut self, id: &TrackId, db: f64) -> Result<f64, MixError> {
        let strip = self.strips.get_mut(id).ok_or_else(|| MixError::UnknownTrack(id.clone()))?;
        strip.set_volume(&mut self.graph, db)
    }

    pub fn set_track_pan(&mut self, id: &TrackId, pan: f64) -> Result<f64, MixError> {
        let strip = self.strips.get_mut(id).ok_or_else(|| MixError::UnknownTrack(id.clone()))?;
        strip.set_pan(&mut self.graph, pan)
    }

    /// Returns the new mute flag.
    pub fn toggle_mute(&mut self, id: &TrackId) -> Result<bool, MixError> {
        let muted = self.strip_mut(id)?.toggle_mute();
        self.apply_audibility()?;
        Ok(muted)
    }

    /// Returns the new solo flag.
    pub fn toggle_solo(&mut self, id: &TrackId) -> Result<bool, MixError> {
        let soloed = self.strip_mut(id)?.toggle_solo();
        self.apply_audibility()?;
        Ok(soloed)
    }

    /// Flip an effect and rewire the track's chain. Returns the new enable
    /// flag. A rewire failure leaves the track in bypass and is reported as
    /// [`MixEvent::ChainBypassed`], not as an error.
    pub fn toggle_effect(&mut self, id: &TrackId, kind: EffectKind) -> Result<bool, MixError> {
        let strip = self.strips.get_mut(id).ok_or_else(|| MixError::UnknownTrack(id.clone()))?;
        match strip.toggle_effect(&mut self.graph, kind) {
            Ok(enabled) => Ok(enabled),
            Err(MixError::ChainRebuild { track_id, reason }) => {
                let enabled = strip.track().effects.is_enabled(kind);
                self.events.push(MixEvent::ChainBypassed { track_id, reason });
                Ok(enabled)
            }
            Err(e) => Err(e),
        }
    }

    /// Set one effect parameter by name (`"low"`, `"threshold"`, `"wet"`, ...).
    /// Returns the clamped value applied.
    pub fn update_effect_param(
        &mut self,
        id: &TrackId,
        kind: EffectKind,
        name: &str,
        value: f64,
    ) -> Result<f64, MixError> {
        let param = EffectParam::parse(kind, name)?;
        self.set_effect_param(id, param, value)
    }

    pub fn set_effect_param(&mut self, id: &TrackId, param: EffectParam, value: f64) -> Result<f64, MixError> {
        let strip = self.strips.get_mut(id).ok_or_else(|| MixError::UnknownTrack(id.clone()))?;
        strip.update_effect_param(&mut self.graph, param, value)
    }

    /// The effects currently wired for a track, in signal order.
    pub fn active_chain(&self, id: &TrackId) -> Result<Vec<EffectKind>, MixError> {
        self.strip(id)?.active_chain(&self.graph)
    }

    /// Re-run solo/mute resolution over every track and apply the result as
    /// gain overrides.
    fn apply_audibility(&mut self) -> Result<(), MixError> {
        let audible = resolve_audibility(self.tracks());
        for (id, audible) in audible {
            if let Some(strip) = self.strips.get_mut(&id) {
                strip.set_audible(&mut self.graph, audible)?;
            }
        }
        Ok(())
    }

    // ── Master bus ──────────────────────────────────────────

    pub fn master_volume_db(&self) -> f64 {
        self.master_volume_db
    }

    pub fn set_master_volume(&mut self, db: f64) -> Result<f64, MixError> {
        self.master_volume_db = clamp_volume_db(db);
        self.graph.set_gain(self.master, db_to_gain(self.master_volume_db))?;
        Ok(self.master_volume_db)
    }

    // ── Transport ───────────────────────────────────────────

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing()
    }

    /// Longest loaded source; failed tracks do not count.
    pub fn duration_secs(&self) -> f64 {
        self.transport.duration()
    }

    fn refresh_duration(&mut self) {
        let duration = self
            .strips
            .values()
            .filter_map(ChannelStrip::duration_secs)
            .fold(0.0, f64::max);
        self.transport.set_duration(duration);
    }

    /// Start every loaded source at the transport position.
    pub fn play(&mut self) -> Result<(), MixError> {
        let offset = self.transport.play(self.clock.now())?;
        self.start_all(offset);
        log::info!("playback started at {offset:.3}s");
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), MixError> {
        let at = self.transport.pause(self.clock.now())?;
        self.stop_all();
        log::info!("playback paused at {at:.3}s");
        Ok(())
    }

    pub fn stop(&mut self) {
        self.transport.stop();
        self.stop_all();
        self.clear_tails();
    }

    /// Jump to `secs`; returns the clamped position. Effect tails from the
    /// old position are dropped.
    pub fn seek(&mut self, secs: f64) -> f64 {
        let target = self.transport.seek(self.clock.now(), secs);
        self.clear_tails();
        if self.transport.is_playing() {
            self.start_all(target);
        }
        target
    }

    /// Current position, without end-of-mix handling.
    pub fn current_time(&self) -> f64 {
        self.transport.position(self.clock.now())
    }

    /// Poll the transport. Reaching the end of the mix stops playback,
    /// rewinds to 0 and queues [`MixEvent::PlaybackEnded`].
    pub fn tick(&mut self) -> f64 {
        let tick = self.transport.tick(self.clock.now());
        if tick.ended {
            self.stop_all();
            self.events.push(MixEvent::PlaybackEnded);
            log::info!("playback reached end of mix");
        }
        tick.position
    }

    /// Position reported for one track: the shared transport position.
    pub fn track_position(&self, id: &TrackId) -> Result<f64, MixError> {
        self.strip(id)?;
        Ok(self.current_time())
    }

    fn start_all(&mut self, offset: f64) {
        for id in &self.order {
            if let Some(strip) = self.strips.get(id) {
                if let Err(e) = strip.start(&mut self.graph, offset) {
                    log::warn!("track {id}: could not start source: {e}");
                }
            }
        }
    }

    fn stop_all(&mut self) {
        for id in &self.order {
            if let Some(strip) = self.strips.get(id) {
                if let Err(e) = strip.stop(&mut self.graph) {
                    log::warn!("track {id}: could not stop source: {e}");
                }
            }
        }
    }

    fn clear_tails(&mut self) {
        for id in &self.order {
            if let Some(strip) = self.strips.get(id) {
                if let Err(e) = strip.clear_tails(&mut self.graph) {
                    log::warn!("track {id}: could not clear effect tails: {e}");
                }
            }
        }
    }

    // ── Engine / UI ─────────────────────────────────────────

    /// Render the next block of the live mix into `left`/`right`.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.graph.process(left, right);
    }

    /// Take all queued events, oldest first.
    pub fn drain_events(&mut self) -> Vec<MixEvent> {
        std::mem::take(&mut self.events)
    }

    /// Immutable copy of everything the offline renderer needs. Decoded
    /// buffers are shared, not copied.
    pub fn snapshot(&self) -> MixSnapshot {
        MixSnapshot {
            tracks: self
                .order
                .iter()
                .filter_map(|id| self.strips.get(id))
                .map(|s| TrackSnapshot {
                    track: s.track().clone(),
                    source: s.source().clone(),
                })
                .collect(),
            master_volume_db: self.master_volume_db,
            duration_secs: self.duration_secs(),
        }
    }

    pub fn state(&self) -> MixState {
        let tracks = self
            .order
            .iter()
            .filter_map(|id| self.strips.get(id))
            .map(|s| TrackState {
                track: s.track().clone(),
                audible: s.is_audible(),
                load_failed: s.is_load_failed(),
                load_error: match s.source() {
                    SourceState::Failed(reason) => Some(reason.clone()),
                    SourceState::Loaded(_) => None,
                },
                bypassed: s.is_bypassed(),
                duration_sec: s.duration_secs().unwrap_or(0.0),
            })
            .collect();
        MixState {
            tracks,
            master_volume_db: self.master_volume_db,
            current_time_sec: self.current_time(),
            duration_sec: self.duration_secs(),
            is_playing: self.is_playing(),
            transport: self.transport.state(),
        }
    }
}
