//! Channel strip — one track's nodes in an audio graph.
//!
//! A strip owns a source node, one node per insert effect, and a channel
//! node (gain + pan) that feeds the master bus. All four effect nodes exist
//! for the strip's whole life; enabling or disabling one only changes which
//! of them are wired between the source and the channel node.

use std::sync::Arc;

use crate::asset::DecodedAudio;
use crate::dsp::gain::db_to_gain;
use crate::effects::{EffectKind, EffectParam, compute_chain_order};
use crate::error::MixError;
use crate::graph::{AudioGraph, GraphError, NodeId, NodeKind, Output};
use crate::track::{Track, clamp_pan, clamp_volume_db};

/// Decoded audio for a track, or the reason it could not be loaded.
#[derive(Debug, Clone)]
pub enum SourceState {
    Loaded(Arc<DecodedAudio>),
    Failed(String),
}

impl SourceState {
    pub fn is_failed(&self) -> bool {
        matches!(self, SourceState::Failed(_))
    }

    pub fn audio(&self) -> Option<&Arc<DecodedAudio>> {
        match self {
            SourceState::Loaded(audio) => Some(audio),
            SourceState::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct StripNodes {
    source: NodeId,
    /// Indexed in `EffectKind::ORDER` order.
    effects: [NodeId; 4],
    channel: NodeId,
}

impl StripNodes {
    fn effect(&self, kind: EffectKind) -> NodeId {
        self.effects[kind as usize]
    }

    fn chain_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::once(self.source).chain(self.effects.iter().copied())
    }
}

/// Per-track gain/pan/mute/solo state plus its effect chain.
#[derive(Debug)]
pub struct ChannelStrip {
    track: Track,
    source: SourceState,
    nodes: Option<StripNodes>,
    audible: bool,
    bypassed: bool,
}

impl ChannelStrip {
    /// Build the strip's nodes in `graph` and connect its channel node into
    /// `bus`. A failed source gets no nodes at all; the strip still exists so
    /// the UI can show it.
    pub fn build(
        graph: &mut AudioGraph,
        track: Track,
        source: SourceState,
        bus: NodeId,
        audible: bool,
    ) -> Result<Self, MixError> {
        let mut strip = ChannelStrip {
            track,
            source,
            nodes: None,
            audible,
            bypassed: false,
        };
        strip.track.volume_db = clamp_volume_db(strip.track.volume_db);
        strip.track.pan = clamp_pan(strip.track.pan);
        strip.track.effects.limit_delay_time(graph.max_delay_secs());

        let SourceState::Loaded(audio) = &strip.source else {
            return Ok(strip);
        };

        let source = graph.create_source(Arc::clone(audio));
        let fx = strip.track.effects;
        let effects = EffectKind::ORDER.map(|kind| graph.create_effect(kind, &fx));
        let channel = graph.create_channel(strip.effective_gain(), strip.track.pan);
        if let Err(e) = graph.connect(channel, bus) {
            for node in std::iter::once(source).chain(effects).chain(std::iter::once(channel)) {
                let _ = graph.dispose(node);
            }
            return Err(e.into());
        }

        strip.nodes = Some(StripNodes {
            source,
            effects,
            channel,
        });
        // A chain that cannot be wired leaves the strip in bypass, visible
        // through `is_bypassed`.
        let _ = strip.rebuild_chain(graph);
        Ok(strip)
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    pub fn source(&self) -> &SourceState {
        &self.source
    }

    pub fn is_load_failed(&self) -> bool {
        self.source.is_failed()
    }

    pub fn is_audible(&self) -> bool {
        self.audible
    }

    /// True when the last rebuild failed and the signal runs unprocessed.
    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    pub fn duration_secs(&self) -> Option<f64> {
        self.source.audio().map(|a| a.duration_secs())
    }

    /// Gain the channel node should run at: fader level, or silence when
    /// muted/solo-excluded.
    pub fn effective_gain(&self) -> f64 {
        if self.audible {
            db_to_gain(self.track.volume_db)
        } else {
            0.0
        }
    }

    fn apply_gain(&self, graph: &mut AudioGraph) -> Result<(), MixError> {
        if let Some(nodes) = &self.nodes {
            graph.set_gain(nodes.channel, self.effective_gain())?;
        }
        Ok(())
    }

    /// Set the fader level (clamped). Returns the value applied.
    pub fn set_volume(&mut self, graph: &mut AudioGraph, db: f64) -> Result<f64, MixError> {
        self.track.volume_db = clamp_volume_db(db);
        self.apply_gain(graph)?;
        Ok(self.track.volume_db)
    }

    /// Set the pan position (clamped). Returns the value applied.
    pub fn set_pan(&mut self, graph: &mut AudioGraph, pan: f64) -> Result<f64, MixError> {
        self.track.pan = clamp_pan(pan);
        if let Some(nodes) = &self.nodes {
            graph.set_pan(nodes.channel, self.track.pan)?;
        }
        Ok(self.track.pan)
    }

    /// Flags only; the session resolves audibility across all tracks.
    pub fn toggle_mute(&mut self) -> bool {
        self.track.muted = !self.track.muted;
        self.track.muted
    }

    pub fn toggle_solo(&mut self) -> bool {
        self.track.soloed = !self.track.soloed;
        self.track.soloed
    }

    /// Apply the session's solo/mute resolution as a gain override.
    /// `volume_db` itself is never touched.
    pub fn set_audible(&mut self, graph: &mut AudioGraph, audible: bool) -> Result<(), MixError> {
        if self.audible != audible {
            self.audible = audible;
            self.apply_gain(graph)?;
        }
        Ok(())
    }

    /// Flip an effect's enable flag and rewire the chain.
    ///
    /// On a wiring failure the strip falls back to bypass (source straight
    /// into the channel) and the error is returned for reporting; the enable
    /// flag keeps its new value.
    pub fn toggle_effect(&mut self, graph: &mut AudioGraph, kind: EffectKind) -> Result<bool, MixError> {
        let enabled = self.track.effects.toggle(kind);
        self.rebuild_chain(graph)?;
        Ok(enabled)
    }

    /// Write one effect parameter to the track and the live node. The chain
    /// wiring is not touched.
    pub fn update_effect_param(
        &mut self,
        graph: &mut AudioGraph,
        param: EffectParam,
        value: f64,
    ) -> Result<f64, MixError> {
        let mut applied = self.track.effects.set_param(param, value);
        if param == EffectParam::DelayTime {
            applied = self.track.effects.limit_delay_time(graph.max_delay_secs());
        }
        if let Some(nodes) = &self.nodes {
            graph.set_effect_params(nodes.effect(param.kind()), &self.track.effects)?;
        }
        Ok(applied)
    }

    /// Disconnect every chain node, then connect only the enabled effects in
    /// fixed order. Idempotent.
    pub fn rebuild_chain(&mut self, graph: &mut AudioGraph) -> Result<(), MixError> {
        let Some(nodes) = self.nodes else {
            return Ok(());
        };

        // Ducking may fail if the channel node itself is gone; the rewire
        // below reports that.
        let _ = graph.duck(nodes.channel);

        match Self::wire(graph, &nodes, &compute_chain_order(self.track.effects.enabled_flags())) {
            Ok(()) => {
                self.bypassed = false;
                log::debug!(
                    "track {}: chain rebuilt {:?}",
                    self.track.id,
                    self.track.effects.chain_order()
                );
                Ok(())
            }
            Err(e) => {
                log::warn!("track {}: chain rebuild failed ({e}), bypassing effects", self.track.id);
                self.bypassed = true;
                // Best effort: whatever is still alive gets the dry path.
                for node in nodes.chain_nodes() {
                    let _ = graph.disconnect(node);
                }
                let _ = graph.connect(nodes.source, nodes.channel);
                Err(MixError::ChainRebuild {
                    track_id: self.track.id.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn wire(graph: &mut AudioGraph, nodes: &StripNodes, order: &[EffectKind]) -> Result<(), GraphError> {
        for node in nodes.chain_nodes() {
            graph.disconnect(node)?;
        }
        let mut upstream = nodes.source;
        for &kind in order {
            let node = nodes.effect(kind);
            graph.connect(upstream, node)?;
            upstream = node;
        }
        graph.connect(upstream, nodes.channel)
    }

    /// The effects currently wired between source and channel, read back
    /// from the graph.
    pub fn active_chain(&self, graph: &AudioGraph) -> Result<Vec<EffectKind>, MixError> {
        let Some(nodes) = &self.nodes else {
            return Ok(Vec::new());
        };
        let mut chain = Vec::new();
        let mut cursor = nodes.source;
        loop {
            match graph.output(cursor)? {
                Some(Output::Node(next)) if next == nodes.channel => return Ok(chain),
                Some(Output::Node(next)) => match graph.kind(next)? {
                    NodeKind::Effect(kind) if chain.len() < EffectKind::ORDER.len() => {
                        chain.push(kind);
                        cursor = next;
                    }
                    other => {
                        return Err(MixError::ChainRebuild {
                            track_id: self.track.id.clone(),
                            reason: format!("unexpected {other:?} node in chain"),
                        });
                    }
                },
                _ => {
                    return Err(MixError::ChainRebuild {
                        track_id: self.track.id.clone(),
                        reason: "chain does not reach the channel node".into(),
                    });
                }
            }
        }
    }

    /// Start the source `offset_secs` into the track. No-op for failed strips.
    pub fn start(&self, graph: &mut AudioGraph, offset_secs: f64) -> Result<(), MixError> {
        if let Some(nodes) = &self.nodes {
            graph.start_source(nodes.source, offset_secs)?;
        }
        Ok(())
    }

    pub fn stop(&self, graph: &mut AudioGraph) -> Result<(), MixError> {
        if let Some(nodes) = &self.nodes {
            graph.stop_source(nodes.source)?;
        }
        Ok(())
    }

    /// Silence reverb and delay tails and filter history so the next start
    /// does not replay audio from before it.
    pub fn clear_tails(&self, graph: &mut AudioGraph) -> Result<(), MixError> {
        if let Some(nodes) = &self.nodes {
            for node in nodes.effects {
                graph.reset_effect(node)?;
            }
        }
        Ok(())
    }

    /// Release every node the strip created. Nodes that are already gone are
    /// skipped.
    pub fn dispose(self, graph: &mut AudioGraph) {
        if let Some(nodes) = self.nodes {
            for node in nodes.chain_nodes().chain(std::iter::once(nodes.channel)) {
                let _ = graph.dispose(node);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn effect_node(&self, kind: EffectKind) -> Option<NodeId> {
        self.nodes.map(|n| n.effect(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::EnabledFlags;
    use crate::track::SourceKind;

    fn setup() -> (AudioGraph, NodeId) {
        let mut graph = AudioGraph::realtime(8000, 64);
        let master = graph.create_master(1.0);
        graph.connect_to_destination(master).unwrap();
        (graph, master)
    }

    fn loaded(value: f32) -> SourceState {
        SourceState::Loaded(Arc::new(DecodedAudio::from_mono(vec![value; 8000], 8000)))
    }

    fn strip(graph: &mut AudioGraph, master: NodeId) -> ChannelStrip {
        let track = Track::new("t1", "Lead", SourceKind::Vocal, "mem://lead.wav");
        ChannelStrip::build(graph, track, loaded(0.5), master, true).unwrap()
    }

    #[test]
    fn test_fresh_strip_is_dry() {
        let (mut graph, master) = setup();
        let s = strip(&mut graph, master);
        assert!(s.active_chain(&graph).unwrap().is_empty());
        assert!(!s.is_bypassed());
    }

    #[test]
    fn test_every_enabled_subset_is_wired_in_order() {
        let (mut graph, master) = setup();
        let mut s = strip(&mut graph, master);

        for mask in 0u8..16 {
            let want = EnabledFlags {
                eq: mask & 1 != 0,
                compressor: mask & 2 != 0,
                reverb: mask & 4 != 0,
                delay: mask & 8 != 0,
            };
            for kind in EffectKind::ORDER {
                if s.track().effects.is_enabled(kind) != want.get(kind) {
                    s.toggle_effect(&mut graph, kind).unwrap();
                }
            }
            let chain = s.active_chain(&graph).unwrap();
            assert_eq!(chain, compute_chain_order(want), "mask {mask:04b}");
            // No duplicates and nothing left dangling.
            let mut dedup = chain.clone();
            dedup.dedup();
            assert_eq!(dedup, chain);
            for kind in EffectKind::ORDER {
                let node = s.effect_node(kind).unwrap();
                let out = graph.output(node).unwrap();
                if want.get(kind) {
                    assert!(out.is_some(), "{kind} should be wired");
                } else {
                    assert_eq!(out, None, "{kind} should be disconnected");
                }
            }
        }
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let (mut graph, master) = setup();
        let mut s = strip(&mut graph, master);
        s.toggle_effect(&mut graph, EffectKind::Delay).unwrap();
        s.toggle_effect(&mut graph, EffectKind::Eq).unwrap();
        let before = s.active_chain(&graph).unwrap();
        s.rebuild_chain(&mut graph).unwrap();
        s.rebuild_chain(&mut graph).unwrap();
        assert_eq!(s.active_chain(&graph).unwrap(), before);
    }

    #[test]
    fn test_disposed_effect_falls_back_to_bypass() {
        let (mut graph, master) = setup();
        let mut s = strip(&mut graph, master);
        let reverb = s.effect_node(EffectKind::Reverb).unwrap();
        graph.dispose(reverb).unwrap();

        let err = s.toggle_effect(&mut graph, EffectKind::Reverb).unwrap_err();
        assert!(matches!(err, MixError::ChainRebuild { .. }));
        assert!(s.is_bypassed());
        assert!(s.track().effects.reverb.enabled);
        // Dry path: source goes straight to the channel node.
        assert!(s.active_chain(&graph).unwrap().is_empty());

        let mut l = vec![0.0; 64];
        let mut r = vec![0.0; 64];
        s.start(&mut graph, 0.0).unwrap();
        graph.process(&mut l, &mut r);
        assert!(l.iter().any(|&v| v != 0.0), "bypass must not be silent");
    }

    #[test]
    fn test_volume_and_pan_are_clamped() {
        let (mut graph, master) = setup();
        let mut s = strip(&mut graph, master);
        assert_eq!(s.set_volume(&mut graph, 20.0).unwrap(), 6.0);
        assert_eq!(s.set_pan(&mut graph, -4.0).unwrap(), -1.0);
        assert_eq!(s.track().volume_db, 6.0);
    }

    #[test]
    fn test_inaudible_overrides_gain_without_touching_volume() {
        let (mut graph, master) = setup();
        let mut s = strip(&mut graph, master);
        s.set_volume(&mut graph, -6.0).unwrap();
        s.set_audible(&mut graph, false).unwrap();
        assert_eq!(s.effective_gain(), 0.0);
        assert_eq!(s.track().volume_db, -6.0);
        s.set_audible(&mut graph, true).unwrap();
        assert!((s.effective_gain() - db_to_gain(-6.0)).abs() < 1e-12);
    }

    #[test]
    fn test_param_update_keeps_wiring() {
        let (mut graph, master) = setup();
        let mut s = strip(&mut graph, master);
        s.toggle_effect(&mut graph, EffectKind::Compressor).unwrap();
        let applied = s
            .update_effect_param(&mut graph, EffectParam::CompRatio, 50.0)
            .unwrap();
        assert_eq!(applied, 20.0);
        assert_eq!(s.active_chain(&graph).unwrap(), vec![EffectKind::Compressor]);
    }

    #[test]
    fn test_failed_source_has_no_nodes() {
        let (mut graph, master) = setup();
        let before = graph.node_count();
        let track = Track::new("bad", "Bad", SourceKind::Vocal, "https://nowhere/x.wav");
        let mut s = ChannelStrip::build(
            &mut graph,
            track,
            SourceState::Failed("404".into()),
            master,
            true,
        )
        .unwrap();
        assert!(s.is_load_failed());
        assert_eq!(graph.node_count(), before);
        // Commands still work on the track state.
        s.toggle_effect(&mut graph, EffectKind::Eq).unwrap();
        s.start(&mut graph, 0.0).unwrap();
        assert_eq!(s.duration_secs(), None);
    }

    #[test]
    fn test_dispose_releases_all_nodes() {
        let (mut graph, master) = setup();
        let before = graph.node_count();
        let s = strip(&mut graph, master);
        assert_eq!(graph.node_count(), before + 6);
        s.dispose(&mut graph);
        assert_eq!(graph.node_count(), before);
    }

    #[test]
    fn test_delay_time_limited_to_graph_line() {
        let (mut graph, master) = setup();
        let mut s = strip(&mut graph, master);
        let applied = s
            .update_effect_param(&mut graph, EffectParam::DelayTime, 4.0)
            .unwrap();
        assert_eq!(applied, graph.max_delay_secs());
        assert_eq!(s.track().effects.delay.time, graph.max_delay_secs());
    }

    #[test]
    fn test_build_limits_stored_delay_time() {
        let (mut graph, master) = setup();
        let mut track = Track::new("d", "Delay", SourceKind::Mixed, "mem://");
        track.effects.delay.time = 4.5;
        let s = ChannelStrip::build(&mut graph, track, loaded(0.1), master, true).unwrap();
        assert_eq!(s.track().effects.delay.time, graph.max_delay_secs());
    }

    #[test]
    fn test_failed_bus_connect_leaves_no_nodes() {
        let (mut graph, master) = setup();
        let bus = graph.create_master(1.0);
        graph.dispose(bus).unwrap();
        let before = graph.node_count();
        let track = Track::new("x", "X", SourceKind::Vocal, "mem://");
        let err = ChannelStrip::build(&mut graph, track, loaded(0.1), bus, true).unwrap_err();
        assert!(matches!(err, MixError::Graph(GraphError::Disposed(_))));
        assert_eq!(graph.node_count(), before);
        assert!(graph.is_alive(master));
    }

    #[test]
    fn test_clear_tails_silences_delay_after_stop() {
        let (mut graph, master) = setup();
        let mut s = strip(&mut graph, master);
        s.toggle_effect(&mut graph, EffectKind::Delay).unwrap();
        s.update_effect_param(&mut graph, EffectParam::DelayWet, 1.0).unwrap();
        s.update_effect_param(&mut graph, EffectParam::DelayTime, 0.1).unwrap();
        s.start(&mut graph, 0.0).unwrap();

        let mut l = vec![0.0; 256];
        let mut r = vec![0.0; 256];
        graph.process(&mut l, &mut r);
        s.stop(&mut graph).unwrap();
        s.clear_tails(&mut graph).unwrap();

        let mut l = vec![0.0; 1600];
        let mut r = vec![0.0; 1600];
        graph.process(&mut l, &mut r);
        assert!(l.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_clear_tails_on_failed_strip_is_noop() {
        let (mut graph, master) = setup();
        let track = Track::new("bad", "Bad", SourceKind::Vocal, "mem://");
        let failed = ChannelStrip::build(&mut graph, track, SourceState::Failed("404".into()), master, true).unwrap();
        assert!(failed.clear_tails(&mut graph).is_ok());
    }
}
