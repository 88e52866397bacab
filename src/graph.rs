//! Audio graph — the node arena every channel strip is built in.
//!
//! A graph is either realtime (pulled block by block by the host's audio
//! callback) or offline (rendered to completion into a fixed-length buffer).
//! Each node has at most one output connection, which matches the mixer's
//! topology: source → inserts → channel → master → destination. Fan-in is
//! unrestricted; a node sums everything connected to it.
//!
//! Node handles are generational, so a handle to a disposed node is detected
//! instead of silently addressing whatever reused the slot.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::asset::DecodedAudio;
use crate::dsp::compressor::Compressor;
use crate::dsp::delay::Delay;
use crate::dsp::eq::ThreeBandEq;
use crate::dsp::gain::{GainRamp, pan_stereo};
use crate::dsp::reverb::Reverb;
use crate::effects::{EffectKind, EffectSet};

/// Handle to a node in an [`AudioGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {0} has been disposed")]
    Disposed(NodeId),
    #[error("connecting {from} to {to} would create a cycle")]
    Cycle { from: NodeId, to: NodeId },
    #[error("{0:?} nodes do not accept input")]
    NoInput(NodeKind),
    #[error("node {0} is a {1:?}, not the expected kind")]
    WrongKind(NodeId, NodeKind),
    #[error("offline graph already rendered")]
    AlreadyRendered,
}

/// What a node is, without its DSP state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Source,
    Effect(EffectKind),
    Channel,
    Master,
}

/// Where a node's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Output {
    Node(NodeId),
    Destination,
}

/// Plays a decoded buffer from an offset. Reads at the buffer's native rate
/// relative to the context rate.
#[derive(Debug, Clone)]
struct SourceNode {
    audio: Arc<DecodedAudio>,
    position: Option<f64>,
    step: f64,
}

impl SourceNode {
    fn render(&mut self, left: &mut [f32], right: &mut [f32]) {
        let Some(mut pos) = self.position else {
            return;
        };
        let len = self.audio.frames() as f64;
        for i in 0..left.len() {
            if pos >= len {
                break;
            }
            let (l, r) = self.audio.read_interpolated(pos);
            left[i] = l;
            right[i] = r;
            pos += self.step;
        }
        self.position = Some(pos);
    }
}

#[derive(Debug, Clone)]
struct ChannelNode {
    gain: GainRamp,
    pan: f64,
}

enum Processor {
    Source(SourceNode),
    Eq(ThreeBandEq),
    Compressor(Compressor),
    Reverb(Reverb),
    Delay(Delay),
    Channel(ChannelNode),
    Master(GainRamp),
}

impl Processor {
    fn kind(&self) -> NodeKind {
        match self {
            Processor::Source(_) => NodeKind::Source,
            Processor::Eq(_) => NodeKind::Effect(EffectKind::Eq),
            Processor::Compressor(_) => NodeKind::Effect(EffectKind::Compressor),
            Processor::Reverb(_) => NodeKind::Effect(EffectKind::Reverb),
            Processor::Delay(_) => NodeKind::Effect(EffectKind::Delay),
            Processor::Channel(_) => NodeKind::Channel,
            Processor::Master(_) => NodeKind::Master,
        }
    }

    fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        match self {
            Processor::Source(src) => src.render(left, right),
            Processor::Eq(eq) => eq.process_block(left, right),
            Processor::Compressor(comp) => comp.process_block(left, right),
            Processor::Reverb(reverb) => reverb.process_block(left, right),
            Processor::Delay(delay) => delay.process_block(left, right),
            Processor::Channel(ch) => {
                for i in 0..left.len() {
                    let g = ch.gain.next() as f32;
                    let (l, r) = pan_stereo(ch.pan, left[i] * g, right[i] * g);
                    left[i] = l;
                    right[i] = r;
                }
            }
            Processor::Master(gain) => {
                for i in 0..left.len() {
                    let g = gain.next() as f32;
                    left[i] *= g;
                    right[i] *= g;
                }
            }
        }
    }

    /// Forget filter history and ringing tails. Returns false for nodes
    /// that keep no such state.
    fn reset(&mut self) -> bool {
        match self {
            Processor::Eq(eq) => eq.reset(),
            Processor::Compressor(comp) => comp.reset(),
            Processor::Reverb(reverb) => reverb.clear(),
            Processor::Delay(delay) => delay.clear(),
            Processor::Source(_) | Processor::Channel(_) | Processor::Master(_) => return false,
        }
        true
    }
}

struct NodeEntry {
    processor: Processor,
    output: Option<Output>,
}

struct Slot {
    generation: u32,
    entry: Option<NodeEntry>,
}

/// Whether the graph is driven live or rendered to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMode {
    Realtime,
    Offline { length_frames: usize },
}

/// A rendered stereo buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct StereoBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl StereoBuffer {
    pub fn silence(frames: usize) -> Self {
        Self {
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    fn add(&mut self, other: &StereoBuffer) {
        for (d, s) in self.left.iter_mut().zip(&other.left) {
            *d += *s;
        }
        for (d, s) in self.right.iter_mut().zip(&other.right) {
            *d += *s;
        }
    }
}

/// Node arena plus connection table.
pub struct AudioGraph {
    mode: ContextMode,
    sample_rate: f64,
    block_size: usize,
    ramp_frames: usize,
    max_delay_secs: f64,
    slots: Vec<Slot>,
    free: Vec<u32>,
    frames_rendered: u64,
    rendered: bool,
}

impl AudioGraph {
    pub fn realtime(sample_rate: u32, block_size: usize) -> Self {
        Self::with_mode(ContextMode::Realtime, sample_rate, block_size)
    }

    /// An offline context sized to `length_frames` of stereo output.
    pub fn offline(length_frames: usize, sample_rate: u32, block_size: usize) -> Self {
        Self::with_mode(ContextMode::Offline { length_frames }, sample_rate, block_size)
    }

    fn with_mode(mode: ContextMode, sample_rate: u32, block_size: usize) -> Self {
        Self {
            mode,
            sample_rate: sample_rate as f64,
            block_size: block_size.max(1),
            ramp_frames: 0,
            max_delay_secs: 2.0,
            slots: Vec::new(),
            free: Vec::new(),
            frames_rendered: 0,
            rendered: false,
        }
    }

    /// Declick ramp length for channel and master gain changes.
    pub fn with_ramp_frames(mut self, ramp_frames: usize) -> Self {
        self.ramp_frames = ramp_frames;
        self
    }

    /// Size of the delay lines allocated by [`AudioGraph::create_effect`].
    pub fn with_max_delay(mut self, max_delay_secs: f64) -> Self {
        self.max_delay_secs = max_delay_secs;
        self
    }

    pub fn mode(&self) -> ContextMode {
        self.mode
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Longest delay time an effect node can play, in seconds.
    pub fn max_delay_secs(&self) -> f64 {
        self.max_delay_secs
    }

    /// Context time in seconds, advanced by rendering.
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate
    }

    /// Number of live (not disposed) nodes.
    pub fn node_count(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    // ── Node lifecycle ──────────────────────────────────────

    fn insert(&mut self, processor: Processor) -> NodeId {
        let entry = NodeEntry {
            processor,
            output: None,
        };
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.entry = Some(entry);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                entry: Some(entry),
            });
            NodeId {
                index: (self.slots.len() - 1) as u32,
                generation: 0,
            }
        }
    }

    pub fn create_source(&mut self, audio: Arc<DecodedAudio>) -> NodeId {
        let step = audio.sample_rate as f64 / self.sample_rate;
        self.insert(Processor::Source(SourceNode {
            audio,
            position: None,
            step,
        }))
    }

    /// Create the effect node for `kind`, initialized from `params`.
    pub fn create_effect(&mut self, kind: EffectKind, params: &EffectSet) -> NodeId {
        let sr = self.sample_rate;
        let processor = match kind {
            EffectKind::Eq => Processor::Eq(ThreeBandEq::with_gains(
                sr,
                params.eq.low_db,
                params.eq.mid_db,
                params.eq.high_db,
            )),
            EffectKind::Compressor => Processor::Compressor(Compressor::with_params(
                sr,
                params.compressor.threshold_db,
                params.compressor.ratio,
                params.compressor.attack,
                params.compressor.release,
            )),
            EffectKind::Reverb => {
                Processor::Reverb(Reverb::with_params(sr, params.reverb.decay, params.reverb.wet))
            }
            EffectKind::Delay => Processor::Delay(Delay::with_params(
                sr,
                self.max_delay_secs,
                params.delay.time,
                params.delay.feedback,
                params.delay.wet,
            )),
        };
        self.insert(processor)
    }

    pub fn create_channel(&mut self, gain: f64, pan: f64) -> NodeId {
        let ramp = GainRamp::new(gain, self.ramp_frames);
        self.insert(Processor::Channel(ChannelNode { gain: ramp, pan }))
    }

    pub fn create_master(&mut self, gain: f64) -> NodeId {
        let ramp = GainRamp::new(gain, self.ramp_frames);
        self.insert(Processor::Master(ramp))
    }

    /// Remove a node. Anything that was feeding it is left unconnected.
    pub fn dispose(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.entry(id)?;
        let slot = &mut self.slots[id.index as usize];
        slot.entry = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);

        for slot in &mut self.slots {
            if let Some(entry) = &mut slot.entry {
                if entry.output == Some(Output::Node(id)) {
                    entry.output = None;
                }
            }
        }
        Ok(())
    }

    pub fn is_alive(&self, id: NodeId) -> bool {
        self.entry(id).is_ok()
    }

    fn entry(&self, id: NodeId) -> Result<&NodeEntry, GraphError> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_ref())
            .ok_or(GraphError::Disposed(id))
    }

    fn entry_mut(&mut self, id: NodeId) -> Result<&mut NodeEntry, GraphError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.entry.as_mut())
            .ok_or(GraphError::Disposed(id))
    }

    pub fn kind(&self, id: NodeId) -> Result<NodeKind, GraphError> {
        Ok(self.entry(id)?.processor.kind())
    }

    // ── Wiring ──────────────────────────────────────────────

    /// Route `from`'s output into `to`, replacing any previous output.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        self.entry(from)?;
        let to_kind = self.kind(to)?;
        if to_kind == NodeKind::Source {
            return Err(GraphError::NoInput(to_kind));
        }
        // Following `to` downstream must never reach `from`.
        let mut cursor = Some(to);
        while let Some(node) = cursor {
            if node == from {
                return Err(GraphError::Cycle { from, to });
            }
            cursor = match self.entry(node)?.output {
                Some(Output::Node(next)) => Some(next),
                _ => None,
            };
        }
        self.entry_mut(from)?.output = Some(Output::Node(to));
        Ok(())
    }

    pub fn connect_to_destination(&mut self, from: NodeId) -> Result<(), GraphError> {
        self.entry_mut(from)?.output = Some(Output::Destination);
        Ok(())
    }

    pub fn disconnect(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.entry_mut(id)?.output = None;
        Ok(())
    }

    pub fn output(&self, id: NodeId) -> Result<Option<Output>, GraphError> {
        Ok(self.entry(id)?.output)
    }

    fn inputs_of(&self, target: Output) -> Vec<NodeId> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let entry = slot.entry.as_ref()?;
                (entry.output == Some(target)).then_some(NodeId {
                    index: index as u32,
                    generation: slot.generation,
                })
            })
            .collect()
    }

    // ── Parameter writes ────────────────────────────────────

    /// Push effect parameters into a live effect node. No rewiring happens.
    pub fn set_effect_params(&mut self, id: NodeId, params: &EffectSet) -> Result<(), GraphError> {
        let entry = self.entry_mut(id)?;
        match &mut entry.processor {
            Processor::Eq(eq) => eq.set_gains(params.eq.low_db, params.eq.mid_db, params.eq.high_db),
            Processor::Compressor(comp) => comp.set_params(
                params.compressor.threshold_db,
                params.compressor.ratio,
                params.compressor.attack,
                params.compressor.release,
            ),
            Processor::Reverb(reverb) => reverb.set_params(params.reverb.decay, params.reverb.wet),
            Processor::Delay(delay) => {
                delay.set_params(params.delay.time, params.delay.feedback, params.delay.wet)
            }
            other => return Err(GraphError::WrongKind(id, other.kind())),
        }
        Ok(())
    }

    /// Silence an effect node's internal state (reverb and delay tails,
    /// filter and detector history).
    pub fn reset_effect(&mut self, id: NodeId) -> Result<(), GraphError> {
        let processor = &mut self.entry_mut(id)?.processor;
        if processor.reset() {
            Ok(())
        } else {
            Err(GraphError::WrongKind(id, processor.kind()))
        }
    }

    pub fn set_gain(&mut self, id: NodeId, gain: f64) -> Result<(), GraphError> {
        match &mut self.entry_mut(id)?.processor {
            Processor::Channel(ch) => ch.gain.set_target(gain),
            Processor::Master(ramp) => ramp.set_target(gain),
            other => return Err(GraphError::WrongKind(id, other.kind())),
        }
        Ok(())
    }

    /// Current target gain of a channel or master node.
    pub fn gain(&self, id: NodeId) -> Result<f64, GraphError> {
        match &self.entry(id)?.processor {
            Processor::Channel(ch) => Ok(ch.gain.target()),
            Processor::Master(ramp) => Ok(ramp.target()),
            other => Err(GraphError::WrongKind(id, other.kind())),
        }
    }

    pub fn set_pan(&mut self, id: NodeId, pan: f64) -> Result<(), GraphError> {
        match &mut self.entry_mut(id)?.processor {
            Processor::Channel(ch) => ch.pan = pan,
            other => return Err(GraphError::WrongKind(id, other.kind())),
        }
        Ok(())
    }

    /// Mute a channel instantly and ramp it back to its target.
    pub fn duck(&mut self, id: NodeId) -> Result<(), GraphError> {
        match &mut self.entry_mut(id)?.processor {
            Processor::Channel(ch) => ch.gain.duck(),
            other => return Err(GraphError::WrongKind(id, other.kind())),
        }
        Ok(())
    }

    /// Start a source `offset_secs` into its buffer.
    pub fn start_source(&mut self, id: NodeId, offset_secs: f64) -> Result<(), GraphError> {
        match &mut self.entry_mut(id)?.processor {
            Processor::Source(src) => {
                src.position = Some(offset_secs.max(0.0) * src.audio.sample_rate as f64);
            }
            other => return Err(GraphError::WrongKind(id, other.kind())),
        }
        Ok(())
    }

    pub fn stop_source(&mut self, id: NodeId) -> Result<(), GraphError> {
        match &mut self.entry_mut(id)?.processor {
            Processor::Source(src) => src.position = None,
            other => return Err(GraphError::WrongKind(id, other.kind())),
        }
        Ok(())
    }

    // ── Rendering ───────────────────────────────────────────

    fn pull(&mut self, id: NodeId, frames: usize) -> StereoBuffer {
        let mut buf = StereoBuffer::silence(frames);
        for input in self.inputs_of(Output::Node(id)) {
            let upstream = self.pull(input, frames);
            buf.add(&upstream);
        }
        if let Ok(entry) = self.entry_mut(id) {
            entry.processor.process(&mut buf.left, &mut buf.right);
        }
        buf
    }

    fn render_quantum(&mut self, frames: usize) -> StereoBuffer {
        let mut out = StereoBuffer::silence(frames);
        for id in self.inputs_of(Output::Destination) {
            let buf = self.pull(id, frames);
            out.add(&buf);
        }
        self.frames_rendered += frames as u64;
        out
    }

    /// Realtime pull: fill `left`/`right` with the next block of the mix.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let mut done = 0;
        while done < frames {
            let n = (frames - done).min(self.block_size);
            let block = self.render_quantum(n);
            left[done..done + n].copy_from_slice(&block.left);
            right[done..done + n].copy_from_slice(&block.right);
            done += n;
        }
    }

    /// Offline render to completion. `cancelled` is polled between blocks;
    /// returning `true` abandons the render and yields `Ok(None)`.
    pub fn start_rendering(
        &mut self,
        cancelled: &dyn Fn() -> bool,
    ) -> Result<Option<StereoBuffer>, GraphError> {
        let length = match self.mode {
            ContextMode::Offline { length_frames } => length_frames,
            ContextMode::Realtime => 0,
        };
        if self.rendered {
            return Err(GraphError::AlreadyRendered);
        }
        self.rendered = true;

        let mut out = StereoBuffer::silence(length);
        let mut done = 0;
        while done < length {
            if cancelled() {
                return Ok(None);
            }
            let n = (length - done).min(self.block_size);
            let block = self.render_quantum(n);
            out.left[done..done + n].copy_from_slice(&block.left);
            out.right[done..done + n].copy_from_slice(&block.right);
            done += n;
        }
        Ok(Some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dc(value: f32, frames: usize, sample_rate: u32) -> Arc<DecodedAudio> {
        Arc::new(DecodedAudio::from_mono(vec![value; frames], sample_rate))
    }

    #[test]
    fn test_source_through_channel_and_master() {
        let mut g = AudioGraph::offline(8, 100, 4);
        let src = g.create_source(dc(0.5, 8, 100));
        let ch = g.create_channel(0.5, 0.0);
        let master = g.create_master(1.0);
        g.connect(src, ch).unwrap();
        g.connect(ch, master).unwrap();
        g.connect_to_destination(master).unwrap();
        g.start_source(src, 0.0).unwrap();

        let out = g.start_rendering(&|| false).unwrap().unwrap();
        assert_eq!(out.frames(), 8);
        assert!(out.left.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_unstarted_source_is_silent() {
        let mut g = AudioGraph::offline(4, 100, 4);
        let src = g.create_source(dc(1.0, 4, 100));
        g.connect_to_destination(src).unwrap();
        let out = g.start_rendering(&|| false).unwrap().unwrap();
        assert!(out.left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_short_source_is_zero_padded() {
        let mut g = AudioGraph::offline(10, 100, 3);
        let src = g.create_source(dc(1.0, 4, 100));
        g.connect_to_destination(src).unwrap();
        g.start_source(src, 0.0).unwrap();
        let out = g.start_rendering(&|| false).unwrap().unwrap();
        assert_eq!(&out.left[..4], &[1.0; 4]);
        assert_eq!(&out.left[4..], &[0.0; 6]);
    }

    #[test]
    fn test_master_sums_channels() {
        let mut g = AudioGraph::offline(2, 100, 2);
        let master = g.create_master(1.0);
        g.connect_to_destination(master).unwrap();
        for v in [0.1, 0.2, 0.3] {
            let src = g.create_source(dc(v, 2, 100));
            g.connect(src, master).unwrap();
            g.start_source(src, 0.0).unwrap();
        }
        let out = g.start_rendering(&|| false).unwrap().unwrap();
        assert!((out.left[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_disposed_handle_is_rejected() {
        let mut g = AudioGraph::realtime(100, 4);
        let a = g.create_channel(1.0, 0.0);
        g.dispose(a).unwrap();
        let b = g.create_channel(1.0, 0.0);
        // Same slot, new generation.
        assert_eq!(a.index, b.index);
        assert_eq!(g.connect(a, b), Err(GraphError::Disposed(a)));
        assert_eq!(g.dispose(a), Err(GraphError::Disposed(a)));
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn test_dispose_clears_dangling_outputs() {
        let mut g = AudioGraph::realtime(100, 4);
        let src = g.create_source(dc(1.0, 4, 100));
        let ch = g.create_channel(1.0, 0.0);
        g.connect(src, ch).unwrap();
        g.dispose(ch).unwrap();
        assert_eq!(g.output(src).unwrap(), None);
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut g = AudioGraph::realtime(100, 4);
        let a = g.create_channel(1.0, 0.0);
        let b = g.create_channel(1.0, 0.0);
        g.connect(a, b).unwrap();
        assert!(matches!(g.connect(b, a), Err(GraphError::Cycle { .. })));
        assert!(matches!(g.connect(a, a), Err(GraphError::Cycle { .. })));
    }

    #[test]
    fn test_sources_take_no_input() {
        let mut g = AudioGraph::realtime(100, 4);
        let a = g.create_channel(1.0, 0.0);
        let src = g.create_source(dc(1.0, 4, 100));
        assert_eq!(g.connect(a, src), Err(GraphError::NoInput(NodeKind::Source)));
    }

    #[test]
    fn test_cancelled_render_yields_nothing() {
        let mut g = AudioGraph::offline(1000, 100, 10);
        assert_eq!(g.start_rendering(&|| true).unwrap(), None);
        assert_eq!(g.start_rendering(&|| false), Err(GraphError::AlreadyRendered));
    }

    #[test]
    fn test_realtime_process_advances_clock() {
        let mut g = AudioGraph::realtime(100, 16);
        let src = g.create_source(dc(0.5, 100, 100));
        g.connect_to_destination(src).unwrap();
        g.start_source(src, 0.5).unwrap();
        let mut l = vec![0.0; 50];
        let mut r = vec![0.0; 50];
        g.process(&mut l, &mut r);
        assert!(l.iter().all(|&s| s == 0.5));
        assert!((g.current_time() - 0.5).abs() < 1e-12);
        // Offset 0.5 s into a 1 s buffer: the next block runs out.
        g.process(&mut l, &mut r);
        assert!(l.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_half_rate_source_plays_twice_as_long() {
        let mut g = AudioGraph::offline(8, 100, 8);
        let src = g.create_source(dc(1.0, 4, 50));
        g.connect_to_destination(src).unwrap();
        g.start_source(src, 0.0).unwrap();
        let out = g.start_rendering(&|| false).unwrap().unwrap();
        assert!(out.left.iter().all(|&s| s == 1.0));
    }

    #[test]
    fn test_reset_effect_cuts_delay_tail() {
        let mut g = AudioGraph::realtime(100, 10);
        let src = g.create_source(dc(1.0, 1, 100));
        let mut fx = EffectSet::default();
        fx.delay.time = 0.2;
        fx.delay.wet = 1.0;
        let delay = g.create_effect(EffectKind::Delay, &fx);
        g.connect(src, delay).unwrap();
        g.connect_to_destination(delay).unwrap();
        g.start_source(src, 0.0).unwrap();

        let mut l = vec![0.0; 10];
        let mut r = vec![0.0; 10];
        g.process(&mut l, &mut r);
        g.reset_effect(delay).unwrap();
        let mut rest_l = vec![0.0; 30];
        let mut rest_r = vec![0.0; 30];
        g.process(&mut rest_l, &mut rest_r);
        assert!(rest_l.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_reset_effect_rejects_non_effects() {
        let mut g = AudioGraph::realtime(100, 4);
        let ch = g.create_channel(1.0, 0.0);
        assert_eq!(g.reset_effect(ch), Err(GraphError::WrongKind(ch, NodeKind::Channel)));
    }

    #[test]
    fn test_zero_delay_passes_impulse_through() {
        let mut g = AudioGraph::offline(400, 100, 50).with_max_delay(2.0);
        assert_eq!(g.max_delay_secs(), 2.0);
        let src = g.create_source(dc(1.0, 1, 100));
        let mut fx = EffectSet::default();
        fx.delay.time = 0.0;
        fx.delay.wet = 1.0;
        let delay = g.create_effect(EffectKind::Delay, &fx);
        g.connect(src, delay).unwrap();
        g.connect_to_destination(delay).unwrap();
        g.start_source(src, 0.0).unwrap();
        let out = g.start_rendering(&|| false).unwrap().unwrap();
        assert_eq!(out.left[0], 1.0);
        assert!(out.left[1..].iter().all(|&s| s == 0.0));
    }
}
