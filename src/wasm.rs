//! Browser bindings for the mixing console.
//!
//! The page fetches each source itself and hands the bytes over; an
//! AudioWorklet pulls the live mix through [`MixConsole::process`] and
//! reports the audio clock with [`MixConsole::set_time`].
//!
//! ```javascript
//! const mix = new MixConsole(JSON.stringify({ sampleRate: ctx.sampleRate }));
//! mix.add_track({ id: "vox", name: "Vocals", sourceKind: "vocal", sourceUrl }, bytes, "audio/wav");
//! mix.toggle_effect("vox", "reverb");
//! mix.set_time(ctx.currentTime);
//! mix.play();
//! const { dataUrl, failures } = mix.export_mix();
//! ```

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::asset::decode_audio;
use crate::config::EngineConfig;
use crate::effects::EffectKind;
use crate::error::{AssetLoadError, AssetLoadErrorKind, RenderFailure};
use crate::export::export_mix_blocking;
use crate::session::MixSession;
use crate::track::{Track, TrackId};
use crate::transport::ManualClock;

fn js_err(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn effect_kind(name: &str) -> Result<EffectKind, JsValue> {
    EffectKind::from_name(name).ok_or_else(|| js_err(format!("unknown effect '{name}'")))
}

/// Result of `export_mix`, handed to the "mix saved" callback.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportReport {
    data_url: String,
    failures: Vec<RenderFailure>,
    duration_secs: f64,
    sample_rate: u32,
}

/// A mix session driven by the page's audio clock.
#[wasm_bindgen]
pub struct MixConsole {
    session: MixSession,
    clock: ManualClock,
}

#[wasm_bindgen]
impl MixConsole {
    /// `config_json` is a partial `EngineConfig`; omitted fields use defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<MixConsole, JsValue> {
        let config = match config_json {
            Some(json) => EngineConfig::from_json(&json).map_err(js_err)?,
            None => EngineConfig::default(),
        };
        let clock = ManualClock::default();
        let session = MixSession::with_clock(config, Box::new(clock.clone())).map_err(js_err)?;
        Ok(MixConsole { session, clock })
    }

    /// Advance the transport clock (seconds, e.g. `AudioContext.currentTime`).
    pub fn set_time(&mut self, secs: f64) {
        self.clock.set(secs);
    }

    // ── Tracks ──────────────────────────────────────────────

    /// Attach a track from its encoded source bytes. A decode failure still
    /// adds the track, in the load-failed state, and queues an event.
    pub fn add_track(&mut self, track: JsValue, bytes: &[u8], hint: Option<String>) -> Result<(), JsValue> {
        let track: Track = serde_wasm_bindgen::from_value(track).map_err(js_err)?;
        let audio = decode_audio(bytes, &track.source_url, hint.as_deref());
        self.session.add_track(track, audio).map_err(js_err)
    }

    /// Attach a track whose source the page could not fetch.
    pub fn add_failed_track(&mut self, track: JsValue, reason: String) -> Result<(), JsValue> {
        let track: Track = serde_wasm_bindgen::from_value(track).map_err(js_err)?;
        let err = AssetLoadError::new(track.source_url.clone(), AssetLoadErrorKind::Fetch, reason);
        self.session.add_track(track, Err(err)).map_err(js_err)
    }

    pub fn reload_track(&mut self, id: &str, bytes: &[u8], hint: Option<String>) -> Result<(), JsValue> {
        let id = TrackId::from(id);
        let url = self.session.track(&id).map_err(js_err)?.source_url.clone();
        let audio = decode_audio(bytes, &url, hint.as_deref());
        self.session.reload_track(&id, audio).map_err(js_err)
    }

    pub fn remove_track(&mut self, id: &str) -> Result<(), JsValue> {
        self.session.remove_track(&TrackId::from(id)).map(|_| ()).map_err(js_err)
    }

    // ── Strip commands ──────────────────────────────────────

    pub fn set_track_volume(&mut self, id: &str, db: f64) -> Result<f64, JsValue> {
        self.session.set_track_volume(&TrackId::from(id), db).map_err(js_err)
    }

    pub fn set_track_pan(&mut self, id: &str, pan: f64) -> Result<f64, JsValue> {
        self.session.set_track_pan(&TrackId::from(id), pan).map_err(js_err)
    }

    pub fn toggle_mute(&mut self, id: &str) -> Result<bool, JsValue> {
        self.session.toggle_mute(&TrackId::from(id)).map_err(js_err)
    }

    pub fn toggle_solo(&mut self, id: &str) -> Result<bool, JsValue> {
        self.session.toggle_solo(&TrackId::from(id)).map_err(js_err)
    }

    /// `kind` is one of `eq`, `compressor`, `reverb`, `delay`.
    pub fn toggle_effect(&mut self, id: &str, kind: &str) -> Result<bool, JsValue> {
        let kind = effect_kind(kind)?;
        self.session.toggle_effect(&TrackId::from(id), kind).map_err(js_err)
    }

    pub fn update_effect_param(&mut self, id: &str, kind: &str, param: &str, value: f64) -> Result<f64, JsValue> {
        let kind = effect_kind(kind)?;
        self.session
            .update_effect_param(&TrackId::from(id), kind, param, value)
            .map_err(js_err)
    }

    /// Effects currently wired for a track, as names in signal order.
    pub fn active_chain(&self, id: &str) -> Result<Vec<String>, JsValue> {
        let chain = self.session.active_chain(&TrackId::from(id)).map_err(js_err)?;
        Ok(chain.into_iter().map(|k| k.name().to_string()).collect())
    }

    pub fn set_master_volume(&mut self, db: f64) -> Result<f64, JsValue> {
        self.session.set_master_volume(db).map_err(js_err)
    }

    // ── Transport ───────────────────────────────────────────

    pub fn play(&mut self) -> Result<(), JsValue> {
        self.session.play().map_err(js_err)
    }

    pub fn pause(&mut self) -> Result<(), JsValue> {
        self.session.pause().map_err(js_err)
    }

    pub fn stop(&mut self) {
        self.session.stop();
    }

    pub fn seek(&mut self, secs: f64) -> f64 {
        self.session.seek(secs)
    }

    /// Poll the playback position; handles end-of-mix.
    pub fn tick(&mut self) -> f64 {
        self.session.tick()
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    pub fn duration(&self) -> f64 {
        self.session.duration_secs()
    }

    /// Render the next block of the live mix.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.session.process(left, right);
    }

    // ── UI state ────────────────────────────────────────────

    /// The whole session as a plain object (camelCase fields).
    pub fn state(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.state()).map_err(js_err)
    }

    /// Queued events since the last call.
    pub fn drain_events(&mut self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.drain_events()).map_err(js_err)
    }

    // ── Export ──────────────────────────────────────────────

    /// Render and encode the mix as WAV bytes.
    pub fn export_wav(&self) -> Result<Vec<u8>, JsValue> {
        let export = export_mix_blocking(&self.session.snapshot(), self.session.config(), &|| false)
            .map_err(js_err)?;
        Ok(export.wav)
    }

    /// Render and encode the mix, returning `{ dataUrl, failures, durationSecs, sampleRate }`.
    pub fn export_mix(&self) -> Result<JsValue, JsValue> {
        let export = export_mix_blocking(&self.session.snapshot(), self.session.config(), &|| false)
            .map_err(js_err)?;
        let report = ExportReport {
            data_url: format!("data:audio/wav;base64,{}", BASE64.encode(&export.wav)),
            failures: export.failures,
            duration_secs: export.duration_secs,
            sample_rate: export.sample_rate,
        };
        serde_wasm_bindgen::to_value(&report).map_err(js_err)
    }
}
