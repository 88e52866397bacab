pub mod asset;
pub mod config;
pub mod dsp;
pub mod effects;
pub mod error;
pub mod export;
pub mod graph;
pub mod render;
pub mod session;
pub mod solo;
pub mod strip;
pub mod track;
pub mod transport;
pub mod wasm;
pub mod wav;

pub use crate::config::EngineConfig;
pub use crate::effects::{EffectKind, EffectParam, EffectSet, compute_chain_order};
pub use crate::error::{AssetLoadError, MixError, RenderFailure};
pub use crate::export::{MixExport, export_mix_blocking};
pub use crate::render::{MixSnapshot, RenderedMix, render_offline};
pub use crate::session::{MixEvent, MixSession, MixState};
pub use crate::track::{SourceKind, Track, TrackId};
pub use crate::transport::TransportState;
pub use crate::wav::encode_wav;

#[cfg(feature = "native")]
pub use crate::export::Exporter;

use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the mixdown-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: encode planar stereo samples as a 16-bit WAV byte array.
#[wasm_bindgen]
pub fn encode_stereo_wav(left: &[f32], right: &[f32], sample_rate: u32) -> Result<Vec<u8>, JsValue> {
    wav::encode_wav(&[left, right], sample_rate, 16).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: the fixed-order effect chain for a set of enable flags,
/// as effect names.
#[wasm_bindgen]
pub fn chain_order(eq: bool, compressor: bool, reverb: bool, delay: bool) -> Vec<String> {
    compute_chain_order(effects::EnabledFlags {
        eq,
        compressor,
        reverb,
        delay,
    })
    .into_iter()
    .map(|k| k.name().to_string())
    .collect()
}
