use std::fmt;

use thiserror::Error;

use crate::effects::EffectKind;
use crate::graph::GraphError;
use crate::track::TrackId;

/// Top-level error type for mixer commands, rendering and export.
#[derive(Debug, Error)]
pub enum MixError {
    #[error(transparent)]
    AssetLoad(#[from] AssetLoadError),

    #[error("effect chain for track {track_id} could not be rebuilt: {reason}")]
    ChainRebuild { track_id: TrackId, reason: String },

    #[error("no audible, successfully loaded tracks to render")]
    NoRenderableTracks,

    #[error("render was superseded by a newer export")]
    RenderCancelled,

    #[error("export task failed: {0}")]
    ExportTask(String),

    #[error("malformed audio buffer: {0}")]
    MalformedBuffer(String),

    #[error("unsupported bit depth {0} (only 16-bit PCM is supported)")]
    UnsupportedBitDepth(u16),

    #[error("unknown track {0}")]
    UnknownTrack(TrackId),

    #[error("track {0} already exists")]
    DuplicateTrack(TrackId),

    #[error("unknown parameter '{name}' for {kind} effect")]
    UnknownParam { kind: EffectKind, name: String },

    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: crate::transport::TransportState,
        action: &'static str,
    },

    #[error("audio graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Why a source asset could not be turned into a decoded buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetLoadErrorKind {
    Fetch,
    UnsupportedFormat,
    Decode,
    Empty,
}

impl fmt::Display for AssetLoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetLoadErrorKind::Fetch => write!(f, "fetch failed"),
            AssetLoadErrorKind::UnsupportedFormat => write!(f, "unsupported format"),
            AssetLoadErrorKind::Decode => write!(f, "decode failed"),
            AssetLoadErrorKind::Empty => write!(f, "no audio frames"),
        }
    }
}

/// A source URL that failed to fetch or decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not load '{url}': {kind}: {reason}")]
pub struct AssetLoadError {
    pub url: String,
    pub kind: AssetLoadErrorKind,
    pub reason: String,
}

impl AssetLoadError {
    pub fn new(url: impl Into<String>, kind: AssetLoadErrorKind, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind,
            reason: reason.into(),
        }
    }
}

/// A single track that could not contribute to an offline render.
///
/// Returned alongside a successful render, never as an `Err`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFailure {
    pub track_id: TrackId,
    pub reason: String,
}

impl fmt::Display for RenderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track {} skipped: {}", self.track_id, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_error_message_names_url_and_reason() {
        let e = AssetLoadError::new("https://x/a.wav", AssetLoadErrorKind::Decode, "bad header");
        let msg = MixError::from(e).to_string();
        assert!(msg.contains("https://x/a.wav"));
        assert!(msg.contains("decode failed"));
        assert!(msg.contains("bad header"));
    }

    #[test]
    fn test_render_failure_display() {
        let f = RenderFailure {
            track_id: TrackId::from("vox"),
            reason: "source not decoded".into(),
        };
        assert_eq!(f.to_string(), "track vox skipped: source not decoded");
    }
}
