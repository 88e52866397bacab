//! Track data model — the per-track state owned by the mix session.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::effects::EffectSet;

pub const MIN_VOLUME_DB: f64 = -60.0;
pub const MAX_VOLUME_DB: f64 = 6.0;

/// Identifier of a track, as assigned by the project layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        TrackId(s.to_string())
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        TrackId(s)
    }
}

/// What produced the track's source audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Vocal,
    Instrumental,
    Mixed,
}

/// One track of the mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    pub source_kind: SourceKind,
    pub source_url: String,
    /// Fader level in dB, −60..+6.
    #[serde(default)]
    pub volume_db: f64,
    /// Stereo position, −1 (left) .. +1 (right).
    #[serde(default)]
    pub pan: f64,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub soloed: bool,
    #[serde(default)]
    pub effects: EffectSet,
}

impl Track {
    /// A track at unity gain, centered, with all effects disabled.
    pub fn new(
        id: impl Into<TrackId>,
        name: impl Into<String>,
        source_kind: SourceKind,
        source_url: impl Into<String>,
    ) -> Self {
        Track {
            id: id.into(),
            name: name.into(),
            source_kind,
            source_url: source_url.into(),
            volume_db: 0.0,
            pan: 0.0,
            muted: false,
            soloed: false,
            effects: EffectSet::default(),
        }
    }
}

/// Clamp a fader value to the track range. NaN maps to silence.
pub fn clamp_volume_db(db: f64) -> f64 {
    if db.is_nan() {
        MIN_VOLUME_DB
    } else {
        db.clamp(MIN_VOLUME_DB, MAX_VOLUME_DB)
    }
}

/// Clamp a pan value to −1..1. NaN maps to center.
pub fn clamp_pan(pan: f64) -> f64 {
    if pan.is_nan() { 0.0 } else { pan.clamp(-1.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_json_uses_camel_case() {
        let t = Track::new("t1", "Lead", SourceKind::Vocal, "https://cdn/v.wav");
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["id"], "t1");
        assert_eq!(json["sourceKind"], "vocal");
        assert_eq!(json["volumeDb"], 0.0);
        assert_eq!(json["effects"]["reverb"]["enabled"], false);
    }

    #[test]
    fn test_minimal_track_json_gets_defaults() {
        let t: Track = serde_json::from_str(
            r#"{ "id": "v", "name": "Vocals", "sourceKind": "vocal", "sourceUrl": "blob:1" }"#,
        )
        .unwrap();
        assert_eq!(t, Track::new("v", "Vocals", SourceKind::Vocal, "blob:1"));
    }

    #[test]
    fn test_clamps() {
        assert_eq!(clamp_volume_db(12.0), 6.0);
        assert_eq!(clamp_volume_db(-100.0), -60.0);
        assert_eq!(clamp_volume_db(f64::NAN), -60.0);
        assert_eq!(clamp_pan(-3.0), -1.0);
        assert_eq!(clamp_pan(f64::NAN), 0.0);
    }
}
