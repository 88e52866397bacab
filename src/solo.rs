//! Solo/mute resolution.
//!
//! Audibility is a pure function of the current mute/solo flags: it keeps no
//! history, so un-soloing the last soloed track falls straight back to each
//! track's own mute state.

use std::collections::BTreeMap;

use crate::track::{Track, TrackId};

/// Whether one track is heard, given whether any track is soloed.
#[inline]
pub fn is_audible(muted: bool, soloed: bool, any_soloed: bool) -> bool {
    if any_soloed {
        soloed && !muted
    } else {
        !muted
    }
}

/// The audible flag of every track, keyed by id.
pub type AudibleSet = BTreeMap<TrackId, bool>;

/// Resolve audibility for a set of tracks.
pub fn resolve_audibility<'a, I>(tracks: I) -> AudibleSet
where
    I: IntoIterator<Item = &'a Track>,
    I::IntoIter: Clone,
{
    let tracks = tracks.into_iter();
    let any_soloed = tracks.clone().any(|t| t.soloed);
    tracks
        .map(|t| (t.id.clone(), is_audible(t.muted, t.soloed, any_soloed)))
        .collect()
}
