//! End-to-end: drive a session through the UI command surface and export it.

use std::io::Cursor;

use mixdown_core::asset::DecodedAudio;
use mixdown_core::error::AssetLoadErrorKind;
use mixdown_core::transport::ManualClock;
use mixdown_core::wav::WAV_HEADER_LEN;
use mixdown_core::{
    AssetLoadError, EffectKind, EngineConfig, MixError, MixEvent, MixSession, SourceKind, Track, TrackId,
    TransportState, export_mix_blocking,
};

const SR: u32 = 200;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn session() -> (MixSession, ManualClock) {
    init_logging();
    let clock = ManualClock::new(0.0);
    let config = EngineConfig::from_json(&format!(r#"{{ "sampleRate": {SR}, "blockSize": 50 }}"#)).unwrap();
    let session = MixSession::with_clock(config, Box::new(clock.clone())).unwrap();
    (session, clock)
}

fn dc(secs: f64, value: f32) -> Result<DecodedAudio, AssetLoadError> {
    Ok(DecodedAudio::from_mono(vec![value; (secs * SR as f64) as usize], SR))
}

fn add(session: &mut MixSession, id: &str, kind: SourceKind, audio: Result<DecodedAudio, AssetLoadError>) -> TrackId {
    let track = Track::new(id, id.to_uppercase(), kind, format!("https://cdn.example/{id}.wav"));
    session.add_track(track, audio).unwrap();
    TrackId::from(id)
}

fn decode(wav: &[u8]) -> (hound::WavSpec, Vec<i16>) {
    let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
    let spec = reader.spec();
    let samples = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
    (spec, samples)
}

#[test]
fn test_export_length_matches_longest_track() {
    let (mut s, _) = session();
    add(&mut s, "vocal", SourceKind::Vocal, dc(30.0, 0.1));
    add(&mut s, "inst", SourceKind::Instrumental, dc(45.0, 0.1));
    add(&mut s, "mix", SourceKind::Mixed, dc(20.0, 0.1));

    let export = export_mix_blocking(&s.snapshot(), s.config(), &|| false).unwrap();
    let (spec, samples) = decode(&export.wav);
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, SR);
    assert_eq!(samples.len(), 45 * SR as usize * 2);

    // Past 30 s only the instrumental remains.
    let frame = 40 * SR as usize;
    let expected = (0.1f32 * 32767.0) as i16;
    assert!((samples[frame * 2] - expected).abs() <= 1);
}

#[test]
fn test_export_with_one_bad_source_reports_exactly_one_failure() {
    let (mut s, _) = session();
    add(&mut s, "a", SourceKind::Vocal, dc(2.0, 0.2));
    let bad = AssetLoadError::new("https://cdn.example/b.wav", AssetLoadErrorKind::Fetch, "HTTP 404");
    add(&mut s, "b", SourceKind::Instrumental, Err(bad));
    add(&mut s, "c", SourceKind::Mixed, dc(2.0, 0.2));

    let events = s.drain_events();
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], MixEvent::AssetLoadFailed { track_id, .. } if track_id.0 == "b"));

    let export = export_mix_blocking(&s.snapshot(), s.config(), &|| false).unwrap();
    assert_eq!(export.failures.len(), 1);
    assert_eq!(export.failures[0].track_id, TrackId::from("b"));

    let (_, samples) = decode(&export.wav);
    let expected = (0.4f32 * 32767.0) as i16;
    assert!((samples[100] - expected).abs() <= 1);
}

#[test]
fn test_export_of_fully_muted_session_fails() {
    let (mut s, _) = session();
    let a = add(&mut s, "a", SourceKind::Vocal, dc(1.0, 0.2));
    s.toggle_mute(&a).unwrap();
    assert!(matches!(
        export_mix_blocking(&s.snapshot(), s.config(), &|| false),
        Err(MixError::NoRenderableTracks)
    ));
}

#[test]
fn test_transport_keeps_tracks_aligned() {
    let (mut s, clock) = session();
    let ids: Vec<TrackId> = ["a", "b", "c"]
        .iter()
        .map(|id| add(&mut s, id, SourceKind::Mixed, dc(30.0, 0.1)))
        .collect();

    clock.set(5.0);
    assert_eq!(s.seek(10.0), 10.0);
    s.play().unwrap();
    clock.advance(2.0);
    for id in &ids {
        assert_eq!(s.track_position(id).unwrap(), 12.0);
    }

    s.pause().unwrap();
    clock.advance(10.0);
    assert_eq!(s.current_time(), 12.0);
    assert_eq!(s.transport_state(), TransportState::Paused);

    s.stop();
    assert_eq!(s.current_time(), 0.0);
    assert!(matches!(s.pause(), Err(MixError::InvalidTransition { .. })));
}

#[test]
fn test_effect_toggles_reach_the_live_chain_and_the_export() {
    let (mut s, _) = session();
    let a = add(&mut s, "a", SourceKind::Vocal, dc(1.0, 0.3));
    add(&mut s, "pad", SourceKind::Instrumental, dc(2.0, 0.0));

    s.toggle_effect(&a, EffectKind::Reverb).unwrap();
    s.toggle_effect(&a, EffectKind::Eq).unwrap();
    assert_eq!(s.active_chain(&a).unwrap(), vec![EffectKind::Eq, EffectKind::Reverb]);
    s.toggle_effect(&a, EffectKind::Eq).unwrap();
    assert_eq!(s.active_chain(&a).unwrap(), vec![EffectKind::Reverb]);
    s.update_effect_param(&a, EffectKind::Reverb, "wet", 1.0).unwrap();

    let export = export_mix_blocking(&s.snapshot(), s.config(), &|| false).unwrap();
    let (_, samples) = decode(&export.wav);
    // The reverb tail rings on after the one-second source ends.
    let tail = &samples[(SR as usize + 10) * 2..(SR as usize * 3 / 2) * 2];
    assert!(tail.iter().any(|&v| v != 0));
}

#[test]
fn test_solo_mute_commands_shape_the_export() {
    let (mut s, _) = session();
    let a = add(&mut s, "a", SourceKind::Vocal, dc(1.0, 0.1));
    let b = add(&mut s, "b", SourceKind::Instrumental, dc(1.0, 0.3));
    add(&mut s, "c", SourceKind::Mixed, dc(1.0, 0.5));

    s.toggle_solo(&a).unwrap();
    s.toggle_solo(&b).unwrap();
    s.toggle_mute(&b).unwrap();

    let export = export_mix_blocking(&s.snapshot(), s.config(), &|| false).unwrap();
    let (_, samples) = decode(&export.wav);
    let expected = (0.1f32 * 32767.0) as i16;
    assert!((samples[20] - expected).abs() <= 1);

    let state = s.state();
    let audible: Vec<bool> = state.tracks.iter().map(|t| t.audible).collect();
    assert_eq!(audible, vec![true, false, false]);
    assert_eq!(state.tracks[1].track.volume_db, 0.0);
}

#[test]
fn test_removing_tracks_shrinks_the_mix() {
    let (mut s, _) = session();
    add(&mut s, "short", SourceKind::Vocal, dc(1.0, 0.1));
    let long = add(&mut s, "long", SourceKind::Instrumental, dc(3.0, 0.1));
    assert_eq!(s.duration_secs(), 3.0);

    let removed = s.remove_track(&long).unwrap();
    assert_eq!(removed.id, long);
    assert_eq!(s.duration_secs(), 1.0);
    assert!(matches!(s.remove_track(&long), Err(MixError::UnknownTrack(_))));

    let export = export_mix_blocking(&s.snapshot(), s.config(), &|| false).unwrap();
    assert_eq!(export.wav.len(), WAV_HEADER_LEN + SR as usize * 4);
}

#[test]
fn test_live_playback_runs_to_the_end() {
    let (mut s, clock) = session();
    add(&mut s, "a", SourceKind::Mixed, dc(1.0, 0.25));
    s.play().unwrap();

    let mut left = vec![0.0; 100];
    let mut right = vec![0.0; 100];
    s.process(&mut left, &mut right);
    assert!(left[99] > 0.2);

    clock.advance(1.5);
    assert_eq!(s.tick(), 0.0);
    assert!(!s.is_playing());
    assert_eq!(s.drain_events(), vec![MixEvent::PlaybackEnded]);
}
