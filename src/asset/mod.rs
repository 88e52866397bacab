//! Source assets — decoded sample buffers for attached tracks.
//!
//! Decoding is synchronous and works on raw bytes, so it is available to the
//! wasm build. Fetching from URLs lives in [`loader`] behind the `native`
//! feature.

use std::io::Cursor;

use crate::error::{AssetLoadError, AssetLoadErrorKind};

#[cfg(feature = "native")]
pub mod loader;

/// A decoded stereo buffer, planar f32 at the source's native rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn new(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Self {
        debug_assert_eq!(left.len(), right.len());
        Self {
            left,
            right,
            sample_rate,
        }
    }

    /// Duplicate a mono buffer into both channels.
    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            right: samples.clone(),
            left: samples,
            sample_rate,
        }
    }

    /// Split interleaved samples. Mono is duplicated; channels beyond the
    /// second are dropped.
    pub fn from_interleaved(samples: &[f32], channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels;
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for frame in samples.chunks_exact(channels) {
            left.push(frame[0]);
            right.push(if channels > 1 { frame[1] } else { frame[0] });
        }
        Self {
            left,
            right,
            sample_rate,
        }
    }

    /// A buffer of silence, mostly useful for tests and placeholders.
    pub fn silence(duration_secs: f64, sample_rate: u32) -> Self {
        let frames = (duration_secs * sample_rate as f64).round() as usize;
        Self::from_mono(vec![0.0; frames], sample_rate)
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }

    /// Read a frame with linear interpolation at a fractional position.
    /// Positions outside the buffer read as silence.
    #[inline]
    pub fn read_interpolated(&self, position: f64) -> (f32, f32) {
        let len = self.left.len();
        if len == 0 || position < 0.0 {
            return (0.0, 0.0);
        }

        let idx = position as usize;
        if idx >= len - 1 {
            return if idx < len {
                (self.left[idx], self.right[idx])
            } else {
                (0.0, 0.0)
            };
        }

        let frac = (position - idx as f64) as f32;
        (
            self.left[idx] * (1.0 - frac) + self.left[idx + 1] * frac,
            self.right[idx] * (1.0 - frac) + self.right[idx + 1] * frac,
        )
    }
}

/// Container formats the decoder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    /// Sniff the container from magic bytes, falling back to a file
    /// extension or MIME hint (`"wav"`, `"audio/mpeg"`, ...).
    pub fn detect(bytes: &[u8], hint: Option<&str>) -> Option<Self> {
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            return Some(AudioFormat::Wav);
        }
        if bytes.starts_with(b"ID3") || (bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0) {
            return Some(AudioFormat::Mp3);
        }
        let hint = hint?.to_ascii_lowercase();
        if hint.ends_with("wav") || hint.ends_with("wave") || hint.contains("audio/wav") {
            Some(AudioFormat::Wav)
        } else if hint.ends_with("mp3") || hint.contains("audio/mpeg") {
            Some(AudioFormat::Mp3)
        } else {
            None
        }
    }
}

/// Decode a WAV or MP3 byte stream. `url` is only used for error reports.
pub fn decode_audio(bytes: &[u8], url: &str, hint: Option<&str>) -> Result<DecodedAudio, AssetLoadError> {
    let format = AudioFormat::detect(bytes, hint).ok_or_else(|| {
        AssetLoadError::new(url, AssetLoadErrorKind::UnsupportedFormat, "not a WAV or MP3 stream")
    })?;

    let audio = match format {
        AudioFormat::Wav => decode_wav(bytes, url)?,
        AudioFormat::Mp3 => decode_mp3(bytes, url)?,
    };

    if audio.frames() == 0 || audio.sample_rate == 0 {
        return Err(AssetLoadError::new(url, AssetLoadErrorKind::Empty, "decoded zero frames"));
    }
    log::debug!(
        "decoded {url}: {:?}, {} frames @ {} Hz",
        format,
        audio.frames(),
        audio.sample_rate
    );
    Ok(audio)
}

fn decode_wav(bytes: &[u8], url: &str) -> Result<DecodedAudio, AssetLoadError> {
    let decode_err = |e: hound::Error| AssetLoadError::new(url, AssetLoadErrorKind::Decode, e.to_string());

    let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(decode_err)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(decode_err)?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample.clamp(1, 32) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .map_err(decode_err)?
        }
    };

    Ok(DecodedAudio::from_interleaved(
        &samples,
        spec.channels as usize,
        spec.sample_rate,
    ))
}

fn decode_mp3(bytes: &[u8], url: &str) -> Result<DecodedAudio, AssetLoadError> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate.max(0) as u32;
                }
                let channels = frame.channels.max(1);
                for chunk in frame.data.chunks_exact(channels) {
                    let l = chunk[0] as f32 / 32768.0;
                    let r = if channels > 1 { chunk[1] as f32 / 32768.0 } else { l };
                    left.push(l);
                    right.push(r);
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(minimp3::Error::SkippedData) => continue,
            Err(e) => {
                return Err(AssetLoadError::new(url, AssetLoadErrorKind::Decode, format!("{e:?}")));
            }
        }
    }

    Ok(DecodedAudio::new(left, right, sample_rate))
}
