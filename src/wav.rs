//! WAV encoder — planar float channels to a canonical 16-bit PCM RIFF file.
//!
//! Samples are hard-clipped to [-1, 1] before quantizing. That clipping is
//! lossy on purpose: a hot mix comes out clipped, it is never rescaled.
//! Quantization is asymmetric (`v * 32768` below zero, `v * 32767` above)
//! and truncates toward zero, so the same input always yields the same bytes.

use crate::error::MixError;
use crate::render::RenderedMix;

pub const WAV_HEADER_LEN: usize = 44;

/// Quantize one float sample to signed 16-bit.
#[inline]
pub fn quantize_i16(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let v = sample.clamp(-1.0, 1.0);
    if v < 0.0 {
        (v * 32768.0) as i16
    } else {
        (v * 32767.0) as i16
    }
}

/// Encode planar channels (all the same length) as an interleaved WAV file.
/// Only `bit_depth == 16` is supported.
pub fn encode_wav(channels: &[&[f32]], sample_rate: u32, bit_depth: u16) -> Result<Vec<u8>, MixError> {
    if bit_depth != 16 {
        return Err(MixError::UnsupportedBitDepth(bit_depth));
    }
    let Some(first) = channels.first() else {
        return Err(MixError::MalformedBuffer("no channels".into()));
    };
    if sample_rate == 0 {
        return Err(MixError::MalformedBuffer("sample rate is zero".into()));
    }
    let frames = first.len();
    if let Some(bad) = channels.iter().position(|c| c.len() != frames) {
        return Err(MixError::MalformedBuffer(format!(
            "channel {bad} has {} frames, channel 0 has {frames}",
            channels[bad].len()
        )));
    }
    let num_channels = u16::try_from(channels.len())
        .map_err(|_| MixError::MalformedBuffer(format!("{} channels", channels.len())))?;

    let bytes_per_sample = bit_depth / 8;
    let byte_rate = sample_rate * num_channels as u32 * bytes_per_sample as u32;
    let block_align = num_channels * bytes_per_sample;
    let data_size = u32::try_from(frames * block_align as usize)
        .ok()
        .filter(|size| *size <= u32::MAX - 36)
        .ok_or_else(|| MixError::MalformedBuffer(format!("{frames} frames do not fit a RIFF file")))?;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(WAV_HEADER_LEN + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bit_depth.to_le_bytes());

    // data chunk, interleaved
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for i in 0..frames {
        for channel in channels {
            buf.extend_from_slice(&quantize_i16(channel[i]).to_le_bytes());
        }
    }

    Ok(buf)
}

/// Encode a finished render.
pub fn encode_mix(mix: &RenderedMix, bit_depth: u16) -> Result<Vec<u8>, MixError> {
    encode_wav(&mix.channels(), mix.sample_rate, bit_depth)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn u16_at(b: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([b[at], b[at + 1]])
    }

    fn u32_at(b: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
    }

    #[test]
    fn test_header_fields() {
        let l = [0.0f32; 10];
        let r = [0.0f32; 10];
        let wav = encode_wav(&[&l, &r], 44100, 16).unwrap();

        assert_eq!(wav.len(), WAV_HEADER_LEN + 10 * 4);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(u32_at(&wav, 4), 36 + 40);
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(u32_at(&wav, 16), 16);
        assert_eq!(u16_at(&wav, 20), 1);
        assert_eq!(u16_at(&wav, 22), 2);
        assert_eq!(u32_at(&wav, 24), 44100);
        assert_eq!(u32_at(&wav, 28), 44100 * 4);
        assert_eq!(u16_at(&wav, 32), 4);
        assert_eq!(u16_at(&wav, 34), 16);
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(u32_at(&wav, 40), 40);
    }

    #[test]
    fn test_clipping_saturates_instead_of_wrapping() {
        assert_eq!(quantize_i16(1.5), 32767);
        assert_eq!(quantize_i16(-1.5), -32768);
        assert_eq!(quantize_i16(1.0), 32767);
        assert_eq!(quantize_i16(-1.0), -32768);
        assert_eq!(quantize_i16(f32::NAN), 0);
    }

    #[test]
    fn test_quantization_truncates() {
        // 0.5 * 32767 = 16383.5, -0.5 * 32768 = -16384
        assert_eq!(quantize_i16(0.5), 16383);
        assert_eq!(quantize_i16(-0.5), -16384);
        assert_eq!(quantize_i16(1e-6), 0);
    }

    #[test]
    fn test_interleaves_left_right() {
        let wav = encode_wav(&[&[1.0, 0.0], &[-1.0, 0.5]], 8000, 16).unwrap();
        let data: Vec<i16> = wav[WAV_HEADER_LEN..]
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();
        assert_eq!(data, vec![32767, -32768, 0, 16383]);
    }

    #[test]
    fn test_round_trips_through_hound_within_one_lsb() {
        let left: Vec<f32> = (0..200).map(|i| ((i as f32) * 0.07).sin() * 0.9).collect();
        let right: Vec<f32> = left.iter().map(|v| -v * 0.5).collect();
        let wav = encode_wav(&[&left, &right], 22050, 16).unwrap();

        let reader = hound::WavReader::new(Cursor::new(wav)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.bits_per_sample, 16);

        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 400);
        let decode = |s: i16| if s < 0 { s as f32 / 32768.0 } else { s as f32 / 32767.0 };
        let lsb = 1.0 / 32767.0 + 1e-6;
        for (i, pair) in samples.chunks_exact(2).enumerate() {
            assert!((decode(pair[0]) - left[i]).abs() <= lsb);
            assert!((decode(pair[1]) - right[i]).abs() <= lsb);
        }
    }

    #[test]
    fn test_output_is_deterministic() {
        let l: Vec<f32> = (0..64).map(|i| i as f32 / 64.0 - 0.5).collect();
        let a = encode_wav(&[&l, &l], 48000, 16).unwrap();
        let b = encode_wav(&[&l, &l], 48000, 16).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(matches!(encode_wav(&[], 44100, 16), Err(MixError::MalformedBuffer(_))));
        assert!(matches!(
            encode_wav(&[&[0.0, 0.0], &[0.0]], 44100, 16),
            Err(MixError::MalformedBuffer(_))
        ));
        assert!(matches!(
            encode_wav(&[&[0.0]], 44100, 24),
            Err(MixError::UnsupportedBitDepth(24))
        ));
    }

    #[test]
    fn test_encodes_rendered_mix() {
        let mix = RenderedMix {
            left: vec![0.25; 8],
            right: vec![-0.25; 8],
            sample_rate: 1000,
        };
        let wav = encode_mix(&mix, 16).unwrap();
        assert_eq!(wav.len(), WAV_HEADER_LEN + 32);
        assert_eq!(u32_at(&wav, 24), 1000);
    }
}
