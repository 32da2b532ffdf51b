//! Audio payload encoder — captured chunks → `data:<mime>;base64,<payload>`.
//!
//! The encoder is a pure, deterministic transformation: the accumulated
//! chunks of one session are written into a single WAV container in memory,
//! Base64-encoded, and tagged with their MIME type as a data URI.  The
//! concrete [`AudioEncoding`] is chosen before recording starts by
//! intersecting a fixed preference order (smaller payloads first) with the
//! capture device's supported-encoding probe.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hound::{SampleFormat, WavSpec, WavWriter};
use thiserror::Error;

use super::capture::AudioChunk;

// ---------------------------------------------------------------------------
// AudioEncoding
// ---------------------------------------------------------------------------

/// Payload encodings the encoder can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEncoding {
    /// 16-bit integer PCM WAV — half the size of the float variant.
    WavPcm16,
    /// 32-bit float PCM WAV — lossless with respect to the captured samples.
    WavFloat32,
}

impl AudioEncoding {
    /// Fixed preference order: smaller payloads first.
    pub const PREFERRED: [AudioEncoding; 2] = [AudioEncoding::WavPcm16, AudioEncoding::WavFloat32];

    /// MIME type used in the data URI.
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioEncoding::WavPcm16 | AudioEncoding::WavFloat32 => "audio/wav",
        }
    }
}

/// Pick the first preferred encoding the device supports.
///
/// Returns `None` when the intersection is empty — the caller must fail fast
/// before acquiring the device.
pub fn choose_encoding(supported: &[AudioEncoding]) -> Option<AudioEncoding> {
    AudioEncoding::PREFERRED
        .into_iter()
        .find(|enc| supported.contains(enc))
}

// ---------------------------------------------------------------------------
// EncodeError
// ---------------------------------------------------------------------------

/// Errors that can occur while encoding the captured audio.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The chunk buffer held no samples when encoding was attempted.
    #[error("no audio was captured")]
    EmptyBuffer,

    /// The WAV container could not be written.
    #[error("failed to write WAV data: {0}")]
    Wav(#[from] hound::Error),
}

// ---------------------------------------------------------------------------
// encode_chunks
// ---------------------------------------------------------------------------

/// Encode the chunks of one session into a `data:<mime>;base64,<payload>`
/// string.
///
/// The WAV header takes its sample rate and channel count from the first
/// chunk; all chunks of a session come from the same stream configuration.
/// Encoding the same chunk sequence twice yields the same string.
pub fn encode_chunks(chunks: &[AudioChunk], encoding: AudioEncoding) -> Result<String, EncodeError> {
    let total_samples: usize = chunks.iter().map(|c| c.samples.len()).sum();
    if total_samples == 0 {
        return Err(EncodeError::EmptyBuffer);
    }

    let first = &chunks[0];
    let spec = WavSpec {
        channels: first.channels,
        sample_rate: first.sample_rate,
        bits_per_sample: match encoding {
            AudioEncoding::WavPcm16 => 16,
            AudioEncoding::WavFloat32 => 32,
        },
        sample_format: match encoding {
            AudioEncoding::WavPcm16 => SampleFormat::Int,
            AudioEncoding::WavFloat32 => SampleFormat::Float,
        },
    };

    let mut cursor = Cursor::new(Vec::<u8>::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for chunk in chunks {
            for &sample in &chunk.samples {
                match encoding {
                    AudioEncoding::WavPcm16 => {
                        let clamped = sample.clamp(-1.0, 1.0);
                        writer.write_sample((clamped * i16::MAX as f32) as i16)?;
                    }
                    AudioEncoding::WavFloat32 => {
                        writer.write_sample(sample)?;
                    }
                }
            }
        }
        writer.finalize()?;
    }

    let bytes = cursor.into_inner();
    Ok(format!(
        "data:{};base64,{}",
        encoding.mime_type(),
        BASE64.encode(&bytes)
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
