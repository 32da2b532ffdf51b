//! Audio capture and encoding.
//!
//! * [`CaptureDevice`] / [`CaptureHandle`] — microphone abstraction with RAII
//!   release; [`CpalCapture`] is the production implementation.
//! * [`ChunkBuffer`] — per-session accumulation of raw [`AudioChunk`]s.
//! * [`encode_chunks`] — chunks → `data:<mime>;base64,<payload>` string,
//!   with the [`AudioEncoding`] chosen via [`choose_encoding`] from the
//!   device's supported-type probe.

pub mod capture;
pub mod encode;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use capture::{
    new_chunk_sink, AudioChunk, CaptureDevice, CaptureError, CaptureHandle, ChunkBuffer, ChunkSink,
    CpalCapture,
};
pub use encode::{choose_encoding, encode_chunks, AudioEncoding, EncodeError};

// test-only re-export so the session tests can import MockCaptureDevice
// without `use pronounce_coach::audio::capture::MockCaptureDevice`.
#[cfg(test)]
pub use capture::MockCaptureDevice;
