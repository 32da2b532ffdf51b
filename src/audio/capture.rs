//! Microphone capture adapter.
//!
//! [`CaptureDevice`] abstracts the platform microphone so the session runner
//! can be tested without audio hardware.  [`CpalCapture`] is the production
//! implementation built on `cpal`; acquiring it starts a dedicated capture
//! thread that appends [`AudioChunk`]s to a shared [`ChunkBuffer`].  The
//! returned [`CaptureHandle`] is a RAII guard — dropping it stops the stream
//! and releases the device.

use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;

use super::encode::AudioEncoding;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the capture callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000, 16000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// ChunkBuffer
// ---------------------------------------------------------------------------

/// Ordered accumulation buffer for one recording session.
///
/// Append-only while the capture handle is alive; drained exactly once when
/// the session stops.  Every session gets a fresh buffer, so chunks from two
/// sessions can never mix.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<AudioChunk>,
}

impl ChunkBuffer {
    pub fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Append a chunk in arrival order.
    pub fn push(&mut self, chunk: AudioChunk) {
        self.chunks.push(chunk);
    }

    /// Take all accumulated chunks, leaving the buffer empty.
    pub fn drain(&mut self) -> Vec<AudioChunk> {
        std::mem::take(&mut self.chunks)
    }

    /// Number of chunks currently stored.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Thread-safe chunk buffer shared between the capture thread and the
/// session runner.
pub type ChunkSink = Arc<Mutex<ChunkBuffer>>;

/// Construct a fresh, empty [`ChunkSink`].
pub fn new_chunk_sink() -> ChunkSink {
    Arc::new(Mutex::new(ChunkBuffer::new()))
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while probing, acquiring, or running the capture
/// device.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("no supported audio encoding is available for this device")]
    NoSupportedEncoding,

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// The capture thread could not be started or died during setup.
    #[error("capture thread failed: {0}")]
    Thread(String),
}

// ---------------------------------------------------------------------------
// CaptureDevice / CaptureHandle traits
// ---------------------------------------------------------------------------

/// RAII guard for an acquired capture device.
///
/// Dropping the handle stops the stream and releases the device.  Exactly one
/// handle exists per session; the session runner owns it for the duration of
/// the `Recording` phase.
pub trait CaptureHandle: Send {}

/// Abstraction over the platform microphone.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn CaptureDevice>`.
pub trait CaptureDevice: Send + Sync {
    /// Payload encodings the captured audio can be rendered into, in no
    /// particular order.  The session runner intersects this with the
    /// encoder's preference list before acquiring the device.
    fn supported_encodings(&self) -> Vec<AudioEncoding>;

    /// Exclusively acquire the device.  Chunks are appended to `sink` for as
    /// long as the returned handle lives.
    fn acquire(&self, sink: ChunkSink) -> Result<Box<dyn CaptureHandle>, CaptureError>;
}

// ---------------------------------------------------------------------------
// CpalCapture
// ---------------------------------------------------------------------------

/// Production capture device built on `cpal`.
///
/// `cpal::Stream` is not `Send`, so the stream is confined to a dedicated
/// capture thread.  [`CaptureDevice::acquire`] blocks until the thread has
/// either started the stream or failed; the returned handle signals the
/// thread to stop on drop and joins it, guaranteeing that no chunk arrives
/// after release.
pub struct CpalCapture;

impl CpalCapture {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CpalCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for CpalCapture {
    fn supported_encodings(&self) -> Vec<AudioEncoding> {
        // cpal delivers f32 PCM, which can always be rendered as either WAV
        // flavour the encoder knows.
        vec![AudioEncoding::WavPcm16, AudioEncoding::WavFloat32]
    }

    fn acquire(&self, sink: ChunkSink) -> Result<Box<dyn CaptureHandle>, CaptureError> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), CaptureError>>();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();

        let thread = std::thread::Builder::new()
            .name("audio-capture".into())
            .spawn(move || {
                let setup = (|| -> Result<cpal::Stream, CaptureError> {
                    let host = cpal::default_host();
                    let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

                    let supported = device.default_input_config()?;
                    let sample_rate = supported.sample_rate().0;
                    let channels = supported.channels();
                    let config: cpal::StreamConfig = supported.into();

                    let stream = device.build_input_stream(
                        &config,
                        move |data: &[f32], _: &cpal::InputCallbackInfo| {
                            let chunk = AudioChunk {
                                samples: data.to_vec(),
                                sample_rate,
                                channels,
                            };
                            // Ignore a poisoned sink; the audio thread must
                            // never panic.
                            if let Ok(mut buf) = sink.lock() {
                                buf.push(chunk);
                            }
                        },
                        |err: cpal::StreamError| {
                            log::error!("cpal stream error: {err}");
                        },
                        None, // no timeout
                    )?;

                    stream.play()?;
                    Ok(stream)
                })();

                match setup {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        // Block until the handle is dropped, then stop the
                        // stream by dropping it on this thread.
                        let _ = stop_rx.recv();
                        drop(stream);
                        log::debug!("audio-capture thread: stream released");
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| CaptureError::Thread(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|e| CaptureError::Thread(e.to_string()))??;

        Ok(Box::new(CpalHandle {
            stop_tx,
            thread: Some(thread),
        }))
    }
}

/// Handle for a live [`CpalCapture`] stream.
struct CpalHandle {
    stop_tx: std::sync::mpsc::Sender<()>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl CaptureHandle for CpalHandle {}

impl Drop for CpalHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        // Join so the stream is fully stopped before the session moves on to
        // encoding — no partial chunk may arrive after release.
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

// ---------------------------------------------------------------------------
// MockCaptureDevice (test double)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::MockCaptureDevice;


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
