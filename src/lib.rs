//! Duplex voice pipeline for embedded Linux.
//!
//! Microphone frames are captured over ALSA, narrowed to 16-bit PCM,
//! Opus-encoded and handed to a transport. Packets from the transport are
//! decoded, widened and played back. See [`audio`] for the pipelines.

pub mod audio;
pub mod audio_bridge;
pub mod config;
pub mod transport;

pub use audio::{AudioConfig, AudioError, AudioSystem};
pub use config::Config;
pub use transport::FrameSink;
