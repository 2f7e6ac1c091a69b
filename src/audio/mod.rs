//! audio - Duplex capture/encode and decode/playback pipelines
//!
//! Uses ALSA for audio I/O and Opus for encoding/decoding. All frame
//! buffers are allocated once up front; the steady-state frame loop only
//! converts, codes and moves samples between them.

mod alsa_device;
mod audio_system;
mod buffers;
mod capture;
mod codec;
mod convert;
mod decoder;
mod device;
mod encoder;
mod error;
mod opus_codec;
mod pipeline;
mod playback;

pub use alsa_device::{AlsaCapture, AlsaPlayback, DeviceConfig};
pub use audio_system::{AudioConfig, AudioSystem};
pub use buffers::{
    BufferManager, CompressedFrame, FrameBuffers, FrameFormat, MAX_PACKET_BYTES, PcmFrame, RawFrame,
    ReceiveBuffers, SendBuffers,
};
pub use capture::CaptureAdapter;
pub use codec::{Application, EncoderSettings, FrameDecoder, FrameEncoder, SignalHint};
pub use convert::{GainShift, downconvert, upconvert};
pub use decoder::DecoderPipeline;
pub use device::{CaptureDevice, PlaybackDevice, WaitPolicy};
pub use encoder::EncoderPipeline;
pub use error::AudioError;
pub use opus_codec::{OpusDecoder, OpusEncoder};
pub use pipeline::{
    CycleOutcome, DecodeFailurePolicy, PipelineState, PipelineStats, ReceivePipeline, SendPipeline,
};
pub use playback::PlaybackAdapter;
