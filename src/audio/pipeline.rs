//! The two direction pipelines and their shared state machine.
//!
//! - `SendPipeline`: capture → downconvert → encode → `FrameSink`
//! - `ReceivePipeline`: packet → decode → upconvert → playback
//!
//! Each pipeline owns its buffers, its codec instance and its hardware
//! adapter. The two never share anything, so each can be driven from its
//! own thread without locks.

use super::buffers::{FrameFormat, ReceiveBuffers, SendBuffers};
use super::capture::CaptureAdapter;
use super::codec::{EncoderSettings, FrameDecoder, FrameEncoder};
use super::decoder::DecoderPipeline;
use super::device::{CaptureDevice, PlaybackDevice};
use super::encoder::EncoderPipeline;
use super::error::AudioError;
use super::playback::PlaybackAdapter;
use crate::transport::FrameSink;

/// Lifecycle of one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Ready,
    Streaming,
    /// Terminal; the owner has to rebuild the pipeline.
    Error,
}

/// What happens to the receive buffers when a packet fails to decode.
///
/// A failed packet is never played either way; this only decides whether
/// the last good frame survives in the buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeFailurePolicy {
    /// Zero the decoded and playback buffers.
    #[default]
    ClearBuffers,
    /// Leave the last successfully decoded frame in place.
    PreserveLastGood,
}

impl std::str::FromStr for DecodeFailurePolicy {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clear" => Ok(DecodeFailurePolicy::ClearBuffers),
            "preserve" => Ok(DecodeFailurePolicy::PreserveLastGood),
            other => Err(AudioError::InvalidConfig(format!(
                "Unknown decode failure policy: {}",
                other
            ))),
        }
    }
}

/// Result of one successful frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A packet of this many bytes went to the transport.
    Sent(usize),
    /// The encoder produced nothing to send for this frame.
    Empty,
    /// This many samples were written to the hardware.
    Played(usize),
}

/// Per-direction counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames that made it all the way through.
    pub frames: u64,
    /// Frames lost to codec, framing or transport failures.
    pub dropped: u64,
    /// Hardware reads/writes that moved less than a full frame.
    pub short_io: u64,
}

/// Shared transition logic: runs one cycle from `Ready` and lands in
/// `Ready` or, on a fatal error, `Error`.
fn run_state<T>(
    state: &mut PipelineState,
    direction: &str,
    cycle: impl FnOnce() -> Result<T, AudioError>,
) -> Result<T, AudioError> {
    if *state != PipelineState::Ready {
        return Err(AudioError::NotReady(*state));
    }
    *state = PipelineState::Streaming;

    let result = cycle();
    *state = match &result {
        Err(e) if e.is_fatal() => {
            log::error!("{} pipeline stopped: {}", direction, e);
            PipelineState::Error
        }
        _ => PipelineState::Ready,
    };
    result
}

fn finish_init(state: &mut PipelineState, direction: &str, result: Result<(), AudioError>) -> Result<(), AudioError> {
    match result {
        Ok(()) => {
            *state = PipelineState::Ready;
            log::info!("{} pipeline ready", direction);
            Ok(())
        }
        Err(e) => {
            log::error!("{} pipeline init failed: {}", direction, e);
            *state = PipelineState::Error;
            Err(e)
        }
    }
}

/// Any failure while bringing up a codec counts as a codec init failure.
fn as_codec_init(e: AudioError) -> AudioError {
    match e {
        AudioError::CodecInit(_) => e,
        other => AudioError::CodecInit(other.to_string()),
    }
}

fn check_init_state(state: PipelineState) -> Result<(), AudioError> {
    match state {
        PipelineState::Uninitialized => Ok(()),
        PipelineState::Error => Err(AudioError::NotReady(state)),
        PipelineState::Ready | PipelineState::Streaming => Err(AudioError::AlreadyInitialized),
    }
}

// ======================== Send direction ========================

pub struct SendPipeline<D: CaptureDevice> {
    capture: CaptureAdapter<D>,
    encoder: EncoderPipeline,
    buffers: SendBuffers,
    state: PipelineState,
    stats: PipelineStats,
}

impl<D: CaptureDevice> SendPipeline<D> {
    pub fn new(capture: CaptureAdapter<D>, buffers: SendBuffers) -> Self {
        Self {
            capture,
            encoder: EncoderPipeline::new(),
            buffers,
            state: PipelineState::Uninitialized,
            stats: PipelineStats::default(),
        }
    }

    /// Clear the capture hardware and create the Opus encoder.
    pub fn initialize(&mut self, settings: &EncoderSettings) -> Result<(), AudioError> {
        self.initialize_inner(settings, None)
    }

    /// Like [`initialize`](Self::initialize) with a caller-supplied encoder.
    pub fn initialize_with(
        &mut self,
        settings: &EncoderSettings,
        encoder: Box<dyn FrameEncoder>,
    ) -> Result<(), AudioError> {
        self.initialize_inner(settings, Some(encoder))
    }

    fn initialize_inner(
        &mut self,
        settings: &EncoderSettings,
        encoder: Option<Box<dyn FrameEncoder>>,
    ) -> Result<(), AudioError> {
        check_init_state(self.state)?;
        let result = self.setup(settings, encoder);
        finish_init(&mut self.state, "Send", result)
    }

    fn setup(
        &mut self,
        settings: &EncoderSettings,
        encoder: Option<Box<dyn FrameEncoder>>,
    ) -> Result<(), AudioError> {
        if settings.format.frame_samples() != self.buffers.frame_samples() {
            return Err(AudioError::InvalidFrameSize {
                expected: self.buffers.frame_samples(),
                actual: settings.format.frame_samples(),
            });
        }
        if settings.max_packet_bytes > self.buffers.packet.capacity() {
            return Err(AudioError::InvalidConfig(format!(
                "Encoder capacity {} exceeds the {} byte packet buffer",
                settings.max_packet_bytes,
                self.buffers.packet.capacity()
            )));
        }

        self.capture
            .zero_buffer()
            .map_err(|e| AudioError::HardwareInit(e.to_string()))?;

        let result = match encoder {
            Some(encoder) => self.encoder.initialize_with(settings, encoder),
            None => self.encoder.initialize(settings),
        };
        result.map_err(as_codec_init)
    }

    /// Capture, encode and send one frame.
    ///
    /// A codec or transport failure drops this frame only and comes back
    /// as a non-fatal error; the next call proceeds normally.
    pub fn run_cycle(&mut self, sink: &mut dyn FrameSink) -> Result<CycleOutcome, AudioError> {
        let Self {
            capture,
            encoder,
            buffers,
            state,
            stats,
        } = self;

        run_state(state, "Send", || {
            let bytes = capture.capture_frame(&mut buffers.raw)?;
            if bytes < buffers.raw.len() * std::mem::size_of::<i32>() {
                stats.short_io += 1;
            }
            capture.downconvert(&buffers.raw, &mut buffers.pcm)?;

            if let Err(e) = encoder.encode(&buffers.pcm, &mut buffers.packet) {
                log::error!("Opus encode error: {}", e);
                stats.dropped += 1;
                return Err(e);
            }
            if buffers.packet.is_empty() {
                return Ok(CycleOutcome::Empty);
            }

            if let Err(e) = sink.send(buffers.packet.as_bytes()) {
                log::warn!("Failed to send audio frame: {}", e);
                stats.dropped += 1;
                return Err(e);
            }
            stats.frames += 1;
            Ok(CycleOutcome::Sent(buffers.packet.len()))
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn buffers(&self) -> &SendBuffers {
        &self.buffers
    }

    pub fn capture(&self) -> &CaptureAdapter<D> {
        &self.capture
    }
}

// ======================== Receive direction ========================

pub struct ReceivePipeline<D: PlaybackDevice> {
    decoder: DecoderPipeline,
    playback: PlaybackAdapter<D>,
    buffers: ReceiveBuffers,
    policy: DecodeFailurePolicy,
    state: PipelineState,
    stats: PipelineStats,
}

impl<D: PlaybackDevice> ReceivePipeline<D> {
    pub fn new(playback: PlaybackAdapter<D>, buffers: ReceiveBuffers, policy: DecodeFailurePolicy) -> Self {
        Self {
            decoder: DecoderPipeline::new(),
            playback,
            buffers,
            policy,
            state: PipelineState::Uninitialized,
            stats: PipelineStats::default(),
        }
    }

    /// Clear the playback hardware and create the Opus decoder.
    pub fn initialize(&mut self, format: FrameFormat) -> Result<(), AudioError> {
        self.initialize_inner(format, None)
    }

    /// Like [`initialize`](Self::initialize) with a caller-supplied decoder.
    pub fn initialize_with(&mut self, format: FrameFormat, decoder: Box<dyn FrameDecoder>) -> Result<(), AudioError> {
        self.initialize_inner(format, Some(decoder))
    }

    fn initialize_inner(
        &mut self,
        format: FrameFormat,
        decoder: Option<Box<dyn FrameDecoder>>,
    ) -> Result<(), AudioError> {
        check_init_state(self.state)?;
        let result = self.setup(format, decoder);
        finish_init(&mut self.state, "Receive", result)
    }

    fn setup(&mut self, format: FrameFormat, decoder: Option<Box<dyn FrameDecoder>>) -> Result<(), AudioError> {
        if format.frame_samples() != self.buffers.frame_samples() {
            return Err(AudioError::InvalidFrameSize {
                expected: self.buffers.frame_samples(),
                actual: format.frame_samples(),
            });
        }

        self.playback
            .zero_buffer()
            .map_err(|e| AudioError::HardwareInit(e.to_string()))?;

        let result = match decoder {
            Some(decoder) => self.decoder.initialize_with(format, decoder),
            None => self.decoder.initialize(format),
        };
        result.map_err(as_codec_init)
    }

    /// Decode one inbound packet and play it.
    ///
    /// A packet that fails to decode is dropped (never played) and comes
    /// back as a non-fatal error; the buffers are then handled according
    /// to the [`DecodeFailurePolicy`].
    pub fn receive(&mut self, packet: &[u8]) -> Result<CycleOutcome, AudioError> {
        let Self {
            decoder,
            playback,
            buffers,
            policy,
            state,
            stats,
        } = self;

        run_state(state, "Receive", || {
            let decoded = buffers
                .staging
                .fill_from(packet)
                .and_then(|_| decoder.decode(buffers.staging.as_bytes(), &mut buffers.decoded));

            if let Err(e) = decoded {
                log::error!("Audio decode error: {}", e);
                stats.dropped += 1;
                if *policy == DecodeFailurePolicy::ClearBuffers {
                    buffers.staging.clear();
                    buffers.decoded.clear();
                    buffers.raw.clear();
                }
                return Err(e);
            }

            let written = playback.play(&buffers.decoded, &mut buffers.raw)?;
            if written < buffers.raw.len() {
                stats.short_io += 1;
            }
            stats.frames += 1;
            Ok(CycleOutcome::Played(written))
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn policy(&self) -> DecodeFailurePolicy {
        self.policy
    }

    pub fn buffers(&self) -> &ReceiveBuffers {
        &self.buffers
    }

    pub fn playback(&self) -> &PlaybackAdapter<D> {
        &self.playback
    }
}
