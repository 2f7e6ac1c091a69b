//! The send direction's encoder: one persistent codec instance, fixed
//! output capacity.

use super::buffers::CompressedFrame;
use super::codec::{EncoderSettings, FrameEncoder};
use super::error::AudioError;
use super::opus_codec::OpusEncoder;
use super::pipeline::PipelineState;

pub struct EncoderPipeline {
    encoder: Option<Box<dyn FrameEncoder>>,
    frame_samples: usize,
    max_packet_bytes: usize,
}

impl Default for EncoderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderPipeline {
    pub fn new() -> Self {
        Self {
            encoder: None,
            frame_samples: 0,
            max_packet_bytes: 0,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.encoder.is_some()
    }

    /// Create the Opus encoder. Only the first call succeeds.
    pub fn initialize(&mut self, settings: &EncoderSettings) -> Result<(), AudioError> {
        if self.is_initialized() {
            return Err(AudioError::AlreadyInitialized);
        }
        settings.validate()?;
        let encoder = OpusEncoder::new(settings)?;
        self.install(settings, Box::new(encoder))
    }

    /// Initialize with a caller-supplied encoder instead of Opus.
    pub fn initialize_with(
        &mut self,
        settings: &EncoderSettings,
        encoder: Box<dyn FrameEncoder>,
    ) -> Result<(), AudioError> {
        if self.is_initialized() {
            return Err(AudioError::AlreadyInitialized);
        }
        settings.validate()?;
        self.install(settings, encoder)
    }

    fn install(&mut self, settings: &EncoderSettings, encoder: Box<dyn FrameEncoder>) -> Result<(), AudioError> {
        self.frame_samples = settings.format.frame_samples();
        self.max_packet_bytes = settings.max_packet_bytes;
        self.encoder = Some(encoder);

        log::info!(
            "Encoder ready: {}Hz/{}ch, {} samples/frame, {}bps, complexity={}, signal={:?}, max_packet={}",
            settings.format.sample_rate(),
            settings.format.channels(),
            self.frame_samples,
            settings.bitrate,
            settings.complexity,
            settings.signal,
            self.max_packet_bytes,
        );
        Ok(())
    }

    /// Encode one PCM frame into `out`.
    ///
    /// `pcm` must hold exactly one frame. On failure `out` is left empty.
    pub fn encode(&mut self, pcm: &[i16], out: &mut CompressedFrame) -> Result<usize, AudioError> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or(AudioError::NotReady(PipelineState::Uninitialized))?;

        out.clear();
        if pcm.len() != self.frame_samples {
            return Err(AudioError::InvalidFrameSize {
                expected: self.frame_samples,
                actual: pcm.len(),
            });
        }

        let capacity = self.max_packet_bytes.min(out.capacity());
        let len = encoder.encode(pcm, &mut out.storage_mut()[..capacity])?;
        out.set_len(len.min(capacity))?;
        Ok(out.len())
    }
}
