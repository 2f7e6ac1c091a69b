//! The receive direction's decoder: one persistent codec instance,
//! fixed-size PCM output.

use super::buffers::FrameFormat;
use super::codec::FrameDecoder;
use super::error::AudioError;
use super::opus_codec::OpusDecoder;
use super::pipeline::PipelineState;

pub struct DecoderPipeline {
    decoder: Option<Box<dyn FrameDecoder>>,
    format: FrameFormat,
}

impl Default for DecoderPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderPipeline {
    pub fn new() -> Self {
        Self {
            decoder: None,
            format: FrameFormat::default(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.decoder.is_some()
    }

    /// Create the Opus decoder. Only the first call succeeds.
    pub fn initialize(&mut self, format: FrameFormat) -> Result<(), AudioError> {
        if self.is_initialized() {
            return Err(AudioError::AlreadyInitialized);
        }
        let decoder = OpusDecoder::new(&format)?;
        self.install(format, Box::new(decoder));
        Ok(())
    }

    /// Initialize with a caller-supplied decoder instead of Opus.
    pub fn initialize_with(&mut self, format: FrameFormat, decoder: Box<dyn FrameDecoder>) -> Result<(), AudioError> {
        if self.is_initialized() {
            return Err(AudioError::AlreadyInitialized);
        }
        self.install(format, decoder);
        Ok(())
    }

    fn install(&mut self, format: FrameFormat, decoder: Box<dyn FrameDecoder>) {
        self.format = format;
        self.decoder = Some(decoder);
        log::info!(
            "Decoder ready: {}Hz/{}ch, {} samples/frame",
            format.sample_rate(),
            format.channels(),
            format.frame_samples(),
        );
    }

    /// Decode one packet into `pcm`, which must hold exactly one frame.
    ///
    /// Returns the interleaved samples decoded. A packet shorter than a
    /// frame has the rest of `pcm` zeroed.
    pub fn decode(&mut self, packet: &[u8], pcm: &mut [i16]) -> Result<usize, AudioError> {
        let decoder = self
            .decoder
            .as_mut()
            .ok_or(AudioError::NotReady(PipelineState::Uninitialized))?;

        let frame_samples = self.format.frame_samples();
        if pcm.len() != frame_samples {
            return Err(AudioError::InvalidFrameSize {
                expected: frame_samples,
                actual: pcm.len(),
            });
        }
        if packet.is_empty() {
            return Err(AudioError::CodecRuntime("Zero-length frame".to_string()));
        }

        let per_channel = decoder.decode(packet, pcm)?;
        if per_channel == 0 {
            return Err(AudioError::CodecRuntime("Decoder produced no samples".to_string()));
        }

        let decoded = (per_channel * self.format.channels() as usize).min(frame_samples);
        if decoded < frame_samples {
            log::debug!("Short decode: {}/{} samples", decoded, frame_samples);
            pcm[decoded..].fill(0);
        }
        Ok(decoded)
    }
}
