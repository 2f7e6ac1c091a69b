//! Safe wrappers around libopus' encoder and decoder states.

use std::ffi::{CStr, c_int};

use audiopus_sys as ffi;

use super::buffers::FrameFormat;
use super::codec::{Application, EncoderSettings, FrameDecoder, FrameEncoder, SignalHint};
use super::error::AudioError;

// ======================== Constants ========================

const OPUS_OK: c_int = 0;

const OPUS_APPLICATION_VOIP: c_int = 2048;
const OPUS_APPLICATION_AUDIO: c_int = 2049;
const OPUS_APPLICATION_RESTRICTED_LOWDELAY: c_int = 2051;

const OPUS_SET_BITRATE_REQUEST: c_int = 4002;
const OPUS_SET_COMPLEXITY_REQUEST: c_int = 4010;
const OPUS_SET_SIGNAL_REQUEST: c_int = 4024;

const OPUS_AUTO: c_int = -1000;
const OPUS_SIGNAL_VOICE: c_int = 3001;
const OPUS_SIGNAL_MUSIC: c_int = 3002;

fn strerror(code: c_int) -> String {
    // SAFETY: opus_strerror returns a pointer to a static C string.
    unsafe { CStr::from_ptr(ffi::opus_strerror(code)) }
        .to_string_lossy()
        .into_owned()
}

fn application_code(application: Application) -> c_int {
    match application {
        Application::Voip => OPUS_APPLICATION_VOIP,
        Application::Audio => OPUS_APPLICATION_AUDIO,
        Application::LowDelay => OPUS_APPLICATION_RESTRICTED_LOWDELAY,
    }
}

fn signal_code(signal: SignalHint) -> c_int {
    match signal {
        SignalHint::Auto => OPUS_AUTO,
        SignalHint::Voice => OPUS_SIGNAL_VOICE,
        SignalHint::Music => OPUS_SIGNAL_MUSIC,
    }
}

// ======================== Opus Encoder ========================

pub struct OpusEncoder {
    state: *mut ffi::OpusEncoder,
    channels: usize,
    frame_size: usize,
}

// OpusEncoder state is only touched by its single owner
unsafe impl Send for OpusEncoder {}

impl OpusEncoder {
    /// Create and configure an encoder.
    pub fn new(settings: &EncoderSettings) -> Result<Self, AudioError> {
        let format = &settings.format;
        let rate = format.sample_rate() as i32;
        let channels = format.channels() as c_int;
        let application = application_code(settings.application);

        let mut err: c_int = 0;
        let state = unsafe { ffi::opus_encoder_create(rate, channels, application, &mut err) };
        if err != OPUS_OK || state.is_null() {
            return Err(AudioError::CodecInit(format!(
                "Failed to create Opus encoder: {}",
                strerror(err)
            )));
        }

        let mut encoder = Self {
            state,
            channels: format.channels() as usize,
            frame_size: format.samples_per_channel(),
        };

        let rc = unsafe { ffi::opus_encoder_init(encoder.state, rate, channels, application) };
        if rc != OPUS_OK {
            return Err(AudioError::CodecInit(format!(
                "Failed to initialize Opus encoder: {}",
                strerror(rc)
            )));
        }

        encoder.ctl(OPUS_SET_BITRATE_REQUEST, settings.bitrate, "bitrate")?;
        encoder.ctl(OPUS_SET_COMPLEXITY_REQUEST, settings.complexity, "complexity")?;
        encoder.ctl(OPUS_SET_SIGNAL_REQUEST, signal_code(settings.signal), "signal")?;

        Ok(encoder)
    }

    fn ctl(&mut self, request: c_int, value: c_int, name: &str) -> Result<(), AudioError> {
        let rc = unsafe { ffi::opus_encoder_ctl(self.state, request, value) };
        if rc != OPUS_OK {
            return Err(AudioError::CodecInit(format!(
                "Failed to set Opus {} to {}: {}",
                name,
                value,
                strerror(rc)
            )));
        }
        Ok(())
    }
}

impl FrameEncoder for OpusEncoder {
    fn encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize, AudioError> {
        let expected = self.frame_size * self.channels;
        if pcm.len() != expected {
            return Err(AudioError::InvalidFrameSize {
                expected,
                actual: pcm.len(),
            });
        }

        let max_bytes = out.len().min(i32::MAX as usize) as i32;
        let len = unsafe {
            ffi::opus_encode(
                self.state,
                pcm.as_ptr(),
                self.frame_size as c_int,
                out.as_mut_ptr(),
                max_bytes,
            )
        };
        if len < 0 {
            return Err(AudioError::CodecRuntime(format!(
                "Opus encode failed: {}",
                strerror(len)
            )));
        }
        Ok(len as usize)
    }
}

impl Drop for OpusEncoder {
    fn drop(&mut self) {
        unsafe {
            ffi::opus_encoder_destroy(self.state);
        }
    }
}

// ======================== Opus Decoder ========================

pub struct OpusDecoder {
    state: *mut ffi::OpusDecoder,
    channels: usize,
}

unsafe impl Send for OpusDecoder {}

impl OpusDecoder {
    pub fn new(format: &FrameFormat) -> Result<Self, AudioError> {
        let mut err: c_int = 0;
        let state = unsafe {
            ffi::opus_decoder_create(
                format.sample_rate() as i32,
                format.channels() as c_int,
                &mut err,
            )
        };
        if err != OPUS_OK || state.is_null() {
            return Err(AudioError::CodecInit(format!(
                "Failed to create Opus decoder: {}",
                strerror(err)
            )));
        }
        Ok(Self {
            state,
            channels: format.channels() as usize,
        })
    }
}

impl FrameDecoder for OpusDecoder {
    fn decode(&mut self, packet: &[u8], pcm: &mut [i16]) -> Result<usize, AudioError> {
        // libopus reads an empty packet as "lost" and would synthesize audio
        if packet.is_empty() {
            return Err(AudioError::CodecRuntime("Empty Opus packet".to_string()));
        }

        let frame_size = pcm.len() / self.channels;
        let decoded = unsafe {
            ffi::opus_decode(
                self.state,
                packet.as_ptr(),
                packet.len().min(i32::MAX as usize) as i32,
                pcm.as_mut_ptr(),
                frame_size as c_int,
                0,
            )
        };
        if decoded <= 0 {
            return Err(AudioError::CodecRuntime(format!(
                "Opus decode failed: {}",
                strerror(decoded)
            )));
        }
        Ok(decoded as usize)
    }
}

impl Drop for OpusDecoder {
    fn drop(&mut self) {
        unsafe {
            ffi::opus_decoder_destroy(self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoder_rejects_wrong_frame() {
        let settings = EncoderSettings::new(FrameFormat::default());
        let mut encoder = OpusEncoder::new(&settings).unwrap();
        let mut out = [0u8; 1276];

        let err = encoder.encode(&[0i16; 320], &mut out).unwrap_err();
        assert!(matches!(
            err,
            AudioError::InvalidFrameSize {
                expected: 640,
                actual: 320
            }
        ));
    }

    #[test]
    fn test_encode_respects_output_capacity() {
        let mut settings = EncoderSettings::new(FrameFormat::default());
        settings.bitrate = 64000;
        let mut encoder = OpusEncoder::new(&settings).unwrap();

        // Full-scale noise-like input, worst case for packet size
        let pcm: Vec<i16> = (0..640u32)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 16) as i16)
            .collect();
        let mut out = [0xAAu8; 200];
        let len = encoder.encode(&pcm, &mut out[..160]).unwrap();
        assert!(len <= 160);
        assert!(out[160..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_decoder_rejects_empty_and_garbage() {
        let mut decoder = OpusDecoder::new(&FrameFormat::default()).unwrap();
        let mut pcm = [0i16; 640];

        assert!(matches!(
            decoder.decode(&[], &mut pcm),
            Err(AudioError::CodecRuntime(_))
        ));
        // TOC byte announcing more frames than the packet carries
        assert!(decoder.decode(&[0xFF, 0xFF], &mut pcm).is_err());
    }
}
