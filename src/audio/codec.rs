//! Codec settings and the encoder/decoder traits the pipelines drive.

use super::buffers::{FrameFormat, MAX_PACKET_BYTES};
use super::error::AudioError;

/// What kind of signal the encoder should tune for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalHint {
    Auto,
    #[default]
    Voice,
    Music,
}

/// Encoder application mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Application {
    #[default]
    Voip,
    Audio,
    LowDelay,
}

impl std::str::FromStr for SignalHint {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(SignalHint::Auto),
            "voice" => Ok(SignalHint::Voice),
            "music" => Ok(SignalHint::Music),
            other => Err(AudioError::InvalidConfig(format!("Unknown signal hint: {}", other))),
        }
    }
}

impl std::str::FromStr for Application {
    type Err = AudioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voip" => Ok(Application::Voip),
            "audio" => Ok(Application::Audio),
            "lowdelay" => Ok(Application::LowDelay),
            other => Err(AudioError::InvalidConfig(format!("Unknown application: {}", other))),
        }
    }
}

/// Everything the send direction's encoder is configured with.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub format: FrameFormat,
    /// Bitrate in bits/s
    pub bitrate: i32,
    /// 0 (cheapest) ..= 10 (best)
    pub complexity: i32,
    pub signal: SignalHint,
    pub application: Application,
    /// Fixed capacity of the encoder output buffer
    pub max_packet_bytes: usize,
}

impl EncoderSettings {
    /// Voice defaults for `format`: 30kbps, complexity 0.
    pub fn new(format: FrameFormat) -> Self {
        Self {
            format,
            bitrate: 30000,
            complexity: 0,
            signal: SignalHint::Voice,
            application: Application::Voip,
            max_packet_bytes: MAX_PACKET_BYTES,
        }
    }

    /// Bytes one frame takes at the configured bitrate, rounded up.
    pub fn nominal_packet_bytes(&self) -> usize {
        let bits = self.bitrate.max(0) as u64 * self.format.samples_per_channel() as u64;
        bits.div_ceil(self.format.sample_rate() as u64 * 8) as usize
    }

    /// Check the settings keep every packet inside the output capacity.
    pub fn validate(&self) -> Result<(), AudioError> {
        if !(500..=512_000).contains(&self.bitrate) {
            return Err(AudioError::InvalidConfig(format!(
                "Bitrate {} outside 500..=512000",
                self.bitrate
            )));
        }
        if !(0..=10).contains(&self.complexity) {
            return Err(AudioError::InvalidConfig(format!(
                "Complexity {} outside 0..=10",
                self.complexity
            )));
        }
        if self.max_packet_bytes > MAX_PACKET_BYTES {
            return Err(AudioError::InvalidConfig(format!(
                "Packet capacity {} bytes above the {} byte codec limit",
                self.max_packet_bytes, MAX_PACKET_BYTES
            )));
        }
        let needed = self.nominal_packet_bytes();
        if self.max_packet_bytes < needed {
            return Err(AudioError::InvalidConfig(format!(
                "Packet capacity {} bytes below the {} bytes a {}ms frame needs at {}bps",
                self.max_packet_bytes,
                needed,
                self.format.duration_ms(),
                self.bitrate
            )));
        }
        Ok(())
    }
}

/// A stateful PCM → packet encoder.
pub trait FrameEncoder: Send {
    /// Encode one interleaved PCM frame into `out`.
    ///
    /// Returns the packet length; never writes past `out.len()`.
    fn encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<usize, AudioError>;
}

/// A stateful packet → PCM decoder.
pub trait FrameDecoder: Send {
    /// Decode one packet into `pcm`.
    ///
    /// Returns the decoded samples per channel; never writes past
    /// `pcm.len()`.
    fn decode(&mut self, packet: &[u8], pcm: &mut [i16]) -> Result<usize, AudioError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_fit() {
        let settings = EncoderSettings::new(FrameFormat::default());
        // 30kbps × 20ms = 75 bytes
        assert_eq!(settings.nominal_packet_bytes(), 75);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_capacity_below_bitrate_rejected() {
        let mut settings = EncoderSettings::new(FrameFormat::default());
        settings.max_packet_bytes = 74;
        assert!(settings.validate().is_err());

        settings.max_packet_bytes = 1276;
        settings.bitrate = 512_000;
        assert!(settings.validate().is_ok());
        settings.format = FrameFormat::new(16000, 2, 1920).unwrap(); // 60ms
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_capacity_above_codec_limit_rejected() {
        let mut settings = EncoderSettings::new(FrameFormat::default());
        settings.max_packet_bytes = MAX_PACKET_BYTES + 1;
        assert!(matches!(settings.validate(), Err(AudioError::InvalidConfig(_))));
        settings.max_packet_bytes = MAX_PACKET_BYTES;
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_complexity_and_bitrate_ranges() {
        let mut settings = EncoderSettings::new(FrameFormat::default());
        settings.complexity = 11;
        assert!(settings.validate().is_err());
        settings.complexity = 10;
        settings.bitrate = 100;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_parse_hints() {
        assert_eq!("voice".parse::<SignalHint>().unwrap(), SignalHint::Voice);
        assert_eq!("music".parse::<SignalHint>().unwrap(), SignalHint::Music);
        assert_eq!("lowdelay".parse::<Application>().unwrap(), Application::LowDelay);
        assert!("speech".parse::<SignalHint>().is_err());
        assert!("game".parse::<Application>().is_err());
    }
}
