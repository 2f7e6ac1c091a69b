use crate::audio::{
    AudioConfig, AudioError, DecodeFailurePolicy, EncoderSettings, FrameFormat, GainShift, WaitPolicy,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: &'static str,
    pub app_version: &'static str,

    // 音频设备配置
    pub capture_device: &'static str,
    pub playback_device: &'static str,
    pub sample_rate: u32,
    pub channels: u16,
    pub frame_samples: usize,
    pub periods: u32,
    pub input_gain_shift: i8,
    pub output_gain_shift: i8,
    pub capture_wait_ms: u64,
    pub playback_wait_ms: u64,
    pub decode_failure_policy: &'static str,

    // 编解码配置
    pub codec_bitrate: i32,
    pub codec_complexity: i32,
    pub codec_signal: &'static str,
    pub codec_application: &'static str,
    pub codec_max_packet_bytes: usize,

    // 传输桥配置
    pub bridge_local_ip: &'static str,
    pub bridge_local_port: u16,
    pub bridge_remote_ip: &'static str,
    pub bridge_remote_port: u16,
    pub bridge_buffer_size: usize,
    pub bridge_channel_depth: usize,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            app_name: env!("APP_NAME"),
            app_version: env!("APP_VERSION"),

            capture_device: env!("AUDIO_CAPTURE_DEVICE"),
            playback_device: env!("AUDIO_PLAYBACK_DEVICE"),
            sample_rate: env!("AUDIO_SAMPLE_RATE").parse()
                .map_err(|_| "Failed to parse AUDIO_SAMPLE_RATE")?,
            channels: env!("AUDIO_CHANNELS").parse()
                .map_err(|_| "Failed to parse AUDIO_CHANNELS")?,
            frame_samples: env!("AUDIO_FRAME_SAMPLES").parse()
                .map_err(|_| "Failed to parse AUDIO_FRAME_SAMPLES")?,
            periods: env!("AUDIO_PERIODS").parse()
                .map_err(|_| "Failed to parse AUDIO_PERIODS")?,
            input_gain_shift: env!("AUDIO_INPUT_GAIN_SHIFT").parse()
                .map_err(|_| "Failed to parse AUDIO_INPUT_GAIN_SHIFT")?,
            output_gain_shift: env!("AUDIO_OUTPUT_GAIN_SHIFT").parse()
                .map_err(|_| "Failed to parse AUDIO_OUTPUT_GAIN_SHIFT")?,
            capture_wait_ms: env!("AUDIO_CAPTURE_WAIT_MS").parse()
                .map_err(|_| "Failed to parse AUDIO_CAPTURE_WAIT_MS")?,
            playback_wait_ms: env!("AUDIO_PLAYBACK_WAIT_MS").parse()
                .map_err(|_| "Failed to parse AUDIO_PLAYBACK_WAIT_MS")?,
            decode_failure_policy: env!("AUDIO_DECODE_FAILURE_POLICY"),

            codec_bitrate: env!("CODEC_BITRATE").parse()
                .map_err(|_| "Failed to parse CODEC_BITRATE")?,
            codec_complexity: env!("CODEC_COMPLEXITY").parse()
                .map_err(|_| "Failed to parse CODEC_COMPLEXITY")?,
            codec_signal: env!("CODEC_SIGNAL"),
            codec_application: env!("CODEC_APPLICATION"),
            codec_max_packet_bytes: env!("CODEC_MAX_PACKET_BYTES").parse()
                .map_err(|_| "Failed to parse CODEC_MAX_PACKET_BYTES")?,

            bridge_local_ip: env!("BRIDGE_LOCAL_IP"),
            bridge_local_port: env!("BRIDGE_LOCAL_PORT").parse()
                .map_err(|_| "Failed to parse BRIDGE_LOCAL_PORT")?,
            bridge_remote_ip: env!("BRIDGE_REMOTE_IP"),
            bridge_remote_port: env!("BRIDGE_REMOTE_PORT").parse()
                .map_err(|_| "Failed to parse BRIDGE_REMOTE_PORT")?,
            bridge_buffer_size: env!("BRIDGE_BUFFER_SIZE").parse()
                .map_err(|_| "Failed to parse BRIDGE_BUFFER_SIZE")?,
            bridge_channel_depth: env!("BRIDGE_CHANNEL_DEPTH").parse()
                .map_err(|_| "Failed to parse BRIDGE_CHANNEL_DEPTH")?,
        })
    }

    /// 将静态配置转换为音频系统配置，并校验帧格式与编码参数
    pub fn audio_config(&self) -> Result<AudioConfig, AudioError> {
        let format = FrameFormat::new(self.sample_rate, self.channels, self.frame_samples)?;

        let encoder = EncoderSettings {
            format,
            bitrate: self.codec_bitrate,
            complexity: self.codec_complexity,
            signal: self.codec_signal.parse()?,
            application: self.codec_application.parse()?,
            max_packet_bytes: self.codec_max_packet_bytes,
        };
        encoder.validate()?;

        Ok(AudioConfig {
            capture_device: self.capture_device.to_string(),
            playback_device: self.playback_device.to_string(),
            periods: self.periods,
            input_gain: GainShift::new(self.input_gain_shift)?,
            output_gain: GainShift::new(self.output_gain_shift)?,
            capture_wait: WaitPolicy::from_millis(self.capture_wait_ms),
            playback_wait: WaitPolicy::from_millis(self.playback_wait_ms),
            decode_failure_policy: self.decode_failure_policy.parse::<DecodeFailurePolicy>()?,
            encoder,
        })
    }
}
