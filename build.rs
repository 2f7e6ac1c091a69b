use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Deserialize)]
struct Config {
    application: Application,
    audio: Audio,
    codec: Codec,
    bridge: Bridge,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Audio {
    capture_device: String,
    playback_device: String,
    sample_rate: u32,
    channels: u16,
    frame_samples: usize,
    periods: u32,
    input_gain_shift: i8,
    output_gain_shift: i8,
    capture_wait_ms: u64,
    playback_wait_ms: u64,
    decode_failure_policy: String,
}

#[derive(Deserialize)]
struct Codec {
    bitrate: i32,
    complexity: i32,
    signal: String,
    application: String,
    max_packet_bytes: usize,
}

#[derive(Deserialize)]
struct Bridge {
    local_ip: String,
    local_port: u16,
    remote_ip: String,
    remote_port: u16,
    buffer_size: usize,
    channel_depth: usize,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // 音频配置
    let audio = &config.audio;
    println!("cargo:rustc-env=AUDIO_CAPTURE_DEVICE={}", audio.capture_device);
    println!("cargo:rustc-env=AUDIO_PLAYBACK_DEVICE={}", audio.playback_device);
    println!("cargo:rustc-env=AUDIO_SAMPLE_RATE={}", audio.sample_rate);
    println!("cargo:rustc-env=AUDIO_CHANNELS={}", audio.channels);
    println!("cargo:rustc-env=AUDIO_FRAME_SAMPLES={}", audio.frame_samples);
    println!("cargo:rustc-env=AUDIO_PERIODS={}", audio.periods);
    println!("cargo:rustc-env=AUDIO_INPUT_GAIN_SHIFT={}", audio.input_gain_shift);
    println!("cargo:rustc-env=AUDIO_OUTPUT_GAIN_SHIFT={}", audio.output_gain_shift);
    println!("cargo:rustc-env=AUDIO_CAPTURE_WAIT_MS={}", audio.capture_wait_ms);
    println!("cargo:rustc-env=AUDIO_PLAYBACK_WAIT_MS={}", audio.playback_wait_ms);
    println!(
        "cargo:rustc-env=AUDIO_DECODE_FAILURE_POLICY={}",
        audio.decode_failure_policy
    );

    // 编解码配置
    let codec = &config.codec;
    println!("cargo:rustc-env=CODEC_BITRATE={}", codec.bitrate);
    println!("cargo:rustc-env=CODEC_COMPLEXITY={}", codec.complexity);
    println!("cargo:rustc-env=CODEC_SIGNAL={}", codec.signal);
    println!("cargo:rustc-env=CODEC_APPLICATION={}", codec.application);
    println!("cargo:rustc-env=CODEC_MAX_PACKET_BYTES={}", codec.max_packet_bytes);

    // 传输桥配置
    let bridge = &config.bridge;
    println!("cargo:rustc-env=BRIDGE_LOCAL_IP={}", bridge.local_ip);
    println!("cargo:rustc-env=BRIDGE_LOCAL_PORT={}", bridge.local_port);
    println!("cargo:rustc-env=BRIDGE_REMOTE_IP={}", bridge.remote_ip);
    println!("cargo:rustc-env=BRIDGE_REMOTE_PORT={}", bridge.remote_port);
    println!("cargo:rustc-env=BRIDGE_BUFFER_SIZE={}", bridge.buffer_size);
    println!("cargo:rustc-env=BRIDGE_CHANNEL_DEPTH={}", bridge.channel_depth);
}
