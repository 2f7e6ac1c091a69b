//! The AudioSystem that owns one thread per direction.
//!
//! Uses std::thread (NOT tokio tasks) for real-time audio I/O to avoid
//! contention with async network tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use anyhow::Result;
use tokio::sync::mpsc;

use super::alsa_device::{AlsaCapture, AlsaPlayback, DeviceConfig};
use super::buffers::{BufferManager, FrameFormat, ReceiveBuffers, SendBuffers};
use super::capture::CaptureAdapter;
use super::codec::EncoderSettings;
use super::convert::GainShift;
use super::device::WaitPolicy;
use super::error::AudioError;
use super::pipeline::{DecodeFailurePolicy, ReceivePipeline, SendPipeline};
use super::playback::PlaybackAdapter;

/// Audio system configuration.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// ALSA capture device name (e.g. "default", "plughw:0,0")
    pub capture_device: String,
    /// ALSA playback device name
    pub playback_device: String,
    /// Hardware ring buffer length, in frames
    pub periods: u32,
    pub input_gain: GainShift,
    pub output_gain: GainShift,
    pub capture_wait: WaitPolicy,
    pub playback_wait: WaitPolicy,
    pub decode_failure_policy: DecodeFailurePolicy,
    /// Frame format and codec parameters; the format is shared by both
    /// directions and by the hardware.
    pub encoder: EncoderSettings,
}

impl AudioConfig {
    pub fn format(&self) -> FrameFormat {
        self.encoder.format
    }

    fn device_config(&self, device: &str) -> DeviceConfig {
        DeviceConfig {
            device: device.to_string(),
            format: self.format(),
            periods: self.periods,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            capture_device: "default".to_string(),
            playback_device: "default".to_string(),
            periods: 8,
            input_gain: GainShift::UNITY,
            output_gain: GainShift::UNITY,
            capture_wait: WaitPolicy::from_millis(40),
            playback_wait: WaitPolicy::Unbounded,
            decode_failure_policy: DecodeFailurePolicy::ClearBuffers,
            encoder: EncoderSettings::new(FrameFormat::default()),
        }
    }
}

/// The audio system drives each direction in a dedicated OS thread.
///
/// - Send thread: ALSA capture → Opus encode → `frame_tx`
/// - Receive thread: `frame_rx` → Opus decode → ALSA playback
pub struct AudioSystem {
    running: Arc<AtomicBool>,
    send_handle: Option<JoinHandle<()>>,
    recv_handle: Option<JoinHandle<()>>,
}

impl AudioSystem {
    /// Start the audio system.
    ///
    /// * `config`   - Audio configuration
    /// * `frame_tx` - Sender for encoded packets from the microphone
    /// * `frame_rx` - Receiver for packets to decode and play
    pub fn start(
        config: AudioConfig,
        frame_tx: mpsc::Sender<Vec<u8>>,
        frame_rx: mpsc::Receiver<Vec<u8>>,
    ) -> Result<Self> {
        config.encoder.validate()?;
        let format = config.format();
        let buffers = BufferManager::allocate(&format, config.encoder.max_packet_bytes)?;
        let running = Arc::new(AtomicBool::new(true));

        log::info!(
            "AudioSystem starting: capture: \"{}\", playback: \"{}\", rate: {}Hz, ch: {}, frame: {} samples ({}ms)",
            config.capture_device,
            config.playback_device,
            format.sample_rate(),
            format.channels(),
            format.frame_samples(),
            format.duration_ms(),
        );

        let send_handle = {
            let running = running.clone();
            let config = config.clone();
            let send_buffers = buffers.send;
            thread::Builder::new()
                .name("audio-send".into())
                .spawn(move || {
                    if let Err(e) = send_thread(&config, send_buffers, frame_tx, &running) {
                        log::error!("Send thread error: {}", e);
                    }
                })?
        };

        let recv_handle = {
            let running = running.clone();
            let recv_buffers = buffers.receive;
            thread::Builder::new()
                .name("audio-recv".into())
                .spawn(move || {
                    if let Err(e) = recv_thread(&config, recv_buffers, frame_rx, &running) {
                        log::error!("Receive thread error: {}", e);
                    }
                })?
        };

        Ok(Self {
            running,
            send_handle: Some(send_handle),
            recv_handle: Some(recv_handle),
        })
    }

    /// Signal threads to stop and wait for the send thread to finish.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(h) = self.send_handle.take() {
            let _ = h.join();
        }
        // Receive thread will exit when the channel sender is dropped.
        // We detach it here to avoid blocking.
        self.recv_handle.take();
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.stop();
    }
}

// ======================== Send thread ========================

fn send_thread(
    config: &AudioConfig,
    buffers: SendBuffers,
    mut frame_tx: mpsc::Sender<Vec<u8>>,
    running: &AtomicBool,
) -> Result<(), AudioError> {
    let device = AlsaCapture::install(&config.device_config(&config.capture_device))?;
    let capture = CaptureAdapter::new(device, config.capture_wait, config.input_gain);

    let mut pipeline = SendPipeline::new(capture, buffers);
    pipeline.initialize(&config.encoder)?;

    log::info!(
        "Send loop started: wait={:?}, gain={}",
        pipeline.capture().wait(),
        pipeline.capture().gain().steps()
    );

    while running.load(Ordering::Relaxed) {
        match pipeline.run_cycle(&mut frame_tx) {
            Ok(_) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(AudioError::Transport(_)) if frame_tx.is_closed() => {
                log::warn!("Frame receiver dropped, stopping send loop");
                break;
            }
            // Already logged; the frame is gone, the next one proceeds
            Err(_) => {}
        }
    }

    log::info!("Send loop stopped: {:?}", pipeline.stats());
    Ok(())
}

// ======================== Receive thread ========================

fn recv_thread(
    config: &AudioConfig,
    buffers: ReceiveBuffers,
    mut frame_rx: mpsc::Receiver<Vec<u8>>,
    running: &AtomicBool,
) -> Result<(), AudioError> {
    let device = AlsaPlayback::install(&config.device_config(&config.playback_device))?;
    let playback = PlaybackAdapter::new(device, config.playback_wait, config.output_gain);

    let mut pipeline = ReceivePipeline::new(playback, buffers, config.decode_failure_policy);
    pipeline.initialize(config.format())?;

    log::info!(
        "Receive loop started: wait={:?}, gain={}, on decode failure: {:?}",
        pipeline.playback().wait(),
        pipeline.playback().gain().steps(),
        pipeline.policy()
    );

    while running.load(Ordering::Relaxed) {
        // Block until we receive a packet (or channel closes)
        match frame_rx.blocking_recv() {
            Some(packet) => {
                if let Err(e) = pipeline.receive(&packet) {
                    if e.is_fatal() {
                        return Err(e);
                    }
                }
            }
            None => {
                log::info!("Frame channel closed");
                break;
            }
        }
    }

    log::info!("Receive loop stopped: {:?}", pipeline.stats());
    Ok(())
}
