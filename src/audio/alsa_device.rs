//! ALSA PCM devices for capture and playback.
//!
//! Both directions use interleaved native-endian 32-bit samples with one
//! period per frame. Short transfers are reported to the caller, never
//! retried past the configured wait.

use std::time::Instant;

use alsa::pcm::{Access, Format, Frames, HwParams, IO, PCM};
use alsa::{Direction, ValueOr};

use super::buffers::FrameFormat;
use super::device::{CaptureDevice, PlaybackDevice, WaitPolicy};
use super::error::AudioError;

/// Consecutive XRUN recoveries tolerated within one transfer before the
/// rest of the frame is given up.
const MAX_RECOVERY_RETRIES: u32 = 3;

/// What to open and how to configure it.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// ALSA device name (e.g. "default", "plughw:0,0")
    pub device: String,
    pub format: FrameFormat,
    /// Number of frame-sized periods in the hardware ring buffer
    pub periods: u32,
}

/// Parameters negotiated with the ALSA hardware.
#[derive(Debug, Clone)]
pub struct AlsaParams {
    pub sample_rate: u32,
    pub channels: u32,
    /// Period size in frames (one frame = channels × sample_width)
    pub period_size: usize,
    pub buffer_size: usize,
}

struct AlsaStream {
    pcm: PCM,
    channels: usize,
    dir_name: &'static str,
    is_capture: bool,
}

impl AlsaStream {
    fn open(config: &DeviceConfig, direction: Direction, dir_name: &'static str) -> Result<Self, AudioError> {
        let is_capture = matches!(direction, Direction::Capture);
        let (pcm, params) = open_pcm(config, direction, dir_name)?;
        Ok(Self {
            pcm,
            channels: params.channels as usize,
            dir_name,
            is_capture,
        })
    }

    /// The IO handle for S32 samples.
    fn io(&self) -> Result<IO<'_, i32>, AudioError> {
        self.pcm.io_i32().map_err(|e| {
            AudioError::HardwareIo(format!("PCM {} is not S32: {}", self.dir_name, e))
        })
    }
}

/// What a transfer needs from a PCM stream besides the data call itself.
trait StreamControl {
    fn name(&self) -> &'static str;

    /// Wait until the stream can move frames. `false` means timed out.
    fn wait_ready(&self, timeout_ms: u32) -> alsa::Result<bool>;

    fn avail(&self) -> alsa::Result<Frames>;

    /// Bring the stream back after an XRUN. Only a failed `prepare` is fatal.
    fn recover(&self, err: alsa::Error) -> Result<(), AudioError>;
}

impl StreamControl for AlsaStream {
    fn name(&self) -> &'static str {
        self.dir_name
    }

    fn wait_ready(&self, timeout_ms: u32) -> alsa::Result<bool> {
        self.pcm.wait(Some(timeout_ms))
    }

    fn avail(&self) -> alsa::Result<Frames> {
        self.pcm.avail_update()
    }

    fn recover(&self, err: alsa::Error) -> Result<(), AudioError> {
        log::warn!("ALSA {} error: {}, recovering...", self.dir_name, err);
        self.pcm.prepare().map_err(|e| {
            AudioError::HardwareIo(format!("Failed to recover PCM {}: {}", self.dir_name, e))
        })?;
        if self.is_capture {
            self.pcm.start().map_err(|e| {
                AudioError::HardwareIo(format!("Failed to restart PCM capture: {}", e))
            })?;
        }
        Ok(())
    }
}

/// Move up to `total_samples` samples through `op`, honouring `wait`.
///
/// `op(offset, frames)` transfers at most `frames` frames starting at
/// sample `offset` and returns the frames moved. After
/// `MAX_RECOVERY_RETRIES` recoveries in a row the rest of the frame is
/// given up; if nothing at all was moved by then the device is considered
/// lost and `HardwareIo` is returned.
fn transfer<S, F>(
    stream: &S,
    channels: usize,
    total_samples: usize,
    wait: WaitPolicy,
    mut op: F,
) -> Result<usize, AudioError>
where
    S: StreamControl,
    F: FnMut(usize, usize) -> alsa::Result<usize>,
{
    let total_frames = total_samples / channels;
    let deadline = match wait {
        WaitPolicy::Bounded(limit) => Some(Instant::now() + limit),
        WaitPolicy::Unbounded => None,
    };

    let mut done = 0;
    let mut retry_count = 0u32;

    // Recover from `e` and count it; true once the breaker trips.
    let failed = |e: alsa::Error, retry_count: &mut u32| -> Result<bool, AudioError> {
        stream.recover(e)?;
        *retry_count += 1;
        Ok(*retry_count >= MAX_RECOVERY_RETRIES)
    };

    while done < total_frames {
        let mut chunk = total_frames - done;

        if let Some(deadline) = deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let timeout_ms = remaining.as_millis().clamp(1, u32::MAX as u128) as u32;
            match stream.wait_ready(timeout_ms) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    if failed(e, &mut retry_count)? {
                        break;
                    }
                    continue;
                }
            }
            // Only move what is available so the call below cannot block
            match stream.avail() {
                Ok(avail) => chunk = chunk.min(avail.max(0) as usize),
                Err(e) => {
                    if failed(e, &mut retry_count)? {
                        break;
                    }
                    continue;
                }
            }
            if chunk == 0 {
                continue;
            }
        }

        match op(done * channels, chunk) {
            Ok(n) => {
                done += n;
                retry_count = 0;
            }
            Err(e) => {
                if failed(e, &mut retry_count)? {
                    break;
                }
            }
        }
    }

    // 熔断器：底层持续跟不上时，放弃本帧剩余部分防止死循环
    if retry_count >= MAX_RECOVERY_RETRIES {
        if done == 0 {
            return Err(AudioError::HardwareIo(format!(
                "ALSA {} failed {} recoveries in a row without moving any frames",
                stream.name(),
                retry_count
            )));
        }
        log::error!(
            "Max recovery retries ({}) reached. Dropping {} {} frames.",
            retry_count,
            total_frames - done,
            stream.name()
        );
    }

    Ok(done * channels)
}

/// Microphone side of the ALSA hardware.
pub struct AlsaCapture {
    stream: AlsaStream,
}

impl AlsaCapture {
    /// Open and configure the capture device.
    pub fn install(config: &DeviceConfig) -> Result<Self, AudioError> {
        let stream = AlsaStream::open(config, Direction::Capture, "Capture")?;
        stream
            .pcm
            .start()
            .map_err(|e| AudioError::HardwareInit(format!("Failed to start capture: {}", e)))?;
        Ok(Self { stream })
    }
}

impl CaptureDevice for AlsaCapture {
    fn read(&mut self, buf: &mut [i32], wait: WaitPolicy) -> Result<usize, AudioError> {
        let channels = self.stream.channels;
        let io = self.stream.io()?;
        let total = buf.len();
        transfer(&self.stream, channels, total, wait, |offset, frames| {
            io.readi(&mut buf[offset..offset + frames * channels])
        })
    }

    fn zero_buffer(&mut self) -> Result<(), AudioError> {
        let pcm = &self.stream.pcm;
        pcm.drop()
            .and_then(|_| pcm.prepare())
            .and_then(|_| pcm.start())
            .map_err(|e| AudioError::HardwareIo(format!("Failed to reset capture buffer: {}", e)))
    }
}

/// Speaker side of the ALSA hardware.
pub struct AlsaPlayback {
    stream: AlsaStream,
}

impl AlsaPlayback {
    /// Open and configure the playback device.
    pub fn install(config: &DeviceConfig) -> Result<Self, AudioError> {
        let stream = AlsaStream::open(config, Direction::Playback, "Playback")?;
        Ok(Self { stream })
    }
}

impl PlaybackDevice for AlsaPlayback {
    fn write(&mut self, buf: &[i32], wait: WaitPolicy) -> Result<usize, AudioError> {
        let channels = self.stream.channels;
        let io = self.stream.io()?;
        transfer(&self.stream, channels, buf.len(), wait, |offset, frames| {
            io.writei(&buf[offset..offset + frames * channels])
        })
    }

    fn zero_buffer(&mut self) -> Result<(), AudioError> {
        let pcm = &self.stream.pcm;
        pcm.drop()
            .and_then(|_| pcm.prepare())
            .map_err(|e| AudioError::HardwareIo(format!("Failed to reset playback buffer: {}", e)))
    }
}

fn open_pcm(
    config: &DeviceConfig,
    direction: Direction,
    dir_name: &str,
) -> Result<(PCM, AlsaParams), AudioError> {
    let init_err = |what: &str, e: alsa::Error| {
        AudioError::HardwareInit(format!("{} ({} '{}'): {}", what, dir_name, config.device, e))
    };

    let format = &config.format;
    let period_frames = format.samples_per_channel();

    let pcm = PCM::new(&config.device, direction, false)
        .map_err(|e| init_err("Failed to open PCM device", e))?;

    // Configure hardware parameters
    {
        let hwp = HwParams::any(&pcm).map_err(|e| init_err("Failed to initialize HwParams", e))?;
        hwp.set_access(Access::RWInterleaved)
            .map_err(|e| init_err("Interleaved access rejected", e))?;
        hwp.set_format(Format::s32())
            .map_err(|e| init_err("S32 sample format rejected", e))?;
        hwp.set_channels(format.channels() as u32)
            .map_err(|e| init_err("Channel count rejected", e))?;
        hwp.set_rate_near(format.sample_rate(), ValueOr::Nearest)
            .map_err(|e| init_err("Sample rate rejected", e))?;
        hwp.set_period_size_near(period_frames as alsa::pcm::Frames, ValueOr::Nearest)
            .map_err(|e| init_err("Period size rejected", e))?;
        hwp.set_buffer_size_near((period_frames * config.periods.max(2) as usize) as alsa::pcm::Frames)
            .map_err(|e| init_err("Buffer size rejected", e))?;
        pcm.hw_params(&hwp)
            .map_err(|e| init_err("Failed to apply HwParams", e))?;
    }

    // Read back actual negotiated parameters
    let params = {
        let hwp = pcm
            .hw_params_current()
            .map_err(|e| init_err("Failed to read HwParams", e))?;
        AlsaParams {
            sample_rate: hwp.get_rate().map_err(|e| init_err("get_rate", e))?,
            channels: hwp.get_channels().map_err(|e| init_err("get_channels", e))?,
            period_size: hwp.get_period_size().map_err(|e| init_err("get_period_size", e))? as usize,
            buffer_size: hwp.get_buffer_size().map_err(|e| init_err("get_buffer_size", e))? as usize,
        }
    };

    // The frame constant is shared with the codec; no resampling happens here
    if params.sample_rate != format.sample_rate() || params.channels != format.channels() as u32 {
        return Err(AudioError::HardwareInit(format!(
            "{} '{}' negotiated {}Hz/{}ch, need {}Hz/{}ch",
            dir_name,
            config.device,
            params.sample_rate,
            params.channels,
            format.sample_rate(),
            format.channels()
        )));
    }

    pcm.prepare()
        .map_err(|e| init_err("Failed to prepare PCM", e))?;

    log::info!(
        "ALSA {}: device={}, rate={}, channels={}, period_size={}, buffer_size={}",
        dir_name,
        config.device,
        params.sample_rate,
        params.channels,
        params.period_size,
        params.buffer_size,
    );

    Ok((pcm, params))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use super::*;

    const EPIPE: i32 = 32;

    /// A stream that is always ready and whose recoveries always succeed.
    #[derive(Default)]
    struct FlakyStream {
        recoveries: Cell<u32>,
        ready: bool,
    }

    impl StreamControl for FlakyStream {
        fn name(&self) -> &'static str {
            "Test"
        }

        fn wait_ready(&self, _timeout_ms: u32) -> alsa::Result<bool> {
            Ok(self.ready)
        }

        fn avail(&self) -> alsa::Result<Frames> {
            Ok(4096)
        }

        fn recover(&self, _err: alsa::Error) -> Result<(), AudioError> {
            self.recoveries.set(self.recoveries.get() + 1);
            Ok(())
        }
    }

    fn xrun() -> alsa::Error {
        alsa::Error::new("snd_pcm_readi", -EPIPE)
    }

    #[test]
    fn test_breaker_with_nothing_moved_is_hardware_failure() {
        let stream = FlakyStream::default();
        let result = transfer(&stream, 2, 640, WaitPolicy::Unbounded, |_, _| Err(xrun()));

        assert!(matches!(result, Err(AudioError::HardwareIo(_))));
        assert!(result.unwrap_err().is_fatal());
        assert_eq!(stream.recoveries.get(), MAX_RECOVERY_RETRIES);
    }

    #[test]
    fn test_breaker_after_partial_transfer_is_short_io() {
        let stream = FlakyStream::default();
        let mut calls = 0;
        let result = transfer(&stream, 2, 640, WaitPolicy::Unbounded, |_, frames| {
            calls += 1;
            if calls == 1 { Ok(frames / 2) } else { Err(xrun()) }
        });

        assert_eq!(result.unwrap(), 320);
        assert_eq!(stream.recoveries.get(), MAX_RECOVERY_RETRIES);
    }

    #[test]
    fn test_success_resets_retry_count() {
        let stream = FlakyStream::default();
        // Two failures, one frame, two failures, the rest: never three in a row
        let mut calls = 0;
        let result = transfer(&stream, 2, 640, WaitPolicy::Unbounded, |offset, frames| {
            calls += 1;
            match calls {
                1 | 2 | 4 | 5 => Err(xrun()),
                3 => Ok(1),
                _ => {
                    assert_eq!(offset, 2);
                    Ok(frames)
                }
            }
        });

        assert_eq!(result.unwrap(), 640);
        assert_eq!(stream.recoveries.get(), 4);
    }

    #[test]
    fn test_bounded_wait_timeout_is_short_not_error() {
        let stream = FlakyStream::default();
        let result = transfer(
            &stream,
            2,
            640,
            WaitPolicy::Bounded(Duration::from_millis(5)),
            |_, frames| Ok(frames),
        );

        assert_eq!(result.unwrap(), 0);
        assert_eq!(stream.recoveries.get(), 0);
    }

    #[test]
    fn test_bounded_wait_moves_available_frames() {
        let stream = FlakyStream {
            ready: true,
            ..Default::default()
        };
        let result = transfer(
            &stream,
            2,
            640,
            WaitPolicy::Bounded(Duration::from_millis(40)),
            |_, frames| Ok(frames),
        );

        assert_eq!(result.unwrap(), 640);
    }
}
