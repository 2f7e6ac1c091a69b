//! Microphone side: one hardware period in, one 16-bit PCM frame out.

use super::buffers::{PcmFrame, RawFrame};
use super::convert::{self, GainShift};
use super::device::{CaptureDevice, WaitPolicy};
use super::error::AudioError;

pub struct CaptureAdapter<D: CaptureDevice> {
    device: D,
    wait: WaitPolicy,
    gain: GainShift,
}

impl<D: CaptureDevice> CaptureAdapter<D> {
    /// * `wait` - How long one read may block (normally bounded)
    /// * `gain` - Input gain applied while narrowing samples
    pub fn new(device: D, wait: WaitPolicy, gain: GainShift) -> Self {
        Self { device, wait, gain }
    }

    /// Read one hardware period into `raw`.
    ///
    /// Returns the bytes actually read. On a short read the rest of the
    /// frame is zeroed, so the caller always gets a full frame.
    pub fn capture_frame(&mut self, raw: &mut RawFrame) -> Result<usize, AudioError> {
        let requested = raw.len();
        let read = self.device.read(&mut raw[..], self.wait)?.min(requested);

        if read < requested {
            log::debug!(
                "Short capture read: {}/{} samples, padding with silence",
                read,
                requested
            );
            raw[read..].fill(0);
        }

        Ok(read * std::mem::size_of::<i32>())
    }

    /// Narrow `raw` into `pcm` with the input gain.
    pub fn downconvert(&self, raw: &RawFrame, pcm: &mut PcmFrame) -> Result<usize, AudioError> {
        if raw.len() != pcm.len() {
            return Err(AudioError::InvalidFrameSize {
                expected: raw.len(),
                actual: pcm.len(),
            });
        }
        Ok(convert::downconvert(raw, pcm, self.gain))
    }

    pub fn zero_buffer(&mut self) -> Result<(), AudioError> {
        self.device.zero_buffer()
    }

    pub fn wait(&self) -> WaitPolicy {
        self.wait
    }

    pub fn gain(&self) -> GainShift {
        self.gain
    }

    pub fn device(&self) -> &D {
        &self.device
    }
}
