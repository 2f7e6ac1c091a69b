//! Speaker side: widen decoded PCM and hand it to the hardware.

use super::buffers::RawFrame;
use super::convert::{self, GainShift};
use super::device::{PlaybackDevice, WaitPolicy};
use super::error::AudioError;

pub struct PlaybackAdapter<D: PlaybackDevice> {
    device: D,
    wait: WaitPolicy,
    gain: GainShift,
}

impl<D: PlaybackDevice> PlaybackAdapter<D> {
    /// * `wait` - How long one write may block (normally unbounded)
    /// * `gain` - Output gain applied while widening samples
    pub fn new(device: D, wait: WaitPolicy, gain: GainShift) -> Self {
        Self { device, wait, gain }
    }

    /// Widen `pcm` into `raw` and write it out.
    ///
    /// Returns the samples the hardware accepted. A short write only costs
    /// the tail of this frame.
    pub fn play(&mut self, pcm: &[i16], raw: &mut RawFrame) -> Result<usize, AudioError> {
        if pcm.len() != raw.len() {
            return Err(AudioError::InvalidFrameSize {
                expected: raw.len(),
                actual: pcm.len(),
            });
        }

        convert::upconvert(pcm, raw, self.gain);
        let written = self.device.write(raw, self.wait)?;

        if written < raw.len() {
            log::debug!("Short playback write: {}/{} samples", written, raw.len());
        }
        Ok(written)
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
