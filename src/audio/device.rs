//! Hardware audio device interfaces.
//!
//! Sample counts are interleaved samples (all channels), in the wide
//! hardware format.

use std::time::Duration;

use super::error::AudioError;

/// How long a hardware read or write may block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Give up after the duration and report whatever was transferred.
    Bounded(Duration),
    /// Block until the whole buffer is transferred.
    Unbounded,
}

impl WaitPolicy {
    /// `0` means unbounded.
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            WaitPolicy::Unbounded
        } else {
            WaitPolicy::Bounded(Duration::from_millis(ms))
        }
    }
}

/// A source of wide hardware samples (microphone side).
pub trait CaptureDevice: Send {
    /// Read up to `buf.len()` samples.
    ///
    /// Returns the number of samples actually read, which is less than
    /// requested when the wait runs out first.
    fn read(&mut self, buf: &mut [i32], wait: WaitPolicy) -> Result<usize, AudioError>;

    /// Discard whatever the hardware has buffered.
    fn zero_buffer(&mut self) -> Result<(), AudioError>;
}

/// A sink for wide hardware samples (speaker side).
pub trait PlaybackDevice: Send {
    /// Write up to `buf.len()` samples, returning how many were accepted.
    fn write(&mut self, buf: &[i32], wait: WaitPolicy) -> Result<usize, AudioError>;

    /// Reset the hardware buffer to silence.
    fn zero_buffer(&mut self) -> Result<(), AudioError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_from_millis() {
        assert_eq!(WaitPolicy::from_millis(0), WaitPolicy::Unbounded);
        assert_eq!(
            WaitPolicy::from_millis(40),
            WaitPolicy::Bounded(Duration::from_millis(40))
        );
    }
}
