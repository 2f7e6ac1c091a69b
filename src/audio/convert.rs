//! Sample-width conversion between the wide hardware format and the
//! codec's 16-bit PCM, with a bit-shift gain.
//!
//! Conversions saturate: a gain that pushes a sample out of the target
//! range clamps it to the range limit instead of wrapping.

use super::error::AudioError;

/// Width difference between hardware (32-bit) and codec (16-bit) samples.
const WIDTH_SHIFT: i32 = 16;

/// A bit-shift gain applied during width conversion.
///
/// Each step doubles (positive) or halves (negative) the amplitude. Zero is
/// a plain width conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GainShift(i8);

impl GainShift {
    pub const UNITY: GainShift = GainShift(0);
    pub const MAX: i8 = 15;

    pub fn new(steps: i8) -> Result<Self, AudioError> {
        if !(-Self::MAX..=Self::MAX).contains(&steps) {
            return Err(AudioError::InvalidConfig(format!(
                "Gain shift {} out of range -{}..={}",
                steps,
                Self::MAX,
                Self::MAX
            )));
        }
        Ok(Self(steps))
    }

    pub fn steps(&self) -> i8 {
        self.0
    }

    /// Right shift taking a wide sample down to 16 bits.
    fn down_shift(&self) -> u32 {
        (WIDTH_SHIFT - self.0 as i32) as u32
    }

    /// Left shift taking a 16-bit sample up to hardware width.
    fn up_shift(&self) -> u32 {
        (WIDTH_SHIFT + self.0 as i32) as u32
    }
}

/// Convert wide hardware samples into 16-bit PCM.
///
/// Converts `min(raw.len(), pcm.len())` samples and returns that count.
pub fn downconvert(raw: &[i32], pcm: &mut [i16], gain: GainShift) -> usize {
    let shift = gain.down_shift();
    let n = raw.len().min(pcm.len());
    for (dst, &src) in pcm[..n].iter_mut().zip(&raw[..n]) {
        let value = src >> shift;
        *dst = value.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    }
    n
}

/// Convert 16-bit PCM into wide hardware samples.
///
/// Converts `min(pcm.len(), raw.len())` samples and returns that count.
pub fn upconvert(pcm: &[i16], raw: &mut [i32], gain: GainShift) -> usize {
    let shift = gain.up_shift();
    let n = pcm.len().min(raw.len());
    for (dst, &src) in raw[..n].iter_mut().zip(&pcm[..n]) {
        let value = (src as i64) << shift;
        *dst = value.clamp(i32::MIN as i64, i32::MAX as i64) as i32;
    }
    n
}
