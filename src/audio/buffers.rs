//! Frame format and the preallocated frame buffers.
//!
//! Every buffer the frame loop touches is allocated here, once, and then
//! moved into the direction pipeline that owns it for the rest of the
//! process lifetime. None of the buffer types can grow or shrink.

use std::ops::{Deref, DerefMut};

use super::error::AudioError;

/// Sample rates the codec accepts.
pub const SUPPORTED_SAMPLE_RATES: [u32; 5] = [8000, 12000, 16000, 24000, 48000];

/// Frame durations the codec accepts, in tenths of a millisecond.
const VALID_FRAME_DURATIONS_TENTH_MS: [u32; 6] = [25, 50, 100, 200, 400, 600];

/// Worst-case size of a single codec packet, also the default encoder
/// output capacity.
pub const MAX_PACKET_BYTES: usize = 1276;

/// The framing shared by capture, encode, decode and playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFormat {
    sample_rate: u32,
    channels: u16,
    frame_samples: usize,
}

impl FrameFormat {
    /// Create a validated frame format.
    ///
    /// * `sample_rate`   - Sample rate in Hz
    /// * `channels`      - 1 (mono) or 2 (stereo)
    /// * `frame_samples` - Interleaved samples per frame (all channels)
    pub fn new(sample_rate: u32, channels: u16, frame_samples: usize) -> Result<Self, AudioError> {
        if !SUPPORTED_SAMPLE_RATES.contains(&sample_rate) {
            return Err(AudioError::InvalidConfig(format!(
                "Unsupported sample rate: {}",
                sample_rate
            )));
        }
        if channels != 1 && channels != 2 {
            return Err(AudioError::InvalidConfig(format!(
                "Unsupported channel count: {}",
                channels
            )));
        }
        if frame_samples == 0 || frame_samples % channels as usize != 0 {
            return Err(AudioError::InvalidConfig(format!(
                "Frame of {} samples does not split into {} channels",
                frame_samples, channels
            )));
        }

        let per_channel = (frame_samples / channels as usize) as u64;
        let tenth_ms = per_channel * 10_000 / sample_rate as u64;
        let exact = per_channel * 10_000 % sample_rate as u64 == 0;
        if !exact || !VALID_FRAME_DURATIONS_TENTH_MS.contains(&(tenth_ms as u32)) {
            return Err(AudioError::InvalidConfig(format!(
                "{} samples per channel at {}Hz is not a valid codec frame duration",
                per_channel, sample_rate
            )));
        }

        Ok(Self {
            sample_rate,
            channels,
            frame_samples,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Interleaved samples per frame.
    pub fn frame_samples(&self) -> usize {
        self.frame_samples
    }

    /// Samples per channel per frame (the codec's "frame size").
    pub fn samples_per_channel(&self) -> usize {
        self.frame_samples / self.channels as usize
    }

    /// Frame duration in milliseconds (2.5ms frames report 2).
    pub fn duration_ms(&self) -> u32 {
        (self.samples_per_channel() as u64 * 1000 / self.sample_rate as u64) as u32
    }

    /// Size in bytes of one wide hardware frame.
    pub fn raw_frame_bytes(&self) -> usize {
        self.frame_samples * std::mem::size_of::<i32>()
    }
}

impl Default for FrameFormat {
    /// 16kHz stereo, 20ms.
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 2,
            frame_samples: 640,
        }
    }
}

macro_rules! fixed_frame {
    ($(#[$meta:meta])* $name:ident, $sample:ty) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name(Box<[$sample]>);

        impl $name {
            fn zeroed(len: usize) -> Self {
                Self(vec![0; len].into_boxed_slice())
            }

            /// Reset every sample to silence.
            pub fn clear(&mut self) {
                self.0.fill(0);
            }
        }

        impl Deref for $name {
            type Target = [$sample];

            fn deref(&self) -> &[$sample] {
                &self.0
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut [$sample] {
                &mut self.0
            }
        }
    };
}

fixed_frame!(
    /// One hardware period of wide interleaved samples.
    RawFrame,
    i32
);

fixed_frame!(
    /// One frame of 16-bit interleaved samples, the codec's PCM format.
    PcmFrame,
    i16
);

/// A fixed-capacity byte buffer holding one compressed packet.
#[derive(Debug)]
pub struct CompressedFrame {
    data: Box<[u8]>,
    len: usize,
}

impl CompressedFrame {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The valid packet bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// The whole backing storage, for a codec to write into.
    pub fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Mark the first `len` bytes of storage as the packet.
    pub fn set_len(&mut self, len: usize) -> Result<(), AudioError> {
        if len > self.data.len() {
            return Err(AudioError::InvalidFrameSize {
                expected: self.data.len(),
                actual: len,
            });
        }
        self.len = len;
        Ok(())
    }

    /// Copy an inbound packet into the buffer.
    ///
    /// Packets larger than the capacity are rejected and leave the buffer
    /// untouched.
    pub fn fill_from(&mut self, packet: &[u8]) -> Result<(), AudioError> {
        if packet.len() > self.data.len() {
            return Err(AudioError::InvalidFrameSize {
                expected: self.data.len(),
                actual: packet.len(),
            });
        }
        self.data[..packet.len()].copy_from_slice(packet);
        self.len = packet.len();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

/// Buffers owned by the capture → encode → send direction.
#[derive(Debug)]
pub struct SendBuffers {
    pub raw: RawFrame,
    pub pcm: PcmFrame,
    pub packet: CompressedFrame,
}

/// Buffers owned by the receive → decode → playback direction.
#[derive(Debug)]
pub struct ReceiveBuffers {
    pub staging: CompressedFrame,
    pub decoded: PcmFrame,
    pub raw: RawFrame,
}

impl SendBuffers {
    pub fn frame_samples(&self) -> usize {
        self.pcm.len()
    }
}

impl ReceiveBuffers {
    pub fn frame_samples(&self) -> usize {
        self.decoded.len()
    }
}

/// Every frame buffer of both directions.
#[derive(Debug)]
pub struct FrameBuffers {
    pub send: SendBuffers,
    pub receive: ReceiveBuffers,
}

/// One-shot allocator for the frame buffers.
pub struct BufferManager;

impl BufferManager {
    /// Allocate all frame buffers for `format`.
    ///
    /// `max_packet_bytes` is the fixed capacity of both compressed buffers.
    pub fn allocate(format: &FrameFormat, max_packet_bytes: usize) -> Result<FrameBuffers, AudioError> {
        if max_packet_bytes == 0 {
            return Err(AudioError::InvalidConfig(
                "Compressed frame capacity must be non-zero".to_string(),
            ));
        }

        let samples = format.frame_samples();
        log::debug!(
            "Allocating frame buffers: {} samples/frame, {} bytes/packet",
            samples,
            max_packet_bytes
        );

        Ok(FrameBuffers {
            send: SendBuffers {
                raw: RawFrame::zeroed(samples),
                pcm: PcmFrame::zeroed(samples),
                packet: CompressedFrame::with_capacity(max_packet_bytes),
            },
            receive: ReceiveBuffers {
                staging: CompressedFrame::with_capacity(max_packet_bytes),
                decoded: PcmFrame::zeroed(samples),
                raw: RawFrame::zeroed(samples),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_format() {
        let format = FrameFormat::new(16000, 2, 640).unwrap();
        assert_eq!(format, FrameFormat::default());
        assert_eq!(format.samples_per_channel(), 320);
        assert_eq!(format.duration_ms(), 20);
        assert_eq!(format.raw_frame_bytes(), 2560);
    }

    #[test]
    fn test_format_rejects_bad_values() {
        assert!(FrameFormat::new(44100, 2, 1764).is_err());
        assert!(FrameFormat::new(16000, 3, 960).is_err());
        assert!(FrameFormat::new(16000, 2, 641).is_err());
        // 15ms is not a codec frame duration
        assert!(FrameFormat::new(16000, 1, 240).is_err());
        assert!(FrameFormat::new(16000, 1, 0).is_err());
    }

    #[test]
    fn test_format_accepts_codec_durations() {
        assert!(FrameFormat::new(48000, 1, 120).is_ok()); // 2.5ms
        assert!(FrameFormat::new(48000, 2, 5760).is_ok()); // 60ms
        assert!(FrameFormat::new(8000, 1, 160).is_ok()); // 20ms
    }

    #[test]
    fn test_allocate_sizes() {
        let format = FrameFormat::default();
        let buffers = BufferManager::allocate(&format, MAX_PACKET_BYTES).unwrap();

        assert_eq!(buffers.send.raw.len(), 640);
        assert_eq!(buffers.send.pcm.len(), 640);
        assert_eq!(buffers.send.packet.capacity(), MAX_PACKET_BYTES);
        assert!(buffers.send.packet.is_empty());

        assert_eq!(buffers.receive.staging.capacity(), MAX_PACKET_BYTES);
        assert_eq!(buffers.receive.decoded.len(), 640);
        assert_eq!(buffers.receive.raw.len(), 640);
    }

    #[test]
    fn test_allocate_rejects_zero_capacity() {
        assert!(BufferManager::allocate(&FrameFormat::default(), 0).is_err());
    }

    #[test]
    fn test_compressed_fill_bounds() {
        let mut buffers = BufferManager::allocate(&FrameFormat::default(), 8).unwrap();
        let staging = &mut buffers.receive.staging;

        staging.fill_from(&[1, 2, 3]).unwrap();
        assert_eq!(staging.as_bytes(), &[1, 2, 3]);

        let err = staging.fill_from(&[0u8; 9]).unwrap_err();
        assert!(matches!(
            err,
            AudioError::InvalidFrameSize {
                expected: 8,
                actual: 9
            }
        ));
        // Rejected packet leaves previous contents
        assert_eq!(staging.as_bytes(), &[1, 2, 3]);

        assert!(staging.set_len(9).is_err());
        staging.clear();
        assert!(staging.is_empty());
    }
}
