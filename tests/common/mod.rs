//! In-memory hardware and transport doubles for the pipeline tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use duplex_voice::audio::{
    AudioError, BufferManager, CaptureAdapter, CaptureDevice, FrameFormat, GainShift, PlaybackAdapter,
    PlaybackDevice, ReceivePipeline, SendPipeline, WaitPolicy, DecodeFailurePolicy,
    EncoderSettings,
};
use duplex_voice::transport::FrameSink;

/// What the scripted capture device does on its next read.
pub enum Read {
    /// Deliver these samples (possibly fewer than requested).
    Samples(Vec<i32>),
    /// Fail with a hardware error.
    Fail,
}

/// Capture device that replays a script and records how it was driven.
#[derive(Clone, Default)]
pub struct ScriptedCapture {
    pub script: Arc<Mutex<VecDeque<Read>>>,
    pub waits: Arc<Mutex<Vec<WaitPolicy>>>,
    pub zeroed: Arc<Mutex<usize>>,
    pub fail_zero: bool,
}

impl ScriptedCapture {
    pub fn push(&self, read: Read) {
        self.script.lock().unwrap().push_back(read);
    }

    pub fn push_frames(&self, frame: &[i32], count: usize) {
        for _ in 0..count {
            self.push(Read::Samples(frame.to_vec()));
        }
    }
}

impl CaptureDevice for ScriptedCapture {
    fn read(&mut self, buf: &mut [i32], wait: WaitPolicy) -> Result<usize, AudioError> {
        self.waits.lock().unwrap().push(wait);
        match self.script.lock().unwrap().pop_front() {
            Some(Read::Samples(samples)) => {
                let n = samples.len().min(buf.len());
                buf[..n].copy_from_slice(&samples[..n]);
                Ok(n)
            }
            Some(Read::Fail) => Err(AudioError::HardwareIo("scripted failure".to_string())),
            // Script exhausted: the wait ran out with nothing captured
            None => Ok(0),
        }
    }

    fn zero_buffer(&mut self) -> Result<(), AudioError> {
        if self.fail_zero {
            return Err(AudioError::HardwareIo("device unplugged".to_string()));
        }
        *self.zeroed.lock().unwrap() += 1;
        Ok(())
    }
}

/// Playback device that keeps every frame written to it.
#[derive(Clone, Default)]
pub struct RecordingPlayback {
    pub frames: Arc<Mutex<Vec<Vec<i32>>>>,
    pub waits: Arc<Mutex<Vec<WaitPolicy>>>,
    /// Accept at most this many samples per write.
    pub accept_limit: Option<usize>,
}

impl RecordingPlayback {
    pub fn written(&self) -> Vec<Vec<i32>> {
        self.frames.lock().unwrap().clone()
    }
}

impl PlaybackDevice for RecordingPlayback {
    fn write(&mut self, buf: &[i32], wait: WaitPolicy) -> Result<usize, AudioError> {
        self.waits.lock().unwrap().push(wait);
        let n = self.accept_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        self.frames.lock().unwrap().push(buf[..n].to_vec());
        Ok(n)
    }

    fn zero_buffer(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Transport that keeps every packet, or refuses them all.
#[derive(Default)]
pub struct CollectingSink {
    pub packets: Vec<Vec<u8>>,
    pub refuse: bool,
}

impl FrameSink for CollectingSink {
    fn send(&mut self, frame: &[u8]) -> Result<(), AudioError> {
        if self.refuse {
            return Err(AudioError::Transport("link down".to_string()));
        }
        self.packets.push(frame.to_vec());
        Ok(())
    }
}

/// 16kHz stereo, 20ms: 640 interleaved samples per frame.
pub fn voice_format() -> FrameFormat {
    FrameFormat::new(16000, 2, 640).unwrap()
}

pub fn send_pipeline(
    capture: ScriptedCapture,
    wait: WaitPolicy,
) -> SendPipeline<ScriptedCapture> {
    let buffers = BufferManager::allocate(&voice_format(), 1276).unwrap();
    SendPipeline::new(CaptureAdapter::new(capture, wait, GainShift::UNITY), buffers.send)
}

pub fn receive_pipeline(
    playback: RecordingPlayback,
    policy: DecodeFailurePolicy,
) -> ReceivePipeline<RecordingPlayback> {
    let buffers = BufferManager::allocate(&voice_format(), 1276).unwrap();
    ReceivePipeline::new(
        PlaybackAdapter::new(playback, WaitPolicy::Unbounded, GainShift::UNITY),
        buffers.receive,
        policy,
    )
}

pub fn voice_settings() -> EncoderSettings {
    EncoderSettings::new(voice_format())
}
