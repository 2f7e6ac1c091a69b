//! The boundary to the peer-media transport.
//!
//! Outbound packets leave through a [`FrameSink`]; inbound packets are
//! handed to `ReceivePipeline::receive` by whoever owns the transport.

use tokio::sync::mpsc;

use crate::audio::AudioError;

/// Anything that can carry one compressed packet to the remote peer.
pub trait FrameSink {
    fn send(&mut self, frame: &[u8]) -> Result<(), AudioError>;
}

/// Hands packets to an async task. Blocks while the channel is full, so
/// it must only be used from a plain (non-runtime) thread.
///
/// The owned copy made here is the only per-frame allocation on the send
/// path; the packet leaves the preallocated buffers at this point.
impl FrameSink for mpsc::Sender<Vec<u8>> {
    fn send(&mut self, frame: &[u8]) -> Result<(), AudioError> {
        self.blocking_send(frame.to_vec())
            .map_err(|_| AudioError::Transport("Frame receiver dropped".to_string()))
    }
}
