use crate::config::Config;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// UDP transport between the audio threads and the remote peer.
///
/// Inbound datagrams become packets for the receive pipeline; encoded
/// packets from the send pipeline go out as one datagram each.
pub struct AudioBridge {
    socket: Arc<UdpSocket>,
    target_addr: String,
    buffer_size: usize,
}

impl AudioBridge {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let socket =
            UdpSocket::bind(format!("{}:{}", config.bridge_local_ip, config.bridge_local_port)).await?;
        let target_addr = format!("{}:{}", config.bridge_remote_ip, config.bridge_remote_port);
        log::info!(
            "AudioBridge bound to {}, peer {}",
            socket.local_addr()?,
            target_addr
        );

        Ok(Self {
            socket: Arc::new(socket),
            target_addr,
            buffer_size: config.bridge_buffer_size,
        })
    }

    /// Forward every received datagram to the receive pipeline.
    ///
    /// Empty datagrams are forwarded too; the decoder rejects them as a
    /// per-frame failure.
    pub async fn run_inbound(&self, tx: mpsc::Sender<Vec<u8>>) -> anyhow::Result<()> {
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            let (len, _) = self.socket.recv_from(&mut buf).await?;
            // Owned hand-off to the receive thread; it decodes into its own
            // fixed buffers from here on
            if tx.send(buf[..len].to_vec()).await.is_err() {
                log::warn!("Receive pipeline gone, stopping inbound bridge");
                break;
            }
        }
        Ok(())
    }

    /// Send each encoded packet to the peer until the send pipeline stops.
    pub async fn run_outbound(&self, mut rx: mpsc::Receiver<Vec<u8>>) -> anyhow::Result<()> {
        while let Some(packet) = rx.recv().await {
            if let Err(e) = self.send_audio(&packet).await {
                log::warn!("Failed to send audio packet: {}", e);
            }
        }
        Ok(())
    }

    pub async fn send_audio(&self, data: &[u8]) -> anyhow::Result<()> {
        self.socket.send_to(data, &self.target_addr).await?;
        Ok(())
    }

    pub fn local_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}
