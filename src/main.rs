use std::sync::Arc;

use duplex_voice::audio::AudioSystem;
use duplex_voice::audio_bridge::AudioBridge;
use duplex_voice::config::Config;
use tokio::signal;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::init();

    // 加载配置
    let config = Config::new().map_err(anyhow::Error::msg)?;
    let audio_config = config.audio_config()?;
    log::info!("{} v{} starting", config.app_name, config.app_version);

    // 发送方向：音频线程 -> 传输桥
    let (tx_encoded, rx_encoded) = mpsc::channel::<Vec<u8>>(config.bridge_channel_depth);
    // 接收方向：传输桥 -> 音频线程
    let (tx_incoming, rx_incoming) = mpsc::channel::<Vec<u8>>(config.bridge_channel_depth);

    let bridge = Arc::new(AudioBridge::new(&config).await?);

    let inbound = bridge.clone();
    let inbound_task = tokio::spawn(async move {
        if let Err(e) = inbound.run_inbound(tx_incoming).await {
            log::error!("Inbound bridge error: {}", e);
        }
    });

    let outbound = bridge.clone();
    let outbound_task = tokio::spawn(async move {
        if let Err(e) = outbound.run_outbound(rx_encoded).await {
            log::error!("Outbound bridge error: {}", e);
        }
    });

    // 启动音频系统（独立线程）
    let mut audio = AudioSystem::start(audio_config, tx_encoded, rx_incoming)?;

    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Received Ctrl+C, shutting down...");
        }
        _ = outbound_task => {
            log::warn!("Send direction stopped");
        }
    }

    // 停止接收桥后，接收线程会因通道关闭而退出
    inbound_task.abort();
    audio.stop();
    Ok(())
}
