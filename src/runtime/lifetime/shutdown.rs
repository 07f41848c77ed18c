use tokio::signal;
use tracing::{error, warn};

use super::startup::StartupContext;

pub async fn listen_for_shutdown() {
    // 等待 Ctrl+C 信号
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    warn!("Shutdown signal received, initiating graceful shutdown...");
}

/// 停止任务队列；尚未到期的延迟任务随进程一起丢弃
pub async fn shutdown_runtime(context: StartupContext) {
    context.workers.shutdown().await;
    warn!(
        "Graceful shutdown: task queue drained, {} user(s) still connected",
        context.dispatcher.online_count()
    );
}
