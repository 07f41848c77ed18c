use std::sync::Arc;

use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::collaborators::InMemoryDirectory;
use crate::config::AppConfig;
use crate::dispatch::BroadcastDispatcher;
use crate::queue::{QueueWorkers, TokioTaskQueue};
use crate::services::submissions::{Collaborators, SubmissionService};
use crate::storage::{SubmissionStore, create_memory_store};

pub struct StartupContext {
    pub store: Arc<dyn SubmissionStore>,
    pub directory: Arc<InMemoryDirectory>,
    pub dispatcher: Arc<BroadcastDispatcher>,
    pub service: Arc<SubmissionService>,
    pub workers: QueueWorkers,
}

/// 初始化日志
/// 开发环境输出文件与行号，其余环境输出 JSON
pub fn init_tracing(config: &AppConfig) -> WorkerGuard {
    let stdout_log = std::io::stdout();
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(stdout_log);
    let filter = tracing_subscriber::EnvFilter::new(&config.app.log_level);
    let tracing_format = tracing_subscriber::fmt::format()
        .with_level(true)
        .with_ansi(true);

    let tracing_builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking_writer)
        .event_format(tracing_format);

    let initialized = if config.is_development() {
        tracing_builder
            .with_file(true)
            .with_line_number(true)
            .try_init()
    } else {
        tracing_builder.json().try_init()
    };
    if let Err(e) = initialized {
        eprintln!("Tracing subscriber already installed: {e}");
    }
    guard
}

/// 准备运行时
/// 包括存储、任务队列、通知分发和提交服务
pub async fn prepare_runtime(config: AppConfig) -> StartupContext {
    let store = create_memory_store();
    let directory = Arc::new(InMemoryDirectory::new());
    let dispatcher = Arc::new(BroadcastDispatcher::new(directory.clone()));
    warn!("Storage backend initialized (in-memory)");

    let (queue, receivers, shutdown_tx) = TokioTaskQueue::new(&config.queue);
    let workers = config.queue.workers;

    let service = Arc::new(SubmissionService::new(
        store.clone(),
        Arc::new(queue),
        dispatcher.clone(),
        Collaborators::with_directory(directory.clone()),
        config,
    ));
    let workers = receivers.spawn(workers, service.clone(), shutdown_tx);
    debug!("Submission service wired to task queue");

    StartupContext {
        store,
        directory,
        dispatcher,
        service,
        workers,
    }
}
