//! 基于 tokio 的进程内任务队列
//!
//! 普通与低优先级两个通道，调度时优先取普通任务；并发数由信号量限制。
//! 延迟任务由独立的定时任务在到期后放入通道。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Semaphore, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{Job, JobHandler, JobPriority, QueuedJob, TaskQueue};
use crate::config::QueueConfig;
use crate::errors::{LifecycleError, Result};

#[derive(Clone)]
pub struct TokioTaskQueue {
    normal_tx: mpsc::Sender<Job>,
    low_tx: mpsc::Sender<Job>,
    shutdown_rx: watch::Receiver<bool>,
}

/// 队列的接收端，启动工作池时交出
pub struct JobReceivers {
    normal_rx: mpsc::Receiver<Job>,
    low_rx: mpsc::Receiver<Job>,
    shutdown_rx: watch::Receiver<bool>,
}

/// 运行中的工作池
pub struct QueueWorkers {
    dispatcher: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

impl TokioTaskQueue {
    pub fn new(config: &QueueConfig) -> (Self, JobReceivers, watch::Sender<bool>) {
        let capacity = config.capacity.max(1);
        let (normal_tx, normal_rx) = mpsc::channel(capacity);
        let (low_tx, low_rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        (
            Self {
                normal_tx,
                low_tx,
                shutdown_rx: shutdown_rx.clone(),
            },
            JobReceivers {
                normal_rx,
                low_rx,
                shutdown_rx,
            },
            shutdown_tx,
        )
    }

    fn sender(&self, priority: JobPriority) -> mpsc::Sender<Job> {
        match priority {
            JobPriority::Normal => self.normal_tx.clone(),
            JobPriority::Low => self.low_tx.clone(),
        }
    }
}

#[async_trait]
impl TaskQueue for TokioTaskQueue {
    async fn enqueue(&self, queued: QueuedJob) -> Result<()> {
        if *self.shutdown_rx.borrow() {
            return Err(LifecycleError::task_queue(format!(
                "Task queue is shutting down, dropped {}",
                queued.job.name()
            )));
        }

        let tx = self.sender(queued.priority);
        match queued.delay {
            // 通道满时转交后台任务发送，执行中的任务入队不会阻塞工作池
            None => match tx.try_send(queued.job) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(job)) => {
                    debug!("Queue full, deferring {}", job.name());
                    tokio::spawn(async move {
                        if let Err(e) = tx.send(job).await {
                            warn!("Deferred job {} dropped: channel closed", e.0.name());
                        }
                    });
                    Ok(())
                }
                Err(TrySendError::Closed(job)) => Err(LifecycleError::task_queue(format!(
                    "Failed to enqueue {}: channel closed",
                    job.name()
                ))),
            },
            Some(delay) => {
                let mut shutdown_rx = self.shutdown_rx.clone();
                let job = queued.job;
                debug!("Scheduling {} in {:?}", job.name(), delay);
                tokio::spawn(async move {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {
                            if let Err(e) = tx.send(job).await {
                                warn!("Delayed job {} dropped: channel closed", e.0.name());
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            debug!("Delayed job {} cancelled by shutdown", job.name());
                        }
                    }
                });
                Ok(())
            }
        }
    }
}

impl JobReceivers {
    /// 启动调度任务
    pub fn spawn(
        self,
        workers: usize,
        handler: Arc<dyn JobHandler>,
        shutdown_tx: watch::Sender<bool>,
    ) -> QueueWorkers {
        let workers = workers.max(1);
        info!("Starting task queue with {} worker(s)", workers);
        let dispatcher = tokio::spawn(self.run(workers, handler));
        QueueWorkers {
            dispatcher,
            shutdown_tx,
        }
    }

    async fn run(mut self, workers: usize, handler: Arc<dyn JobHandler>) {
        let permits = Arc::new(Semaphore::new(workers));
        loop {
            // 先拿到空闲名额再取任务，任务不会压在调度器手里
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let job = tokio::select! {
                biased;
                _ = self.shutdown_rx.changed() => break,
                Some(job) = self.normal_rx.recv() => job,
                Some(job) = self.low_rx.recv() => job,
                else => break,
            };

            let handler = handler.clone();
            tokio::spawn(async move {
                let _permit = permit;
                execute(handler.as_ref(), job).await;
            });
        }

        // 等待在途任务结束
        let _ = permits.acquire_many(workers as u32).await;
        info!("Task queue stopped");
    }
}

async fn execute(handler: &dyn JobHandler, job: Job) {
    let name = job.name();
    match handler.perform(job).await {
        Ok(()) => debug!("Job {} finished", name),
        Err(e) => error!("Job {} failed: {}", name, e),
    }
}

impl QueueWorkers {
    /// 通知停止并等待调度任务退出
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(true).is_err() {
            warn!("Task queue already stopped");
        }
        if let Err(e) = self.dispatcher.await {
            error!("Task queue dispatcher panicked: {}", e);
        }
    }
}
