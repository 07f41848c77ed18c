//! 后台任务
//!
//! 副作用意图和通知投递都以 [`Job`] 的形式进入任务队列，至少执行一次；
//! 每个任务在执行前自行复查前置条件，重复投递是安全的。

pub mod tokio_queue;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::collaborators::ModuleProgress;
use crate::errors::Result;
use crate::models::notifications::entities::NotificationEvent;
use crate::services::lifecycle::SideEffect;

pub use tokio_queue::{QueueWorkers, TokioTaskQueue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum Job {
    RecomputeFinalScore {
        user_id: i64,
        context_id: i64,
    },
    RecordModuleProgress {
        user_id: i64,
        assignment_id: i64,
        progress: ModuleProgress,
    },
    NotifyGraders {
        assignment_id: i64,
    },
    // content_attempt 为送查时的提交版本；attempt 从 0 开始计数
    SubmitForPlagiarismCheck {
        submission_id: i64,
        content_attempt: i32,
        attempt: u32,
    },
    // attempt 从 1 开始计数
    PollPlagiarism {
        submission_id: i64,
        asset_string: String,
        content_attempt: i32,
        attempt: u32,
    },
    CaptureScreenshot {
        submission_id: i64,
    },
    PublishStreamItem {
        submission_id: i64,
        user_id: i64,
    },
    DeliverNotification {
        event: NotificationEvent,
    },
}

impl Job {
    pub fn name(&self) -> &'static str {
        match self {
            Job::RecomputeFinalScore { .. } => "recompute_final_score",
            Job::RecordModuleProgress { .. } => "record_module_progress",
            Job::NotifyGraders { .. } => "notify_graders",
            Job::SubmitForPlagiarismCheck { .. } => "submit_for_plagiarism_check",
            Job::PollPlagiarism { .. } => "poll_plagiarism",
            Job::CaptureScreenshot { .. } => "capture_screenshot",
            Job::PublishStreamItem { .. } => "publish_stream_item",
            Job::DeliverNotification { .. } => "deliver_notification",
        }
    }
}

impl From<SideEffect> for Job {
    fn from(effect: SideEffect) -> Self {
        match effect {
            SideEffect::RecomputeFinalScore {
                user_id,
                context_id,
            } => Job::RecomputeFinalScore {
                user_id,
                context_id,
            },
            SideEffect::RecordModuleProgress {
                user_id,
                assignment_id,
                progress,
            } => Job::RecordModuleProgress {
                user_id,
                assignment_id,
                progress,
            },
            SideEffect::NotifyGradersOfSubmission { assignment_id } => {
                Job::NotifyGraders { assignment_id }
            }
            SideEffect::SubmitForPlagiarismCheck {
                submission_id,
                content_attempt,
            } => Job::SubmitForPlagiarismCheck {
                submission_id,
                content_attempt,
                attempt: 0,
            },
            SideEffect::CaptureScreenshot { submission_id } => {
                Job::CaptureScreenshot { submission_id }
            }
            SideEffect::PublishStreamItem {
                submission_id,
                user_id,
            } => Job::PublishStreamItem {
                submission_id,
                user_id,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobPriority {
    #[default]
    Normal,
    Low,
}

/// 入队参数
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedJob {
    pub job: Job,
    pub delay: Option<Duration>,
    pub priority: JobPriority,
}

impl QueuedJob {
    pub fn now(job: Job) -> Self {
        Self {
            job,
            delay: None,
            priority: JobPriority::Normal,
        }
    }

    pub fn after(job: Job, delay: Duration) -> Self {
        Self {
            job,
            delay: Some(delay),
            priority: JobPriority::Normal,
        }
    }

    pub fn low_priority(mut self) -> Self {
        self.priority = JobPriority::Low;
        self
    }
}

impl From<SideEffect> for QueuedJob {
    fn from(effect: SideEffect) -> Self {
        let low = effect.is_low_priority();
        let queued = QueuedJob::now(Job::from(effect));
        if low { queued.low_priority() } else { queued }
    }
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, job: QueuedJob) -> Result<()>;
}

/// 任务的执行方
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn perform(&self, job: Job) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_effect_priority() {
        let screenshot = QueuedJob::from(SideEffect::CaptureScreenshot { submission_id: 1 });
        assert_eq!(screenshot.priority, JobPriority::Low);
        assert_eq!(screenshot.job.name(), "capture_screenshot");

        let check = QueuedJob::from(SideEffect::SubmitForPlagiarismCheck {
            submission_id: 1,
            content_attempt: 2,
        });
        assert_eq!(check.priority, JobPriority::Normal);
        assert_eq!(
            check.job,
            Job::SubmitForPlagiarismCheck {
                submission_id: 1,
                content_attempt: 2,
                attempt: 0
            }
        );
    }

    #[test]
    fn test_job_serializes_with_tag() {
        let value = serde_json::to_value(Job::NotifyGraders { assignment_id: 4 }).unwrap();
        assert_eq!(value["job"], "notify_graders");
        assert_eq!(value["assignment_id"], 4);
    }
}
