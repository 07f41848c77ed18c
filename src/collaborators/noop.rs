//! 未接入外部服务时使用的默认实现

use async_trait::async_trait;
use tracing::{debug, info};

use super::{GradebookHooks, ModuleProgress, PlagiarismClient, ScreenshotCapture};
use crate::errors::{LifecycleError, Result};
use crate::models::assignments::entities::Assignment;
use crate::models::plagiarism::entities::SimilarityReport;
use crate::models::submissions::entities::Submission;

/// 查重服务未配置：提交一律失败，轮询永远没有结果
pub struct DisabledPlagiarismClient;

#[async_trait]
impl PlagiarismClient for DisabledPlagiarismClient {
    async fn submit(
        &self,
        submission: &Submission,
        _assignment: &Assignment,
    ) -> Result<Vec<String>> {
        Err(LifecycleError::external_service(format!(
            "plagiarism service is not configured (submission {})",
            submission.id
        )))
    }

    async fn poll(
        &self,
        _submission: &Submission,
        _asset_string: &str,
    ) -> Result<Option<SimilarityReport>> {
        Ok(None)
    }

    fn instructor_report_url(
        &self,
        _submission: &Submission,
        _asset_string: &str,
    ) -> Option<String> {
        None
    }

    fn student_report_url(&self, _submission: &Submission, _asset_string: &str) -> Option<String> {
        None
    }
}

pub struct DisabledScreenshotCapture;

#[async_trait]
impl ScreenshotCapture for DisabledScreenshotCapture {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn capture(&self, url: &str) -> Result<i64> {
        Err(LifecycleError::external_service(format!(
            "screenshot capture is disabled, skipped {url}"
        )))
    }
}

/// 只记录日志的成绩册钩子
pub struct LoggingGradebookHooks;

#[async_trait]
impl GradebookHooks for LoggingGradebookHooks {
    async fn recompute_final_score(&self, user_id: i64, context_id: i64) -> Result<()> {
        info!(
            "Recompute final score requested for user {} in context {}",
            user_id, context_id
        );
        Ok(())
    }

    async fn record_module_progress(
        &self,
        user_id: i64,
        assignment_id: i64,
        progress: ModuleProgress,
    ) -> Result<()> {
        debug!(
            "Module progress for user {} on assignment {}: {:?}",
            user_id, assignment_id, progress
        );
        Ok(())
    }

    async fn notify_graders(&self, assignment_id: i64) -> Result<()> {
        debug!("Grading queue refresh for assignment {}", assignment_id);
        Ok(())
    }

    async fn publish_stream_item(&self, submission_id: i64, user_id: i64) -> Result<()> {
        debug!(
            "Stream item for submission {} sent to user {}",
            submission_id, user_id
        );
        Ok(())
    }
}
