//! 外部协作方接口
//!
//! 生命周期核心只依赖这些 trait；课程目录、测验、媒体库、查重服务、
//! 截图工具和成绩册都由宿主系统提供实现。

pub mod memory;
pub mod noop;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::models::assignments::entities::Assignment;
use crate::models::notifications::entities::Recipient;
use crate::models::plagiarism::entities::SimilarityReport;
use crate::models::submissions::entities::Submission;

pub use memory::InMemoryDirectory;
pub use noop::{DisabledPlagiarismClient, DisabledScreenshotCapture, LoggingGradebookHooks};

/// 测验作答记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: i64,
    pub quiz_id: i64,
    pub submission_id: Option<i64>,
    pub score: Option<f64>,
    // 所有题目都已自动评分
    pub complete: bool,
}

/// 模块进度动作
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", content = "score", rename_all = "snake_case")]
pub enum ModuleProgress {
    Submitted,
    Scored(f64),
}

#[async_trait]
pub trait AssignmentDirectory: Send + Sync {
    async fn get_assignment(&self, assignment_id: i64) -> Result<Option<Assignment>>;
}

#[async_trait]
pub trait EnrollmentDirectory: Send + Sync {
    // 学生是否在课程中处于有效选课状态
    async fn is_student_enrolled(&self, context_id: i64, user_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait QuizAttemptLookup: Send + Sync {
    async fn find_by_submission(&self, submission_id: i64) -> Result<Option<QuizAttempt>>;
    async fn find_by_user_and_quiz(&self, user_id: i64, quiz_id: i64)
    -> Result<Option<QuizAttempt>>;
}

#[async_trait]
pub trait MediaObjectLookup: Send + Sync {
    async fn find_media_object(&self, media_id: &str) -> Result<Option<i64>>;
}

/// 查重服务客户端，资源以不透明的字符串标识
#[async_trait]
pub trait PlagiarismClient: Send + Sync {
    /// 同步作业、登记学生并提交稿件，返回已受理的资源标识
    async fn submit(&self, submission: &Submission, assignment: &Assignment)
    -> Result<Vec<String>>;
    /// 查询报告；尚未出分时返回 None
    async fn poll(
        &self,
        submission: &Submission,
        asset_string: &str,
    ) -> Result<Option<SimilarityReport>>;
    fn instructor_report_url(&self, submission: &Submission, asset_string: &str)
    -> Option<String>;
    fn student_report_url(&self, submission: &Submission, asset_string: &str) -> Option<String>;
}

#[async_trait]
pub trait ScreenshotCapture: Send + Sync {
    fn is_enabled(&self) -> bool;
    /// 截取网页并保存为附件，返回附件 ID
    async fn capture(&self, url: &str) -> Result<i64>;
}

/// 成绩册与课程进度钩子
#[async_trait]
pub trait GradebookHooks: Send + Sync {
    async fn recompute_final_score(&self, user_id: i64, context_id: i64) -> Result<()>;
    async fn record_module_progress(
        &self,
        user_id: i64,
        assignment_id: i64,
        progress: ModuleProgress,
    ) -> Result<()>;
    // 刷新教师的待批改列表
    async fn notify_graders(&self, assignment_id: i64) -> Result<()>;
    async fn publish_stream_item(&self, submission_id: i64, user_id: i64) -> Result<()>;
}

/// 把收件人描述解析为用户 ID
#[async_trait]
pub trait RecipientResolver: Send + Sync {
    async fn resolve(&self, recipient: &Recipient) -> Result<Vec<i64>>;
}
