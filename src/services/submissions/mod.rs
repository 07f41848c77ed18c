//! 提交服务
//!
//! 把生命周期流水线接到存储、任务队列和通知分发上：
//! 读取上一快照 -> 解析外部查询 -> 流水线 -> 存储（追加版本）
//! -> 副作用入队 -> 通知入队。

pub mod assessments;
pub mod comments;
pub mod grade;
pub mod history;
pub mod perform;
pub mod publish;
pub mod save;
pub mod stats;
pub mod submit;


use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;

use crate::collaborators::{
    AssignmentDirectory, DisabledPlagiarismClient, DisabledScreenshotCapture, EnrollmentDirectory,
    GradebookHooks, InMemoryDirectory, LoggingGradebookHooks, MediaObjectLookup, PlagiarismClient,
    QuizAttemptLookup, ScreenshotCapture,
};
use crate::config::AppConfig;
use crate::dispatch::NotificationDispatcher;
use crate::errors::{LifecycleError, Result};
use crate::models::assessments::entities::{AssessmentRequest, AssessorAsset};
use crate::models::assignments::entities::Assignment;
use crate::models::comments::entities::SubmissionComment;
use crate::models::comments::requests::AddCommentRequest;
use crate::models::notifications::entities::NotificationEvent;
use crate::models::submissions::entities::Submission;
use crate::models::submissions::requests::{GradeRequest, SubmitRequest, UpdateSubmissionRequest};
use crate::models::users::entities::{Actor, Capability};
use crate::queue::TaskQueue;
use crate::services::lifecycle::{ChangeFlags, SideEffect};
use crate::services::notifications::BroadcastFlags;
use crate::services::permissions;
use crate::storage::SubmissionStore;

/// 外部协作方
#[derive(Clone)]
pub struct Collaborators {
    pub assignments: Arc<dyn AssignmentDirectory>,
    pub enrollments: Arc<dyn EnrollmentDirectory>,
    pub quiz_attempts: Arc<dyn QuizAttemptLookup>,
    pub media_objects: Arc<dyn MediaObjectLookup>,
    pub plagiarism: Arc<dyn PlagiarismClient>,
    pub screenshots: Arc<dyn ScreenshotCapture>,
    pub gradebook: Arc<dyn GradebookHooks>,
}

impl Collaborators {
    /// 目录类查询都走内存目录，外部服务使用未接入的默认实现
    pub fn with_directory(directory: Arc<InMemoryDirectory>) -> Self {
        Self {
            assignments: directory.clone(),
            enrollments: directory.clone(),
            quiz_attempts: directory.clone(),
            media_objects: directory,
            plagiarism: Arc::new(DisabledPlagiarismClient),
            screenshots: Arc::new(DisabledScreenshotCapture),
            gradebook: Arc::new(LoggingGradebookHooks),
        }
    }
}

/// 一次保存的结果
#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub submission: Submission,
    pub flags: ChangeFlags,
    pub side_effects: Vec<SideEffect>,
    pub notifications: Vec<NotificationEvent>,
}

pub struct SubmissionService {
    store: Arc<dyn SubmissionStore>,
    queue: Arc<dyn TaskQueue>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    collaborators: Collaborators,
    config: AppConfig,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        queue: Arc<dyn TaskQueue>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        collaborators: Collaborators,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            queue,
            dispatcher,
            collaborators,
            config,
        }
    }

    pub(crate) async fn load_submission(&self, submission_id: i64) -> Result<Submission> {
        self.store
            .get_submission(submission_id)
            .await?
            .ok_or_else(|| {
                LifecycleError::not_found(format!("Submission {submission_id} not found"))
            })
    }

    pub(crate) async fn load_assignment(&self, assignment_id: i64) -> Result<Assignment> {
        self.collaborators
            .assignments
            .get_assignment(assignment_id)
            .await?
            .ok_or_else(|| {
                LifecycleError::not_found(format!("Assignment {assignment_id} not found"))
            })
    }

    /// 提交或重新提交
    pub async fn submit(&self, req: SubmitRequest) -> Result<SaveOutcome> {
        submit::submit(self, req).await
    }

    /// 评分
    pub async fn grade(&self, actor: &Actor, req: GradeRequest) -> Result<SaveOutcome> {
        grade::grade(self, actor, req).await
    }

    /// 修改工作流状态、媒体评论等字段
    pub async fn update(
        &self,
        actor: &Actor,
        submission_id: i64,
        req: UpdateSubmissionRequest,
    ) -> Result<SaveOutcome> {
        grade::update(self, actor, submission_id, req).await
    }

    pub async fn save(&self, submission: Submission) -> Result<SaveOutcome> {
        save::save(self, submission, BroadcastFlags::default()).await
    }

    /// 保存但不发任何通知
    pub async fn save_without_broadcast(&self, submission: Submission) -> Result<SaveOutcome> {
        let flags = BroadcastFlags {
            suppress_broadcast: true,
            ..Default::default()
        };
        save::save(self, submission, flags).await
    }

    /// 以小组提交的身份重新保存，触发小组迟交通知
    pub async fn broadcast_group_submission(&self, submission_id: i64) -> Result<SaveOutcome> {
        publish::broadcast_group_submission(self, submission_id).await
    }

    /// 作业整体发布成绩
    pub async fn assignment_just_published(&self, assignment_id: i64) -> Result<Vec<SaveOutcome>> {
        publish::assignment_just_published(self, assignment_id).await
    }

    pub async fn add_comment(
        &self,
        actor: &Actor,
        submission_id: i64,
        req: AddCommentRequest,
    ) -> Result<Option<SubmissionComment>> {
        comments::add_comment(self, actor, submission_id, req).await
    }

    pub async fn visible_comments(
        &self,
        actor: Option<&Actor>,
        submission_id: i64,
    ) -> Result<Vec<SubmissionComment>> {
        comments::visible_comments(self, actor, submission_id).await
    }

    pub async fn assign_assessor(
        &self,
        submission_id: i64,
        assessor: AssessorAsset,
        rubric_association_id: Option<i64>,
    ) -> Result<AssessmentRequest> {
        assessments::assign_assessor(self, submission_id, assessor, rubric_association_id).await
    }

    pub async fn submission_history(
        &self,
        actor: &Actor,
        submission_id: i64,
    ) -> Result<Vec<Submission>> {
        history::submission_history(self, actor, submission_id).await
    }

    /// 查重报告链接：评分者看教师版，有权限的学生看学生版
    pub async fn plagiarism_report_url(
        &self,
        actor: &Actor,
        submission_id: i64,
        asset_string: &str,
    ) -> Result<Option<String>> {
        perform::plagiarism_report_url(self, actor, submission_id, asset_string).await
    }

    pub async fn rights(&self, actor: &Actor, submission_id: i64) -> Result<BTreeSet<Capability>> {
        let submission = self.load_submission(submission_id).await?;
        let assignment = self
            .collaborators
            .assignments
            .get_assignment(submission.assignment_id)
            .await?;
        Ok(permissions::rights(
            actor,
            &submission,
            assignment.as_ref(),
            Utc::now(),
        ))
    }

    /// 作业待批改数
    pub async fn needs_grading_count(&self, assignment_id: i64) -> Result<usize> {
        stats::needs_grading_count(self, assignment_id).await
    }
}
