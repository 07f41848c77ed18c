use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::assessments::entities::AssessmentRequest;
use crate::models::assignments::entities::{Assignment, GradingType};
use crate::models::comments::entities::SubmissionComment;
use crate::models::plagiarism::entities::PlagiarismData;

// 提交类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionType {
    OnlineUrl,       // 网址
    OnlineTextEntry, // 在线文本
    OnlineUpload,    // 上传文件
    OnlineQuiz,      // 测验
}

impl SubmissionType {
    pub const ONLINE_URL: &'static str = "online_url";
    pub const ONLINE_TEXT_ENTRY: &'static str = "online_text_entry";
    pub const ONLINE_UPLOAD: &'static str = "online_upload";
    pub const ONLINE_QUIZ: &'static str = "online_quiz";

    /// 是否可以送查重
    pub fn is_plagiarism_checkable(&self) -> bool {
        matches!(
            self,
            SubmissionType::OnlineUpload | SubmissionType::OnlineTextEntry
        )
    }
}

impl std::fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionType::OnlineUrl => write!(f, "{}", SubmissionType::ONLINE_URL),
            SubmissionType::OnlineTextEntry => write!(f, "{}", SubmissionType::ONLINE_TEXT_ENTRY),
            SubmissionType::OnlineUpload => write!(f, "{}", SubmissionType::ONLINE_UPLOAD),
            SubmissionType::OnlineQuiz => write!(f, "{}", SubmissionType::ONLINE_QUIZ),
        }
    }
}

impl std::str::FromStr for SubmissionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            SubmissionType::ONLINE_URL => Ok(SubmissionType::OnlineUrl),
            SubmissionType::ONLINE_TEXT_ENTRY => Ok(SubmissionType::OnlineTextEntry),
            SubmissionType::ONLINE_UPLOAD => Ok(SubmissionType::OnlineUpload),
            SubmissionType::ONLINE_QUIZ => Ok(SubmissionType::OnlineQuiz),
            _ => Err(format!("Invalid submission type: {s}")),
        }
    }
}

// 提交工作流状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Unsubmitted, // 未提交
    Submitted,     // 已提交
    PendingReview, // 待人工复核（测验未完成自动评分）
    Graded,        // 已评分
}

impl WorkflowState {
    pub const UNSUBMITTED: &'static str = "unsubmitted";
    pub const SUBMITTED: &'static str = "submitted";
    pub const PENDING_REVIEW: &'static str = "pending_review";
    pub const GRADED: &'static str = "graded";

    /// 允许进入目标状态的前驱状态
    pub fn allowed_predecessors(target: WorkflowState) -> &'static [WorkflowState] {
        use WorkflowState::*;
        match target {
            Unsubmitted => &[Unsubmitted, Submitted, Graded],
            Submitted => &[Unsubmitted, Submitted, PendingReview, Graded],
            PendingReview => &[Unsubmitted, Submitted, PendingReview, Graded],
            Graded => &[Unsubmitted, Submitted, PendingReview, Graded],
        }
    }

    pub fn can_transition_to(&self, target: WorkflowState) -> bool {
        Self::allowed_predecessors(target).contains(self)
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowState::Unsubmitted => write!(f, "{}", WorkflowState::UNSUBMITTED),
            WorkflowState::Submitted => write!(f, "{}", WorkflowState::SUBMITTED),
            WorkflowState::PendingReview => write!(f, "{}", WorkflowState::PENDING_REVIEW),
            WorkflowState::Graded => write!(f, "{}", WorkflowState::GRADED),
        }
    }
}

impl std::str::FromStr for WorkflowState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            WorkflowState::UNSUBMITTED => Ok(WorkflowState::Unsubmitted),
            WorkflowState::SUBMITTED => Ok(WorkflowState::Submitted),
            WorkflowState::PENDING_REVIEW => Ok(WorkflowState::PendingReview),
            WorkflowState::GRADED => Ok(WorkflowState::Graded),
            _ => Err(format!("Invalid workflow state: {s}")),
        }
    }
}

// 提交实体
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Submission {
    pub id: i64,
    pub assignment_id: i64,
    pub user_id: i64,
    pub group_id: Option<i64>,
    // 提交内容
    pub submission_type: Option<SubmissionType>,
    pub url: Option<String>,
    pub body: Option<String>,
    pub attachment_ids: Vec<i64>,
    pub quiz_submission_id: Option<i64>,
    // 网址提交的截图
    pub screenshot_attachment_id: Option<i64>,
    pub processed: bool,
    pub process_attempts: i32,
    // 评分
    pub score: Option<f64>,
    pub grade: Option<String>,
    pub published_score: Option<f64>,
    pub published_grade: Option<String>,
    pub grade_matches_current_submission: bool,
    pub grader_id: Option<i64>,
    pub workflow_state: WorkflowState,
    pub changed_since_publish: bool,
    // 时间
    pub submitted_at: Option<DateTime<Utc>>,
    pub graded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attempt: i32,
    // 媒体评论
    pub media_comment_id: Option<String>,
    pub media_comment_type: Option<String>,
    pub media_object_id: Option<i64>,
    pub plagiarism: PlagiarismData,
    #[serde(default)]
    pub comments: Vec<SubmissionComment>,
    #[serde(default)]
    pub assessment_requests: Vec<AssessmentRequest>,
    #[serde(default)]
    pub assigned_assessment_ids: Vec<i64>,
}

impl Submission {
    pub fn new(assignment_id: i64, user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            assignment_id,
            user_id,
            created_at: now,
            updated_at: now,
            ..Default::default()
        }
    }

    pub fn has_submission(&self) -> bool {
        self.submission_type.is_some()
    }

    pub fn is_submitted(&self) -> bool {
        self.workflow_state == WorkflowState::Submitted
    }

    /// 已评分：有分数且状态为 graded
    pub fn is_graded(&self) -> bool {
        self.score.is_some() && self.workflow_state == WorkflowState::Graded
    }

    /// 当前提交内容已被评分（评分晚于最近一次提交）
    pub fn current_submission_graded(&self) -> bool {
        self.is_graded()
            && match (self.submitted_at, self.graded_at) {
                (None, _) => true,
                (Some(submitted_at), Some(graded_at)) => graded_at >= submitted_at,
                (Some(_), None) => false,
            }
    }

    /// 评分之后又重新提交过
    pub fn needs_regrading(&self) -> bool {
        self.is_graded() && !self.grade_matches_current_submission
    }

    pub fn submitted_or_graded(&self) -> bool {
        self.is_submitted() || self.is_graded()
    }

    /// 进入教师待批改队列的条件
    pub fn needs_grading(&self) -> bool {
        self.has_submission()
            && (self.score.is_none()
                || !self.grade_matches_current_submission
                || matches!(
                    self.workflow_state,
                    WorkflowState::Submitted | WorkflowState::PendingReview
                ))
    }

    /// 迟交判断，按分钟精度比较
    pub fn is_late(&self, assignment: &Assignment) -> bool {
        match (assignment.due_at, self.submitted_at) {
            (Some(due_at), Some(submitted_at)) => {
                submitted_at.timestamp().div_euclid(60) > due_at.timestamp().div_euclid(60)
            }
            _ => false,
        }
    }

    /// 旧快照可能缺少提交时间，有提交类型时用更新时间代替
    pub fn effective_submitted_at(&self) -> Option<DateTime<Utc>> {
        match (self.submitted_at, self.submission_type) {
            (Some(submitted_at), _) => Some(submitted_at),
            (None, Some(_)) => Some(self.updated_at),
            (None, None) => None,
        }
    }

    /// 完整网址：超长网址被截断后原文保存在正文里
    pub fn full_url(&self, max_url_length: usize) -> Option<&str> {
        let url = self.url.as_deref()?;
        match self.body.as_deref() {
            Some(body)
                if prefix_chars(body, max_url_length) == prefix_chars(url, max_url_length) =>
            {
                Some(body)
            }
            _ => Some(url),
        }
    }

    pub fn readable_state(&self) -> &'static str {
        match self.workflow_state {
            WorkflowState::Unsubmitted => "unsubmitted",
            WorkflowState::Submitted => "submitted",
            WorkflowState::PendingReview => "pending review",
            WorkflowState::Graded => "graded",
        }
    }

    pub fn readable_grade(&self, assignment: Option<&Assignment>) -> Option<String> {
        let grade = self.grade.as_deref()?;
        match assignment {
            Some(a) if a.grading_type == GradingType::Points => Some(format!(
                "{grade} out of {}",
                crate::utils::format_score(a.points_possible)
            )),
            _ => Some(capitalize(grade)),
        }
    }

    /// 最近一条不是学生本人写的评论
    pub fn last_teacher_comment(&self) -> Option<&SubmissionComment> {
        self.comments
            .iter()
            .rev()
            .find(|c| c.author_id != self.user_id)
    }

    /// 网址提交已生成截图
    pub fn is_processed(&self) -> bool {
        self.submission_type == Some(SubmissionType::OnlineUrl)
            && self.screenshot_attachment_id.is_some()
            && self.processed
    }

    pub fn assessment_request_count(&self) -> usize {
        self.assessment_requests.len()
    }

    pub fn assigned_assessment_count(&self) -> usize {
        self.assigned_assessment_ids.len()
    }
}

fn prefix_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}
