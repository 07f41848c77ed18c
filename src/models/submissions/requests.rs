use serde::Deserialize;

use super::entities::{SubmissionType, WorkflowState};

/// 提交/重新提交请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitRequest {
    pub assignment_id: i64,
    pub user_id: i64,
    pub group_id: Option<i64>,
    // 缺省时按内容推断
    pub submission_type: Option<SubmissionType>,
    pub url: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub attachment_ids: Vec<i64>,
    pub quiz_submission_id: Option<i64>,
    pub media_comment_id: Option<String>,
    pub media_comment_type: Option<String>,
}

/// 评分请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GradeRequest {
    pub submission_id: i64,
    // 分数与等级二选一；只给等级时按作业方案换算分数
    pub score: Option<f64>,
    pub grade: Option<String>,
    // 显式清除成绩
    #[serde(default)]
    pub clear: bool,
}

/// 直接修改提交字段（批量导入、管理修正等）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSubmissionRequest {
    pub workflow_state: Option<WorkflowState>,
    pub media_comment_id: Option<String>,
    pub media_comment_type: Option<String>,
    pub grade_matches_current_submission: Option<bool>,
}
