use serde::{Deserialize, Serialize};

// 互评请求状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentRequestState {
    #[default]
    Assigned,
    Completed,
}

// 评审方来源：直接指定的用户，或评审者自己的提交
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum AssessorAsset {
    User(i64),
    Submission(i64),
}

/// 互评请求：连接被评提交与评审方
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssessmentRequest {
    pub id: i64,
    // 被评提交
    pub asset_submission_id: i64,
    pub assessor_asset: AssessorAsset,
    pub assessor_id: i64,
    // 被评学生
    pub user_id: i64,
    pub rubric_association_id: Option<i64>,
    pub state: AssessmentRequestState,
    pub comment_ids: Vec<i64>,
}
