use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 提交评论
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionComment {
    pub id: i64,
    pub author_id: i64,
    pub comment: String,
    pub media_comment_id: Option<String>,
    pub media_comment_type: Option<String>,
    // 同一批小组评论共享的标识
    pub group_comment_id: String,
    pub attachment_ids: Vec<i64>,
    pub assessment_request_id: Option<i64>,
    pub anonymous: bool,
    // 仅评分者和作者可见
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
}
