use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// 通知类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AssignmentSubmittedLate,
    AssignmentSubmitted,
    AssignmentResubmitted,
    GroupAssignmentSubmittedLate,
    SubmissionGraded,
    SubmissionGradeChanged,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::AssignmentSubmittedLate => "assignment_submitted_late",
            NotificationKind::AssignmentSubmitted => "assignment_submitted",
            NotificationKind::AssignmentResubmitted => "assignment_resubmitted",
            NotificationKind::GroupAssignmentSubmittedLate => "group_assignment_submitted_late",
            NotificationKind::SubmissionGraded => "submission_graded",
            NotificationKind::SubmissionGradeChanged => "submission_grade_changed",
        }
    }

    /// 默认收件人
    pub fn recipient_for(&self, user_id: i64, context_id: i64) -> Recipient {
        match self {
            NotificationKind::SubmissionGraded | NotificationKind::SubmissionGradeChanged => {
                Recipient::Student { user_id }
            }
            _ => Recipient::AdminsInChargeOf {
                user_id,
                context_id,
            },
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// 收件人描述，由分发方解析为具体用户
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recipient {
    // 负责该学生的教师/助教
    AdminsInChargeOf { user_id: i64, context_id: i64 },
    Student { user_id: i64 },
}

/// 待分发的通知事件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationEvent {
    pub kind: NotificationKind,
    pub recipient: Recipient,
    pub submission_id: i64,
    pub assignment_id: i64,
    pub user_id: i64,
    pub occurred_at: DateTime<Utc>,
}
