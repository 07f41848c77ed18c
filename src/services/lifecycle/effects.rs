//! 保存后的副作用意图
//!
//! 这里只决定"要做什么"，由适配层放入任务队列执行。

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ChangeFlags;
use crate::collaborators::ModuleProgress;
use crate::errors::Result;
use crate::models::assignments::entities::Assignment;
use crate::models::submissions::entities::{Submission, SubmissionType};

/// 评分后多久内推送动态
pub const STREAM_ITEM_WINDOW: TimeDelta = TimeDelta::minutes(5);

// 不值得单独记一个版本的字段
const UNVERSIONED_FIELDS: [&str; 7] = [
    "updated_at",
    "processed",
    "process_attempts",
    "changed_since_publish",
    "grade_matches_current_submission",
    "published_score",
    "published_grade",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    RecomputeFinalScore {
        user_id: i64,
        context_id: i64,
    },
    RecordModuleProgress {
        user_id: i64,
        assignment_id: i64,
        progress: ModuleProgress,
    },
    NotifyGradersOfSubmission {
        assignment_id: i64,
    },
    SubmitForPlagiarismCheck {
        submission_id: i64,
        content_attempt: i32,
    },
    CaptureScreenshot {
        submission_id: i64,
    },
    PublishStreamItem {
        submission_id: i64,
        user_id: i64,
    },
}

impl SideEffect {
    /// 截图是低优先级任务
    pub fn is_low_priority(&self) -> bool {
        matches!(self, SideEffect::CaptureScreenshot { .. })
    }
}

pub fn collect_side_effects(
    saved: &Submission,
    assignment: Option<&Assignment>,
    flags: &ChangeFlags,
    now: DateTime<Utc>,
) -> Vec<SideEffect> {
    let mut effects = Vec::new();

    if flags.score_changed
        && let Some(assignment) = assignment
    {
        effects.push(SideEffect::RecomputeFinalScore {
            user_id: saved.user_id,
            context_id: assignment.context_id,
        });
    }

    if (flags.score_changed || flags.just_submitted) && assignment.is_some() {
        let progress = match saved.score {
            Some(score) => Some(ModuleProgress::Scored(score)),
            None if flags.just_submitted => Some(ModuleProgress::Submitted),
            None => None,
        };
        if let Some(progress) = progress {
            effects.push(SideEffect::RecordModuleProgress {
                user_id: saved.user_id,
                assignment_id: saved.assignment_id,
                progress,
            });
        }
    }

    if flags.just_submitted {
        effects.push(SideEffect::NotifyGradersOfSubmission {
            assignment_id: saved.assignment_id,
        });
    }

    if flags.submit_for_plagiarism {
        effects.push(SideEffect::SubmitForPlagiarismCheck {
            submission_id: saved.id,
            content_attempt: saved.attempt,
        });
    }

    if flags.url_changed
        && saved.screenshot_attachment_id.is_none()
        && saved.submission_type == Some(SubmissionType::OnlineUrl)
    {
        effects.push(SideEffect::CaptureScreenshot {
            submission_id: saved.id,
        });
    }

    if (flags.graded_at_changed || flags.score_changed)
        && saved
            .graded_at
            .is_some_and(|graded_at| graded_at > now - STREAM_ITEM_WINDOW)
    {
        effects.push(SideEffect::PublishStreamItem {
            submission_id: saved.id,
            user_id: saved.user_id,
        });
    }

    effects
}

/// 除去簿记字段后是否还有变化（查重数据变化也算）
pub fn changes_worth_versioning(previous: &Submission, next: &Submission) -> Result<bool> {
    let mut before = serde_json::to_value(previous)?;
    let mut after = serde_json::to_value(next)?;
    for value in [&mut before, &mut after] {
        if let Value::Object(map) = value {
            for field in UNVERSIONED_FIELDS {
                map.remove(field);
            }
        }
    }
    Ok(before != after)
}
