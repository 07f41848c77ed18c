//! 提交保存前的派生字段计算
//!
//! 输入上一快照、新快照、作业评分策略以及适配层预先解析的外部查询结果，
//! 按固定顺序执行各阶段，输出新快照与变更标记。整个过程不做任何 I/O。

pub mod effects;
pub mod infer;
pub mod scoring;
pub mod workflow;

use chrono::{DateTime, Utc};

use crate::collaborators::QuizAttempt;
use crate::config::LimitConfig;
use crate::errors::Result;
use crate::models::assignments::entities::Assignment;
use crate::models::submissions::entities::{Submission, WorkflowState};
use crate::services::plagiarism;

pub use effects::{SideEffect, changes_worth_versioning, collect_side_effects};

/// 保存前由适配层解析好的外部查询结果
#[derive(Debug, Clone, Default)]
pub struct ResolvedLookups {
    pub enrolled: bool,
    pub quiz_attempt: Option<QuizAttempt>,
    pub media_object_id: Option<i64>,
}

/// 本次保存的变更标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeFlags {
    pub score_changed: bool,
    pub url_changed: bool,
    pub just_submitted: bool,
    pub submit_for_plagiarism: bool,
    pub graded_at_changed: bool,
    pub worth_versioning: bool,
}

#[derive(Debug, Clone)]
pub struct BeforeSave {
    pub submission: Submission,
    pub flags: ChangeFlags,
}

pub fn before_save(
    previous: Option<&Submission>,
    mut submission: Submission,
    assignment: Option<&Assignment>,
    lookups: &ResolvedLookups,
    limits: &LimitConfig,
    now: DateTime<Utc>,
) -> Result<BeforeSave> {
    workflow::validate_requested_transition(previous, &submission)?;

    infer::link_quiz_attempt(&mut submission, lookups);
    infer::apply_pending_quiz_state(&mut submission, lookups);
    infer::normalize_single_submission(&mut submission, limits)?;
    infer::stamp_submitted_at(&mut submission, now);
    infer::validate_references(previous, &submission, lookups)?;

    scoring::clamp_score(&mut submission, assignment);
    let score_changed = scoring::derive_grade(previous, &mut submission, assignment);

    workflow::advance_workflow(&mut submission);
    let graded_at_changed = workflow::stamp_graded_at(previous, &mut submission, assignment, now);

    infer::normalize_media_comment(previous, &mut submission, lookups);
    infer::bump_attempt(previous, &mut submission);
    scoring::mirror_published(&mut submission);
    let submit_for_plagiarism = plagiarism::prepare(&mut submission, assignment);

    let url_changed = submission.url.is_some()
        && previous.is_none_or(|p| p.url != submission.url);
    let just_submitted = submission.workflow_state == WorkflowState::Submitted
        && submission.has_submission()
        && previous.is_none_or(|p| p.workflow_state != submission.workflow_state);

    if previous.is_none() {
        submission.created_at = now;
    }
    submission.updated_at = now;

    let worth_versioning = match previous {
        None => true,
        Some(prev) => changes_worth_versioning(prev, &submission)?,
    };

    Ok(BeforeSave {
        submission,
        flags: ChangeFlags {
            score_changed,
            url_changed,
            just_submitted,
            submit_for_plagiarism,
            graded_at_changed,
            worth_versioning,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::models::plagiarism::entities::CheckState;
    use crate::models::submissions::entities::SubmissionType;
    use chrono::TimeDelta;

    fn limits() -> LimitConfig {
        AppConfig::default().limits
    }

    fn enrolled() -> ResolvedLookups {
        ResolvedLookups {
            enrolled: true,
            ..Default::default()
        }
    }

    fn assignment() -> Assignment {
        Assignment {
            id: 1,
            context_id: 9,
            points_possible: 100.0,
            max_score: Some(100.0),
            min_score: Some(0.0),
            plagiarism_enabled: true,
            ..Default::default()
        }
    }

    fn text_entry() -> Submission {
        let mut submission = Submission::new(1, 2);
        submission.id = 11;
        submission.body = Some("my essay".to_string());
        submission.workflow_state = WorkflowState::Submitted;
        submission
    }

    #[test]
    fn test_first_submission() {
        let now = Utc::now();
        let result = before_save(
            None,
            text_entry(),
            Some(&assignment()),
            &enrolled(),
            &limits(),
            now,
        )
        .unwrap();
        let saved = result.submission;
        assert_eq!(saved.submission_type, Some(SubmissionType::OnlineTextEntry));
        assert_eq!(saved.submitted_at, Some(now));
        assert_eq!(saved.attempt, 1);
        assert_eq!(saved.workflow_state, WorkflowState::Submitted);
        assert_eq!(
            saved.plagiarism.asset("submission_11").map(|a| a.state),
            Some(CheckState::Pending)
        );
        assert!(result.flags.just_submitted);
        assert!(result.flags.submit_for_plagiarism);
        assert!(result.flags.worth_versioning);
        assert!(!result.flags.score_changed);
    }

    #[test]
    fn test_grading_clamps_and_derives() {
        let now = Utc::now();
        let first = before_save(
            None,
            text_entry(),
            Some(&assignment()),
            &enrolled(),
            &limits(),
            now,
        )
        .unwrap()
        .submission;

        let mut graded = first.clone();
        graded.score = Some(150.0);
        graded.grade_matches_current_submission = true;
        let later = now + TimeDelta::minutes(2);
        let result = before_save(
            Some(&first),
            graded,
            Some(&assignment()),
            &ResolvedLookups::default(),
            &limits(),
            later,
        )
        .unwrap();
        let saved = result.submission;
        assert_eq!(saved.score, Some(100.0));
        assert_eq!(saved.grade.as_deref(), Some("100"));
        assert_eq!(saved.published_score, Some(100.0));
        assert_eq!(saved.workflow_state, WorkflowState::Graded);
        assert_eq!(saved.graded_at, Some(later));
        assert_eq!(saved.attempt, 1);
        assert!(saved.changed_since_publish);
        assert!(result.flags.score_changed);
        assert!(result.flags.graded_at_changed);
        assert!(!result.flags.just_submitted);
        // 同一版本不重复送查
        assert!(!result.flags.submit_for_plagiarism);
    }

    #[test]
    fn test_resubmission_bumps_attempt() {
        let now = Utc::now();
        let first = before_save(
            None,
            text_entry(),
            Some(&assignment()),
            &enrolled(),
            &limits(),
            now,
        )
        .unwrap()
        .submission;
        let mut again = first.clone();
        again.body = Some("second draft".to_string());
        again.submitted_at = Some(now + TimeDelta::hours(1));
        let result = before_save(
            Some(&first),
            again,
            Some(&assignment()),
            &enrolled(),
            &limits(),
            now + TimeDelta::hours(1),
        )
        .unwrap();
        assert_eq!(result.submission.attempt, 2);
        assert!(result.flags.submit_for_plagiarism);
    }

    #[test]
    fn test_unenrolled_student_cannot_submit() {
        let err = before_save(
            None,
            text_entry(),
            Some(&assignment()),
            &ResolvedLookups::default(),
            &limits(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(err.blocks_save());
        assert_eq!(
            err.message(),
            "Cannot submit to an assignment when the student is not properly enrolled."
        );
    }

    #[test]
    fn test_bookkeeping_only_save_is_not_versioned() {
        let now = Utc::now();
        let first = before_save(
            None,
            text_entry(),
            Some(&assignment()),
            &enrolled(),
            &limits(),
            now,
        )
        .unwrap()
        .submission;
        let mut touched = first.clone();
        touched.process_attempts = 1;
        let result = before_save(
            Some(&first),
            touched,
            Some(&assignment()),
            &enrolled(),
            &limits(),
            now + TimeDelta::seconds(30),
        )
        .unwrap();
        assert!(!result.flags.worth_versioning);
    }

    #[test]
    fn test_missing_assignment_context_falls_back() {
        let mut submission = text_entry();
        submission.score = Some(12.0);
        let saved = before_save(None, submission, None, &enrolled(), &limits(), Utc::now())
            .unwrap()
            .submission;
        assert_eq!(saved.grade.as_deref(), Some("12"));
        assert!(saved.plagiarism.is_empty());
    }
}
