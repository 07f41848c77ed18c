//! 工作流状态推进与评分时间

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::{LifecycleError, Result};
use crate::models::assignments::entities::Assignment;
use crate::models::submissions::entities::{Submission, SubmissionType, WorkflowState};

/// 校验调用方显式请求的状态变更
///
/// 只有与上一快照不同的状态才视为显式请求；由流水线推导出的状态不经过此处。
pub fn validate_requested_transition(
    previous: Option<&Submission>,
    submission: &Submission,
) -> Result<()> {
    let from = previous.map_or(WorkflowState::Unsubmitted, |p| p.workflow_state);
    let to = submission.workflow_state;
    if from == to {
        return Ok(());
    }
    if !from.can_transition_to(to) {
        return Err(LifecycleError::invalid_transition(format!(
            "Submission cannot move from {from} to {to}"
        )));
    }
    match to {
        WorkflowState::Graded
            if submission.score.is_none() || !submission.grade_matches_current_submission =>
        {
            Err(LifecycleError::invalid_transition(
                "A submission can only be graded with a score for the current submission",
            ))
        }
        WorkflowState::PendingReview
            if submission.submission_type != Some(SubmissionType::OnlineQuiz) =>
        {
            Err(LifecycleError::invalid_transition(
                "Only quiz submissions can be pending review",
            ))
        }
        _ => Ok(()),
    }
}

/// 根据内容和成绩推进状态
pub fn advance_workflow(submission: &mut Submission) {
    let before = submission.workflow_state;

    if submission.workflow_state == WorkflowState::Submitted && !submission.has_submission() {
        submission.workflow_state = WorkflowState::Unsubmitted;
    }
    if submission.grade.is_some()
        && submission.score.is_some()
        && submission.grade_matches_current_submission
    {
        submission.workflow_state = WorkflowState::Graded;
    }
    // graded 的前提不再成立时降级
    if submission.workflow_state == WorkflowState::Graded
        && (submission.score.is_none() || !submission.grade_matches_current_submission)
    {
        submission.workflow_state = if submission.has_submission() {
            WorkflowState::Submitted
        } else {
            WorkflowState::Unsubmitted
        };
    }

    if before != submission.workflow_state {
        debug!(
            "Submission {} workflow {} -> {}",
            submission.id, before, submission.workflow_state
        );
    }
}

/// 进入 graded 时记录评分时间；已发布作业的评分时间变化要标记 changed_since_publish
pub fn stamp_graded_at(
    previous: Option<&Submission>,
    submission: &mut Submission,
    assignment: Option<&Assignment>,
    now: DateTime<Utc>,
) -> bool {
    let previous_state = previous.map(|p| p.workflow_state);
    if submission.workflow_state == WorkflowState::Graded
        && previous_state != Some(WorkflowState::Graded)
    {
        submission.graded_at = Some(now);
    }

    let graded_at_changed = previous.map_or(submission.graded_at.is_some(), |p| {
        p.graded_at != submission.graded_at
    });
    let available = assignment.is_some_and(|a| a.published && a.context_available);
    if submission.workflow_state == WorkflowState::Graded && graded_at_changed && available {
        submission.changed_since_publish = true;
    }
    graded_at_changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn submitted() -> Submission {
        let mut submission = Submission::new(1, 2);
        submission.submission_type = Some(SubmissionType::OnlineTextEntry);
        submission.body = Some("essay".to_string());
        submission.workflow_state = WorkflowState::Submitted;
        submission
    }

    #[test]
    fn test_submitted_without_content_is_unsubmitted() {
        let mut submission = Submission::new(1, 2);
        submission.workflow_state = WorkflowState::Submitted;
        advance_workflow(&mut submission);
        assert_eq!(submission.workflow_state, WorkflowState::Unsubmitted);
    }

    #[test]
    fn test_graded_requires_matching_score() {
        let mut submission = submitted();
        submission.score = Some(9.0);
        submission.grade = Some("9".to_string());
        advance_workflow(&mut submission);
        assert_eq!(submission.workflow_state, WorkflowState::Submitted);

        submission.grade_matches_current_submission = true;
        advance_workflow(&mut submission);
        assert_eq!(submission.workflow_state, WorkflowState::Graded);
    }

    #[test]
    fn test_graded_demoted_when_invariant_breaks() {
        let mut submission = submitted();
        submission.workflow_state = WorkflowState::Graded;
        submission.score = None;
        advance_workflow(&mut submission);
        assert_eq!(submission.workflow_state, WorkflowState::Submitted);

        let mut empty = Submission::new(1, 2);
        empty.workflow_state = WorkflowState::Graded;
        advance_workflow(&mut empty);
        assert_eq!(empty.workflow_state, WorkflowState::Unsubmitted);
    }

    #[test]
    fn test_requested_transitions() {
        let mut previous = submitted();
        previous.workflow_state = WorkflowState::PendingReview;
        previous.submission_type = Some(SubmissionType::OnlineQuiz);
        let mut next = previous.clone();
        next.workflow_state = WorkflowState::Unsubmitted;
        let err = validate_requested_transition(Some(&previous), &next).unwrap_err();
        assert_eq!(err.code(), "E005");

        let previous = submitted();
        let mut next = previous.clone();
        next.workflow_state = WorkflowState::Graded;
        assert!(validate_requested_transition(Some(&previous), &next).is_err());
        next.score = Some(5.0);
        next.grade_matches_current_submission = true;
        assert!(validate_requested_transition(Some(&previous), &next).is_ok());

        let mut next = previous.clone();
        next.workflow_state = WorkflowState::PendingReview;
        assert!(validate_requested_transition(Some(&previous), &next).is_err());
    }

    #[test]
    fn test_graded_at_stamped_once_per_transition() {
        let assignment = Assignment::default();
        let t0 = Utc::now();
        let previous = submitted();
        let mut graded = previous.clone();
        graded.workflow_state = WorkflowState::Graded;
        assert!(stamp_graded_at(Some(&previous), &mut graded, Some(&assignment), t0));
        assert_eq!(graded.graded_at, Some(t0));
        assert!(graded.changed_since_publish);

        // 已是 graded 的再次保存不改评分时间
        let previous = graded.clone();
        let mut regraded = graded.clone();
        regraded.score = Some(1.0);
        assert!(!stamp_graded_at(
            Some(&previous),
            &mut regraded,
            Some(&assignment),
            t0 + TimeDelta::minutes(10)
        ));
        assert_eq!(regraded.graded_at, Some(t0));
    }

    #[test]
    fn test_unpublished_assignment_does_not_mark_changed() {
        let assignment = Assignment {
            published: false,
            ..Default::default()
        };
        let previous = submitted();
        let mut graded = previous.clone();
        graded.workflow_state = WorkflowState::Graded;
        stamp_graded_at(Some(&previous), &mut graded, Some(&assignment), Utc::now());
        assert!(graded.graded_at.is_some());
        assert!(!graded.changed_since_publish);
    }
}
