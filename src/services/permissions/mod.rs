//! 提交的能力检查
//!
//! 每条规则是"满足条件 -> 授予一组能力"，按顺序求并集。

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::errors::{LifecycleError, Result};
use crate::models::assignments::entities::{Assignment, ReportVisibility};
use crate::models::comments::entities::SubmissionComment;
use crate::models::submissions::entities::Submission;
use crate::models::users::entities::{Actor, Capability};

use Capability::*;

struct Rule {
    applies: fn(&Actor, &Submission) -> bool,
    grants: &'static [Capability],
}

const RULES: [Rule; 5] = [
    // 提交者本人
    Rule {
        applies: |actor, submission| actor.user_id == submission.user_id,
        grants: &[Read, Comment, MakeGroupComment, ReadGrade, Submit],
    },
    // 有效的观察者
    Rule {
        applies: |actor, submission| actor.observed_user_ids.contains(&submission.user_id),
        grants: &[Read, ReadComments],
    },
    Rule {
        applies: |actor, _| actor.manage_grades,
        grants: &[Read, Comment, MakeGroupComment, ReadGrade, Grade],
    },
    Rule {
        applies: |actor, _| actor.view_all_grades,
        grants: &[Read, ReadGrade],
    },
    // 被指派的互评者
    Rule {
        applies: |actor, submission| {
            submission
                .assessment_requests
                .iter()
                .any(|r| r.assessor_id == actor.user_id)
        },
        grants: &[Read, Comment],
    },
];

/// 查重报告对学生的可见性
fn report_visible(submission: &Submission, assignment: &Assignment, now: DateTime<Utc>) -> bool {
    match assignment.originality_report_visibility {
        ReportVisibility::Immediate => true,
        ReportVisibility::AfterGrading => submission.current_submission_graded(),
        ReportVisibility::AfterDueDate => assignment.due_at.is_some_and(|due| due < now),
        ReportVisibility::Never => false,
    }
}

/// actor 对提交拥有的全部能力
pub fn rights(
    actor: &Actor,
    submission: &Submission,
    assignment: Option<&Assignment>,
    now: DateTime<Utc>,
) -> BTreeSet<Capability> {
    let mut granted: BTreeSet<Capability> = RULES
        .iter()
        .filter(|rule| (rule.applies)(actor, submission))
        .flat_map(|rule| rule.grants.iter().copied())
        .collect();

    if granted.contains(&Read)
        && !submission.plagiarism.is_empty()
        && let Some(assignment) = assignment
        && (actor.manage_grades || report_visible(submission, assignment, now))
    {
        granted.insert(ViewPlagiarismReport);
    }
    granted
}

pub fn grants_right(
    actor: &Actor,
    submission: &Submission,
    assignment: Option<&Assignment>,
    capability: Capability,
    now: DateTime<Utc>,
) -> bool {
    rights(actor, submission, assignment, now).contains(&capability)
}

pub fn ensure_right(
    actor: &Actor,
    submission: &Submission,
    assignment: Option<&Assignment>,
    capability: Capability,
    now: DateTime<Utc>,
) -> Result<()> {
    if grants_right(actor, submission, assignment, capability, now) {
        Ok(())
    } else {
        Err(LifecycleError::authorization(format!(
            "User {} may not {} submission {}",
            actor.user_id, capability, submission.id
        )))
    }
}

/// 单条评论是否可读：作者与评分者总能看到，其余需要能读取提交且评论未隐藏
pub fn can_read_comment(
    actor: &Actor,
    submission: &Submission,
    comment: &SubmissionComment,
    assignment: Option<&Assignment>,
    now: DateTime<Utc>,
) -> bool {
    if comment.author_id == actor.user_id || actor.manage_grades {
        return true;
    }
    if comment.hidden {
        return false;
    }
    let granted = rights(actor, submission, assignment, now);
    granted.contains(&Read) || granted.contains(&ReadComments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessments::entities::{
        AssessmentRequest, AssessmentRequestState, AssessorAsset,
    };
    use crate::models::plagiarism::entities::PlagiarismAsset;
    use chrono::TimeDelta;

    fn submission() -> Submission {
        let mut submission = Submission::new(1, 2);
        submission.id = 5;
        submission
    }

    fn with_report(visibility: ReportVisibility) -> (Submission, Assignment) {
        let mut submission = submission();
        submission
            .plagiarism
            .assets
            .insert("submission_5".to_string(), PlagiarismAsset::pending());
        let assignment = Assignment {
            originality_report_visibility: visibility,
            ..Default::default()
        };
        (submission, assignment)
    }

    #[test]
    fn test_owner_rights() {
        let granted = rights(&Actor::student(2), &submission(), None, Utc::now());
        assert_eq!(
            granted.into_iter().collect::<Vec<_>>(),
            vec![Read, Comment, MakeGroupComment, ReadGrade, Submit]
        );
    }

    #[test]
    fn test_observer_and_stranger() {
        let now = Utc::now();
        let observer = Actor::observer_of(50, &[2]);
        assert!(grants_right(&observer, &submission(), None, ReadComments, now));
        assert!(!grants_right(&observer, &submission(), None, Comment, now));

        let stranger = Actor::student(99);
        assert!(rights(&stranger, &submission(), None, now).is_empty());
        let err = ensure_right(&stranger, &submission(), None, Read, now).unwrap_err();
        assert_eq!(err.code(), "E004");
    }

    #[test]
    fn test_grader_can_grade_but_not_submit() {
        let now = Utc::now();
        let grader = Actor::grader(70);
        assert!(grants_right(&grader, &submission(), None, Grade, now));
        assert!(!grants_right(&grader, &submission(), None, Submit, now));
    }

    #[test]
    fn test_assessor_can_comment() {
        let mut submission = submission();
        submission.assessment_requests.push(AssessmentRequest {
            id: 1,
            asset_submission_id: 5,
            assessor_asset: AssessorAsset::User(8),
            assessor_id: 8,
            user_id: 2,
            rubric_association_id: None,
            state: AssessmentRequestState::Assigned,
            comment_ids: Vec::new(),
        });
        let granted = rights(&Actor::student(8), &submission, None, Utc::now());
        assert!(granted.contains(&Comment));
        assert!(!granted.contains(&ReadGrade));
    }

    #[test]
    fn test_plagiarism_report_visibility() {
        let now = Utc::now();
        let student = Actor::student(2);

        let (submission, assignment) = with_report(ReportVisibility::Immediate);
        assert!(grants_right(&student, &submission, Some(&assignment), ViewPlagiarismReport, now));

        let (submission, assignment) = with_report(ReportVisibility::Never);
        assert!(!grants_right(&student, &submission, Some(&assignment), ViewPlagiarismReport, now));
        assert!(grants_right(
            &Actor::grader(70),
            &submission,
            Some(&assignment),
            ViewPlagiarismReport,
            now
        ));

        let (submission, mut assignment) = with_report(ReportVisibility::AfterDueDate);
        assignment.due_at = Some(now + TimeDelta::days(1));
        assert!(!grants_right(&student, &submission, Some(&assignment), ViewPlagiarismReport, now));
        assignment.due_at = Some(now - TimeDelta::days(1));
        assert!(grants_right(&student, &submission, Some(&assignment), ViewPlagiarismReport, now));

        // 没有查重数据就没有报告
        let assignment = Assignment::default();
        assert!(!grants_right(
            &student,
            &self::submission(),
            Some(&assignment),
            ViewPlagiarismReport,
            now
        ));
    }
}
