//! 分数钳制、等级推导与公开成绩

use tracing::debug;

use crate::models::assignments::entities::Assignment;
use crate::models::submissions::entities::Submission;
use crate::utils::format_score;

pub fn clamp_score(submission: &mut Submission, assignment: Option<&Assignment>) {
    let (Some(assignment), Some(score)) = (assignment, submission.score) else {
        return;
    };
    let clamped = assignment.clamp_score(score);
    if clamped != score {
        debug!(
            "Score {} for submission {} clamped to {}",
            score, submission.id, clamped
        );
        submission.score = Some(clamped);
    }
}

/// 分数变化时重新推导等级；没有作业上下文时用分数的字符串形式。
/// 没有分数就没有等级。
pub fn derive_grade(
    previous: Option<&Submission>,
    submission: &mut Submission,
    assignment: Option<&Assignment>,
) -> bool {
    let score_changed =
        previous.map_or(submission.score.is_some(), |p| p.score != submission.score);

    if score_changed && let Some(score) = submission.score {
        match assignment {
            Some(assignment) if assignment.derives_grade() => {
                submission.grade = Some(assignment.score_to_grade(score));
            }
            Some(_) => {}
            None => submission.grade = Some(format_score(score)),
        }
    }

    if submission.score.is_none() {
        submission.grade = None;
    }
    score_changed
}

/// 公开成绩与实时成绩保持一致
pub fn mirror_published(submission: &mut Submission) {
    submission.published_score = submission.score;
    submission.published_grade = submission.grade.clone();
}
