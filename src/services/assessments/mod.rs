//! 互评指派

use tracing::debug;

use crate::models::assessments::entities::{
    AssessmentRequest, AssessmentRequestState, AssessorAsset,
};
use crate::models::submissions::entities::Submission;

/// 指派结果
#[derive(Debug, Clone, PartialEq)]
pub struct AssessorAssignment {
    pub request: AssessmentRequest,
    pub just_created: bool,
}

/// 按 (评审方, 评审人, 评分量表) 查找或新建互评请求
pub fn assign_assessor(
    submission: &mut Submission,
    assessor_asset: AssessorAsset,
    assessor_id: i64,
    rubric_association_id: Option<i64>,
    next_request_id: i64,
) -> AssessorAssignment {
    if let Some(existing) = submission.assessment_requests.iter_mut().find(|r| {
        r.assessor_asset == assessor_asset
            && r.assessor_id == assessor_id
            && r.rubric_association_id == rubric_association_id
    }) {
        existing.user_id = submission.user_id;
        return AssessorAssignment {
            request: existing.clone(),
            just_created: false,
        };
    }

    let request = AssessmentRequest {
        id: next_request_id,
        asset_submission_id: submission.id,
        assessor_asset,
        assessor_id,
        user_id: submission.user_id,
        rubric_association_id,
        state: AssessmentRequestState::Assigned,
        comment_ids: Vec::new(),
    };
    debug!(
        "Assigned assessor {} to submission {} (request {})",
        assessor_id, submission.id, request.id
    );
    submission.assessment_requests.push(request.clone());
    AssessorAssignment {
        request,
        just_created: true,
    }
}

/// 评审者以自己的提交参与互评时，在其提交上记下被指派的评审
pub fn record_assigned_assessment(assessor_submission: &mut Submission, request_id: i64) -> bool {
    if assessor_submission.assigned_assessment_ids.contains(&request_id) {
        return false;
    }
    assessor_submission.assigned_assessment_ids.push(request_id);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> Submission {
        let mut submission = Submission::new(1, 2);
        submission.id = 10;
        submission
    }

    #[test]
    fn test_assign_is_find_or_create() {
        let mut submission = submission();
        let first = assign_assessor(&mut submission, AssessorAsset::User(8), 8, Some(4), 100);
        assert!(first.just_created);
        assert_eq!(first.request.state, AssessmentRequestState::Assigned);
        assert_eq!(first.request.user_id, 2);

        let again = assign_assessor(&mut submission, AssessorAsset::User(8), 8, Some(4), 101);
        assert!(!again.just_created);
        assert_eq!(again.request.id, 100);
        assert_eq!(submission.assessment_request_count(), 1);

        let other_rubric = assign_assessor(&mut submission, AssessorAsset::User(8), 8, None, 102);
        assert!(other_rubric.just_created);
        assert_eq!(submission.assessment_request_count(), 2);
    }

    #[test]
    fn test_submission_assessor_records_assignment() {
        let mut assessor_submission = Submission::new(1, 8);
        assessor_submission.id = 11;
        assert!(record_assigned_assessment(&mut assessor_submission, 100));
        assert!(!record_assigned_assessment(&mut assessor_submission, 100));
        assert_eq!(assessor_submission.assigned_assessment_count(), 1);
    }
}
