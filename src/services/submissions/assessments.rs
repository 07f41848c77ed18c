use tracing::info;

use super::SubmissionService;
use crate::errors::Result;
use crate::models::assessments::entities::{AssessmentRequest, AssessorAsset};
use crate::services::assessments::{self, AssessorAssignment};

pub async fn assign_assessor(
    service: &SubmissionService,
    submission_id: i64,
    assessor: AssessorAsset,
    rubric_association_id: Option<i64>,
) -> Result<AssessmentRequest> {
    let mut submission = service.load_submission(submission_id).await?;

    // 以提交作为评审方时，评审人是该提交的学生
    let mut assessor_submission = None;
    let assessor_id = match assessor {
        AssessorAsset::User(user_id) => user_id,
        AssessorAsset::Submission(id) => {
            let found = service.load_submission(id).await?;
            let user_id = found.user_id;
            assessor_submission = Some(found);
            user_id
        }
    };

    // 已有请求时不会用到这个 ID
    let next_request_id = service.store.next_id().await?;

    let AssessorAssignment {
        request,
        just_created,
    } = assessments::assign_assessor(
        &mut submission,
        assessor,
        assessor_id,
        rubric_association_id,
        next_request_id,
    );
    service.save_without_broadcast(submission).await?;

    if just_created {
        info!(
            "Assessment request {} created for submission {} (assessor {})",
            request.id, submission_id, request.assessor_id
        );
        if let Some(mut assessor_submission) = assessor_submission
            && assessments::record_assigned_assessment(&mut assessor_submission, request.id)
        {
            service.save_without_broadcast(assessor_submission).await?;
        }
    }
    Ok(request)
}
