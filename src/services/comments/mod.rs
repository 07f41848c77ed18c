//! 提交评论

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::assessments::entities::AssessmentRequestState;
use crate::models::assignments::entities::Assignment;
use crate::models::comments::entities::SubmissionComment;
use crate::models::comments::requests::AddCommentRequest;
use crate::models::submissions::entities::Submission;
use crate::models::users::entities::Actor;
use crate::services::permissions;

pub const MEDIA_COMMENT_TEXT: &str = "This is a media comment.";
pub const ATTACHED_FILES_TEXT: &str = "See attached files.";
const NO_COMMENT_TEXT: &str = "no comment";

/// 小组评论标识：同一天（或同一去重键）发给组内各成员的同一内容共享一个标识
pub fn group_comment_id(
    unique_key: Option<&str>,
    media_comment_id: Option<&str>,
    text: &str,
    now: DateTime<Utc>,
) -> String {
    let key = unique_key
        .map(str::to_string)
        .unwrap_or_else(|| now.date_naive().to_string());
    let content = match media_comment_id {
        Some(media) => media,
        None if !text.is_empty() => text,
        None => NO_COMMENT_TEXT,
    };
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{key}{content}").as_bytes()).to_string()
}

/// 空文本按媒体评论或附件补默认文字
fn comment_text(request: &AddCommentRequest) -> String {
    let text = request
        .comment
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if !text.is_empty() {
        return text;
    }
    if request.media_comment_id.is_some() {
        MEDIA_COMMENT_TEXT.to_string()
    } else if !request.attachment_ids.is_empty() {
        ATTACHED_FILES_TEXT.to_string()
    } else {
        text
    }
}

/// 构造评论；文本最终仍为空时不生成评论
pub fn build_comment(
    submission: &Submission,
    request: &AddCommentRequest,
    comment_id: i64,
    now: DateTime<Utc>,
) -> Option<SubmissionComment> {
    let text = comment_text(request);
    let group_comment_id = group_comment_id(
        request.unique_key.as_deref(),
        request.media_comment_id.as_deref(),
        &text,
        now,
    );
    if text.is_empty() {
        return None;
    }
    Some(SubmissionComment {
        id: comment_id,
        author_id: request.author_id.unwrap_or(submission.user_id),
        comment: text,
        media_comment_id: request.media_comment_id.clone(),
        media_comment_type: request.media_comment_type.clone(),
        group_comment_id,
        attachment_ids: request.attachment_ids.clone(),
        assessment_request_id: request.assessment_request_id,
        anonymous: request.anonymous,
        hidden: request.hidden,
        created_at: now,
    })
}

/// 把评论挂到提交上，并更新关联的互评请求
pub fn attach_comment(submission: &mut Submission, comment: SubmissionComment) {
    if let Some(request_id) = comment.assessment_request_id
        && let Some(request) = submission
            .assessment_requests
            .iter_mut()
            .find(|r| r.id == request_id)
    {
        request.comment_ids.push(comment.id);
        // 没有评分量表的互评以评论即视为完成
        if request.rubric_association_id.is_none() {
            request.state = AssessmentRequestState::Completed;
        }
    }
    submission.comments.push(comment);
}

/// 未隐藏的评论；指定 actor 时只保留其可读的
pub fn visible_comments<'a>(
    submission: &'a Submission,
    actor: Option<&Actor>,
    assignment: Option<&Assignment>,
    now: DateTime<Utc>,
) -> Vec<&'a SubmissionComment> {
    submission
        .comments
        .iter()
        .filter(|c| !c.hidden)
        .filter(|c| {
            actor.is_none_or(|actor| {
                permissions::can_read_comment(actor, submission, c, assignment, now)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::assessments::entities::{AssessmentRequest, AssessorAsset};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 10, 0, 0).unwrap()
    }

    fn submission() -> Submission {
        let mut submission = Submission::new(1, 2);
        submission.id = 9;
        submission
    }

    #[test]
    fn test_comment_defaults() {
        let submission = submission();
        let request = AddCommentRequest {
            comment: Some("  nice work  ".to_string()),
            ..Default::default()
        };
        let comment = build_comment(&submission, &request, 1, now()).unwrap();
        assert_eq!(comment.comment, "nice work");
        assert_eq!(comment.author_id, 2);

        let media = AddCommentRequest {
            comment: Some("   ".to_string()),
            media_comment_id: Some("m_1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            build_comment(&submission, &media, 2, now()).unwrap().comment,
            MEDIA_COMMENT_TEXT
        );

        let files = AddCommentRequest {
            attachment_ids: vec![4],
            ..Default::default()
        };
        assert_eq!(
            build_comment(&submission, &files, 3, now()).unwrap().comment,
            ATTACHED_FILES_TEXT
        );

        assert!(build_comment(&submission, &AddCommentRequest::default(), 4, now()).is_none());
    }

    #[test]
    fn test_group_comment_id_is_stable_per_day() {
        let a = group_comment_id(None, None, "same", now());
        let b = group_comment_id(None, None, "same", now() + chrono::TimeDelta::hours(2));
        let c = group_comment_id(None, None, "same", now() + chrono::TimeDelta::days(1));
        assert_eq!(a, b);
        assert_ne!(a, c);
        let keyed = group_comment_id(Some("batch-1"), Some("m_1"), "ignored", now());
        assert_eq!(keyed, group_comment_id(Some("batch-1"), Some("m_1"), "other", now()));
    }

    #[test]
    fn test_comment_completes_assessment_without_rubric() {
        let mut submission = submission();
        submission.assessment_requests.push(AssessmentRequest {
            id: 3,
            asset_submission_id: 9,
            assessor_asset: AssessorAsset::User(8),
            assessor_id: 8,
            user_id: 2,
            rubric_association_id: None,
            state: AssessmentRequestState::Assigned,
            comment_ids: Vec::new(),
        });
        let request = AddCommentRequest {
            author_id: Some(8),
            comment: Some("peer review".to_string()),
            assessment_request_id: Some(3),
            ..Default::default()
        };
        let comment = build_comment(&submission, &request, 11, now()).unwrap();
        attach_comment(&mut submission, comment);
        let request = &submission.assessment_requests[0];
        assert_eq!(request.state, AssessmentRequestState::Completed);
        assert_eq!(request.comment_ids, vec![11]);
    }

    #[test]
    fn test_visible_comments() {
        let mut submission = submission();
        for (id, author, hidden) in [(1, 70, false), (2, 70, true), (3, 2, false)] {
            let request = AddCommentRequest {
                author_id: Some(author),
                comment: Some(format!("comment {id}")),
                hidden,
                ..Default::default()
            };
            let comment = build_comment(&submission, &request, id, now()).unwrap();
            attach_comment(&mut submission, comment);
        }

        let all: Vec<i64> = visible_comments(&submission, None, None, now())
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(all, vec![1, 3]);

        let owner = Actor::student(2);
        assert_eq!(visible_comments(&submission, Some(&owner), None, now()).len(), 2);

        let stranger = Actor::student(99);
        assert!(visible_comments(&submission, Some(&stranger), None, now()).is_empty());
    }
}
