//! 查重轮询状态机
//!
//! 每个资源（文本提交或上传的附件）独立经历
//! `not_checked -> pending -> scored | error`。
//! 提交给查重服务成功后开始轮询，第 n 次轮询失败后等待 5·n 分钟再试，
//! 第 9 次仍无结果即记为错误，不再重试。

use std::time::Duration;

use crate::models::assignments::entities::Assignment;
use crate::models::plagiarism::entities::{CheckState, PlagiarismAsset, SimilarityReport};
use crate::models::submissions::entities::{Submission, SubmissionType};

/// 最大轮询次数
pub const MAX_STATUS_POLLS: u32 = 9;

/// 轮询间隔基数
pub const POLL_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// 第 `attempt` 次轮询失败后，距下一次轮询的等待时间
pub fn next_poll_delay(attempt: u32) -> Duration {
    POLL_INTERVAL * attempt.max(1)
}

/// 提交内容对应的查重资源标识
pub fn asset_strings(submission: &Submission) -> Vec<String> {
    match submission.submission_type {
        Some(SubmissionType::OnlineTextEntry) => vec![format!("submission_{}", submission.id)],
        Some(SubmissionType::OnlineUpload) => submission
            .attachment_ids
            .iter()
            .map(|id| format!("attachment_{id}"))
            .collect(),
        _ => Vec::new(),
    }
}

pub fn is_checkable(submission: &Submission, assignment: Option<&Assignment>) -> bool {
    submission
        .submission_type
        .is_some_and(|t| t.is_plagiarism_checkable())
        && assignment.is_some_and(|a| a.plagiarism_enabled)
}

/// 保存前准备：内容版本比上次送查时新，则把资源标记为待查并返回 true
pub fn prepare(submission: &mut Submission, assignment: Option<&Assignment>) -> bool {
    if !is_checkable(submission, assignment) {
        return false;
    }
    let attempt = submission.attempt;
    let stale = submission
        .plagiarism
        .last_processed_attempt
        .is_none_or(|last| last < attempt);
    if !stale {
        return false;
    }

    submission.plagiarism.last_processed_attempt = Some(attempt);
    for asset in asset_strings(submission) {
        submission
            .plagiarism
            .assets
            .insert(asset, PlagiarismAsset::pending());
    }
    true
}

/// 任务针对的内容版本仍是最近一次送查的版本；重新提交后旧版本的任务作废
pub fn is_current_attempt(submission: &Submission, content_attempt: i32) -> bool {
    submission.plagiarism.last_processed_attempt == Some(content_attempt)
}

/// 轮询开始前的判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStart {
    // 资源不存在、已出分或已报错：重复投递的任务直接忽略
    Skip,
    // 次数已用尽
    Exhausted,
    Poll,
}

pub fn begin_poll(asset: Option<&PlagiarismAsset>, attempt: u32) -> PollStart {
    let Some(asset) = asset else {
        return PollStart::Skip;
    };
    if asset.similarity_score.is_some() || asset.state == CheckState::Error {
        return PollStart::Skip;
    }
    if attempt > MAX_STATUS_POLLS {
        return PollStart::Exhausted;
    }
    PollStart::Poll
}

/// 一次轮询的结果
#[derive(Debug, Clone, PartialEq)]
pub enum PollDecision {
    Scored(SimilarityReport),
    Retry { next_attempt: u32, delay: Duration },
    Exhausted,
}

/// 根据服务返回决定下一步；服务报错与尚未出分同样处理
pub fn finish_poll(attempt: u32, report: Option<SimilarityReport>) -> PollDecision {
    match report {
        Some(report) => PollDecision::Scored(report),
        None if attempt >= MAX_STATUS_POLLS => PollDecision::Exhausted,
        None => PollDecision::Retry {
            next_attempt: attempt + 1,
            delay: next_poll_delay(attempt),
        },
    }
}

/// 把轮询结果写回资源
pub fn apply_poll(asset: &mut PlagiarismAsset, decision: &PollDecision) {
    asset.polls += 1;
    match decision {
        PollDecision::Scored(report) => asset.record_report(report),
        PollDecision::Exhausted => asset.mark_error(),
        PollDecision::Retry { .. } => asset.state = CheckState::Pending,
    }
}

/// 提交给查重服务失败且重试用尽：所有待查资源记为错误
pub fn mark_submit_failed(submission: &mut Submission) -> usize {
    let mut marked = 0;
    for asset in submission.plagiarism.assets.values_mut() {
        if asset.state == CheckState::Pending {
            asset.mark_error();
            marked += 1;
        }
    }
    marked
}

/// 报告链接的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportAudience {
    Instructor,
    Student,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::plagiarism::entities::SimilarityBucket;

    fn text_submission(attempt: i32) -> Submission {
        let mut submission = Submission::new(1, 2);
        submission.id = 42;
        submission.submission_type = Some(SubmissionType::OnlineTextEntry);
        submission.body = Some("essay".to_string());
        submission.attempt = attempt;
        submission
    }

    fn enabled() -> Assignment {
        Assignment {
            plagiarism_enabled: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_asset_strings() {
        let mut submission = text_submission(1);
        assert_eq!(asset_strings(&submission), vec!["submission_42"]);
        submission.submission_type = Some(SubmissionType::OnlineUpload);
        submission.attachment_ids = vec![7, 8];
        assert_eq!(asset_strings(&submission), vec!["attachment_7", "attachment_8"]);
        submission.submission_type = Some(SubmissionType::OnlineUrl);
        assert!(asset_strings(&submission).is_empty());
    }

    #[test]
    fn test_prepare_only_for_new_attempts() {
        let assignment = enabled();
        let mut submission = text_submission(1);
        assert!(prepare(&mut submission, Some(&assignment)));
        assert_eq!(submission.plagiarism.last_processed_attempt, Some(1));
        assert_eq!(
            submission.plagiarism.asset("submission_42").map(|a| a.state),
            Some(CheckState::Pending)
        );

        // 同一版本不再重复送查
        assert!(!prepare(&mut submission, Some(&assignment)));

        submission.attempt = 2;
        assert!(prepare(&mut submission, Some(&assignment)));
    }

    #[test]
    fn test_resubmission_retires_older_attempt() {
        let assignment = enabled();
        let mut submission = text_submission(1);
        prepare(&mut submission, Some(&assignment));
        assert!(is_current_attempt(&submission, 1));

        submission.attempt = 2;
        prepare(&mut submission, Some(&assignment));
        assert!(!is_current_attempt(&submission, 1));
        assert!(is_current_attempt(&submission, 2));
        assert!(!is_current_attempt(&text_submission(1), 1));
    }

    #[test]
    fn test_prepare_requires_enabled_assignment_and_checkable_type() {
        let mut submission = text_submission(1);
        assert!(!prepare(&mut submission, Some(&Assignment::default())));
        assert!(!prepare(&mut submission, None));

        submission.submission_type = Some(SubmissionType::OnlineUrl);
        assert!(!prepare(&mut submission, Some(&enabled())));
        assert!(submission.plagiarism.is_empty());
    }

    #[test]
    fn test_nine_failed_polls_end_in_error() {
        let mut asset = PlagiarismAsset::pending();
        let mut attempt = 1;
        let mut retries = Vec::new();
        loop {
            assert_eq!(begin_poll(Some(&asset), attempt), PollStart::Poll);
            let decision = finish_poll(attempt, None);
            apply_poll(&mut asset, &decision);
            match decision {
                PollDecision::Retry {
                    next_attempt,
                    delay,
                } => {
                    retries.push(delay);
                    attempt = next_attempt;
                }
                PollDecision::Exhausted => break,
                PollDecision::Scored(_) => unreachable!(),
            }
        }

        assert_eq!(asset.polls, 9);
        assert_eq!(asset.state, CheckState::Error);
        assert!(asset.error);
        assert_eq!(retries.len(), 8);
        assert_eq!(retries[0], Duration::from_secs(5 * 60));
        assert_eq!(retries[1], Duration::from_secs(10 * 60));
        assert_eq!(retries[7], Duration::from_secs(40 * 60));
        // 已报错的资源不再轮询
        assert_eq!(begin_poll(Some(&asset), 10), PollStart::Skip);
    }

    #[test]
    fn test_score_on_poll() {
        let mut asset = PlagiarismAsset::pending();
        let decision = finish_poll(
            3,
            Some(SimilarityReport {
                similarity_score: 80.0,
                ..Default::default()
            }),
        );
        apply_poll(&mut asset, &decision);
        assert_eq!(asset.state, CheckState::Scored);
        assert_eq!(asset.bucket, Some(SimilarityBucket::Failure));
        // 重复投递的轮询是空操作
        assert_eq!(begin_poll(Some(&asset), 4), PollStart::Skip);
    }

    #[test]
    fn test_stale_poll_beyond_budget() {
        let asset = PlagiarismAsset::pending();
        assert_eq!(begin_poll(Some(&asset), 10), PollStart::Exhausted);
        assert_eq!(begin_poll(None, 1), PollStart::Skip);
    }

    #[test]
    fn test_mark_submit_failed() {
        let mut submission = text_submission(1);
        prepare(&mut submission, Some(&enabled()));
        assert_eq!(mark_submit_failed(&mut submission), 1);
        assert_eq!(
            submission.plagiarism.asset("submission_42").map(|a| a.state),
            Some(CheckState::Error)
        );
    }
}
