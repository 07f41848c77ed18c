//! 网址提交的网页截图

use std::time::Duration;

use crate::models::submissions::entities::{Submission, SubmissionType};

/// 截图失败后的重试间隔
pub const CAPTURE_RETRY_DELAY: Duration = Duration::from_secs(5 * 60);

/// 截图任务开始前的判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStart {
    Disabled,
    // 已有截图、已不是网址提交或次数用尽
    Skip,
    Capture,
}

pub fn begin_capture(
    submission: &Submission,
    enabled: bool,
    max_process_attempts: i32,
) -> CaptureStart {
    if !enabled {
        return CaptureStart::Disabled;
    }
    if submission.screenshot_attachment_id.is_some()
        || submission.submission_type != Some(SubmissionType::OnlineUrl)
        || submission.url.is_none()
        || submission.process_attempts >= max_process_attempts
    {
        return CaptureStart::Skip;
    }
    CaptureStart::Capture
}

pub fn record_capture_success(submission: &mut Submission, attachment_id: i64) {
    submission.screenshot_attachment_id = Some(attachment_id);
    submission.processed = true;
}

/// 记录一次失败，返回是否还应重试
pub fn record_capture_failure(submission: &mut Submission, max_process_attempts: i32) -> bool {
    submission.process_attempts += 1;
    submission.process_attempts < max_process_attempts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url_submission() -> Submission {
        let mut submission = Submission::new(1, 2);
        submission.submission_type = Some(SubmissionType::OnlineUrl);
        submission.url = Some("http://example.com".to_string());
        submission
    }

    #[test]
    fn test_begin_capture() {
        let submission = url_submission();
        assert_eq!(begin_capture(&submission, false, 3), CaptureStart::Disabled);
        assert_eq!(begin_capture(&submission, true, 3), CaptureStart::Capture);

        let mut text = url_submission();
        text.submission_type = Some(SubmissionType::OnlineTextEntry);
        assert_eq!(begin_capture(&text, true, 3), CaptureStart::Skip);
    }

    #[test]
    fn test_failures_exhaust_budget() {
        let mut submission = url_submission();
        assert!(record_capture_failure(&mut submission, 3));
        assert!(record_capture_failure(&mut submission, 3));
        assert!(!record_capture_failure(&mut submission, 3));
        assert_eq!(begin_capture(&submission, true, 3), CaptureStart::Skip);
    }

    #[test]
    fn test_success_marks_processed() {
        let mut submission = url_submission();
        record_capture_success(&mut submission, 44);
        assert!(submission.is_processed());
        assert_eq!(begin_capture(&submission, true, 3), CaptureStart::Skip);
    }
}
