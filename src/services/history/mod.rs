//! 提交版本日志与提交历史重建

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::Result;
use crate::models::submissions::entities::Submission;

/// 一个不可变的历史快照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionVersion {
    pub number: u32,
    pub created_at: DateTime<Utc>,
    pub model_json: String,
}

impl SubmissionVersion {
    pub fn capture(
        number: u32,
        submission: &Submission,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            number,
            created_at,
            model_json: serde_json::to_string(submission)?,
        })
    }

    /// 还原快照
    pub fn model(&self) -> Result<Submission> {
        Ok(serde_json::from_str(&self.model_json)?)
    }
}

/// 只追加的版本日志
#[derive(Debug, Clone, Default)]
pub struct VersionLog {
    versions: Vec<SubmissionVersion>,
}

impl VersionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_versions(mut versions: Vec<SubmissionVersion>) -> Self {
        versions.sort_by_key(|v| v.number);
        Self { versions }
    }

    pub fn append(
        &mut self,
        submission: &Submission,
        at: DateTime<Utc>,
    ) -> Result<&SubmissionVersion> {
        let number = self.versions.last().map_or(1, |v| v.number + 1);
        self.versions
            .push(SubmissionVersion::capture(number, submission, at)?);
        Ok(&self.versions[self.versions.len() - 1])
    }

    pub fn versions(&self) -> &[SubmissionVersion] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// 没有提交时间的快照按此时间排序
pub fn history_floor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// 从快照序列重建提交历史
///
/// 由新到旧遍历，提交时间（按秒）与上一条保留的不同则保留；
/// 一条都没保留时退回最早的快照。结果按提交时间升序。
pub fn reconstruct_history(snapshots: &[(DateTime<Utc>, Submission)]) -> Vec<Submission> {
    let mut ordered: Vec<&(DateTime<Utc>, Submission)> = snapshots.iter().collect();
    ordered.sort_by_key(|(created_at, _)| *created_at);

    let mut kept: Vec<Submission> = Vec::new();
    let mut last_submitted_at: Option<i64> = None;
    for (_, model) in ordered.iter().rev() {
        let Some(submitted_at) = model.effective_submitted_at() else {
            continue;
        };
        if last_submitted_at != Some(submitted_at.timestamp()) {
            last_submitted_at = Some(submitted_at.timestamp());
            kept.push(model.clone());
        }
    }

    if kept.is_empty() {
        kept = ordered.first().map(|(_, m)| m.clone()).into_iter().collect();
    }

    let floor = history_floor();
    kept.sort_by_key(|s| s.effective_submitted_at().unwrap_or(floor));
    kept
}

/// 版本日志上的提交历史；无法还原的快照跳过
pub fn submission_history(log: &VersionLog) -> Vec<Submission> {
    let snapshots: Vec<(DateTime<Utc>, Submission)> = log
        .versions()
        .iter()
        .filter_map(|version| match version.model() {
            Ok(model) => Some((version.created_at, model)),
            Err(e) => {
                warn!(
                    "Skipping unreadable submission version {}: {}",
                    version.number, e
                );
                None
            }
        })
        .collect();
    reconstruct_history(&snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::submissions::entities::SubmissionType;
    use chrono::TimeDelta;

    fn snapshot(submitted_at: Option<DateTime<Utc>>, body: &str) -> Submission {
        let mut submission = Submission::new(1, 2);
        submission.submitted_at = submitted_at;
        submission.body = Some(body.to_string());
        submission
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_versions_collapse_by_submitted_at() {
        let t = base();
        let mut log = VersionLog::new();
        log.append(&snapshot(Some(t), "draft 1"), t).unwrap();
        // 同一次提交被评分：提交时间不变
        log.append(&snapshot(Some(t), "draft 1 graded"), t + TimeDelta::hours(1))
            .unwrap();
        log.append(
            &snapshot(Some(t + TimeDelta::days(1)), "draft 2"),
            t + TimeDelta::days(1),
        )
        .unwrap();

        let history = submission_history(&log);
        assert_eq!(history.len(), 2);
        // 同一提交时间保留最新的快照
        assert_eq!(history[0].body.as_deref(), Some("draft 1 graded"));
        assert_eq!(history[1].body.as_deref(), Some("draft 2"));
        assert_eq!(log.versions()[2].number, 3);
    }

    #[test]
    fn test_sub_second_differences_collapse() {
        let t = base();
        let snapshots = vec![
            (t, snapshot(Some(t), "a")),
            (
                t + TimeDelta::minutes(1),
                snapshot(Some(t + TimeDelta::milliseconds(300)), "b"),
            ),
        ];
        assert_eq!(reconstruct_history(&snapshots).len(), 1);
    }

    #[test]
    fn test_fallback_to_earliest_version() {
        let t = base();
        let snapshots = vec![
            (t + TimeDelta::hours(1), snapshot(None, "later")),
            (t, snapshot(None, "earliest")),
        ];
        let history = reconstruct_history(&snapshots);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].body.as_deref(), Some("earliest"));
    }

    #[test]
    fn test_typed_snapshot_without_submitted_at_uses_updated_at() {
        let t = base();
        let mut legacy = snapshot(None, "legacy upload");
        legacy.submission_type = Some(SubmissionType::OnlineUpload);
        legacy.updated_at = t;
        let snapshots = vec![
            (t, legacy),
            (
                t + TimeDelta::days(1),
                snapshot(Some(t + TimeDelta::days(1)), "resubmitted"),
            ),
        ];

        let history = reconstruct_history(&snapshots);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].body.as_deref(), Some("legacy upload"));
        assert_eq!(history[1].body.as_deref(), Some("resubmitted"));
    }

    #[test]
    fn test_reconstruction_is_idempotent() {
        let t = base();
        let snapshots = vec![
            (t, snapshot(Some(t), "a")),
            (t + TimeDelta::minutes(5), snapshot(Some(t), "a graded")),
            (
                t + TimeDelta::days(2),
                snapshot(Some(t + TimeDelta::days(2)), "b"),
            ),
        ];
        let once = reconstruct_history(&snapshots);
        let again_input: Vec<(DateTime<Utc>, Submission)> = once
            .iter()
            .map(|s| (s.submitted_at.unwrap_or_else(history_floor), s.clone()))
            .collect();
        let twice = reconstruct_history(&again_input);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_log() {
        assert!(submission_history(&VersionLog::new()).is_empty());
    }

    #[test]
    fn test_unreadable_version_is_skipped() {
        let t = base();
        let log = VersionLog::from_versions(vec![
            SubmissionVersion {
                number: 2,
                created_at: t,
                model_json: "{not json".to_string(),
            },
            SubmissionVersion::capture(1, &snapshot(Some(t), "ok"), t).unwrap(),
        ]);
        assert_eq!(log.versions()[0].number, 1);
        let history = submission_history(&log);
        assert_eq!(history.len(), 1);
    }
}
