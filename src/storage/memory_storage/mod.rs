//! 内存存储实现
//!
//! 单进程使用，提交与版本日志都保存在 DashMap 中。

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use super::SubmissionStore;
use crate::errors::Result;
use crate::models::submissions::entities::Submission;
use crate::services::history::{SubmissionVersion, VersionLog};

#[derive(Default)]
pub struct MemoryStorage {
    sequence: AtomicI64,
    submissions: DashMap<i64, Submission>,
    // (assignment_id, user_id) -> submission_id
    by_assignment_user: DashMap<(i64, i64), i64>,
    versions: DashMap<i64, VersionLog>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SubmissionStore for MemoryStorage {
    async fn next_id(&self) -> Result<i64> {
        Ok(self.sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn get_submission(&self, id: i64) -> Result<Option<Submission>> {
        Ok(self.submissions.get(&id).map(|s| s.clone()))
    }

    async fn find_submission(
        &self,
        assignment_id: i64,
        user_id: i64,
    ) -> Result<Option<Submission>> {
        let Some(id) = self
            .by_assignment_user
            .get(&(assignment_id, user_id))
            .map(|id| *id)
        else {
            return Ok(None);
        };
        self.get_submission(id).await
    }

    async fn save_submission(&self, submission: &Submission, create_version: bool) -> Result<()> {
        if create_version {
            let mut log = self.versions.entry(submission.id).or_default();
            let version = log.append(submission, Utc::now())?;
            debug!(
                "Submission {} saved as version {}",
                submission.id, version.number
            );
        }
        self.by_assignment_user.insert(
            (submission.assignment_id, submission.user_id),
            submission.id,
        );
        self.submissions.insert(submission.id, submission.clone());
        Ok(())
    }

    async fn list_assignment_submissions(&self, assignment_id: i64) -> Result<Vec<Submission>> {
        let mut submissions: Vec<Submission> = self
            .submissions
            .iter()
            .filter(|s| s.assignment_id == assignment_id)
            .map(|s| s.clone())
            .collect();
        submissions.sort_by_key(|s| s.id);
        Ok(submissions)
    }

    async fn list_versions(&self, submission_id: i64) -> Result<Vec<SubmissionVersion>> {
        Ok(self
            .versions
            .get(&submission_id)
            .map(|log| log.versions().to_vec())
            .unwrap_or_default())
    }
}
