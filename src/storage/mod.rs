use std::sync::Arc;

use crate::errors::Result;
use crate::models::submissions::entities::Submission;
use crate::services::history::SubmissionVersion;

pub mod memory_storage;

#[async_trait::async_trait]
pub trait SubmissionStore: Send + Sync {
    // 分配新的记录 ID（提交、评论、互评请求共用）
    async fn next_id(&self) -> Result<i64>;

    /// 提交
    // 通过ID获取提交
    async fn get_submission(&self, id: i64) -> Result<Option<Submission>>;
    // 通过作业和学生查找提交
    async fn find_submission(&self, assignment_id: i64, user_id: i64) -> Result<Option<Submission>>;
    // 保存提交；create_version 为真时追加一个历史版本
    async fn save_submission(&self, submission: &Submission, create_version: bool) -> Result<()>;
    // 列出作业的全部提交
    async fn list_assignment_submissions(&self, assignment_id: i64) -> Result<Vec<Submission>>;

    /// 历史版本
    // 按版本号升序
    async fn list_versions(&self, submission_id: i64) -> Result<Vec<SubmissionVersion>>;
}

pub fn create_memory_store() -> Arc<dyn SubmissionStore> {
    Arc::new(memory_storage::MemoryStorage::new())
}
