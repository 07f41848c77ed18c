//! 基于 DashMap 的内存目录实现

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::{
    AssignmentDirectory, EnrollmentDirectory, MediaObjectLookup, QuizAttempt, QuizAttemptLookup,
    RecipientResolver,
};
use crate::errors::Result;
use crate::models::assignments::entities::Assignment;
use crate::models::notifications::entities::Recipient;

/// 内存中的课程目录：作业、选课、测验作答、媒体对象、课程教师
#[derive(Default)]
pub struct InMemoryDirectory {
    assignments: DashMap<i64, Assignment>,
    // (context_id, user_id)
    enrollments: DashMap<(i64, i64), ()>,
    quiz_attempts: DashMap<i64, QuizAttempt>,
    media_objects: DashMap<String, i64>,
    // context_id -> 教师/助教
    admins: DashMap<i64, Vec<i64>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_assignment(&self, assignment: Assignment) {
        self.assignments.insert(assignment.id, assignment);
    }

    pub fn enroll(&self, context_id: i64, user_id: i64) {
        self.enrollments.insert((context_id, user_id), ());
    }

    pub fn unenroll(&self, context_id: i64, user_id: i64) {
        self.enrollments.remove(&(context_id, user_id));
    }

    pub fn put_quiz_attempt(&self, attempt: QuizAttempt) {
        self.quiz_attempts.insert(attempt.id, attempt);
    }

    pub fn put_media_object(&self, media_id: &str, media_object_id: i64) {
        self.media_objects.insert(media_id.to_string(), media_object_id);
    }

    pub fn add_admin(&self, context_id: i64, user_id: i64) {
        let mut admins = self.admins.entry(context_id).or_default();
        if !admins.contains(&user_id) {
            admins.push(user_id);
        }
    }
}

#[async_trait]
impl AssignmentDirectory for InMemoryDirectory {
    async fn get_assignment(&self, assignment_id: i64) -> Result<Option<Assignment>> {
        Ok(self.assignments.get(&assignment_id).map(|a| a.clone()))
    }
}

#[async_trait]
impl EnrollmentDirectory for InMemoryDirectory {
    async fn is_student_enrolled(&self, context_id: i64, user_id: i64) -> Result<bool> {
        Ok(self.enrollments.contains_key(&(context_id, user_id)))
    }
}

#[async_trait]
impl QuizAttemptLookup for InMemoryDirectory {
    async fn find_by_submission(&self, submission_id: i64) -> Result<Option<QuizAttempt>> {
        Ok(self
            .quiz_attempts
            .iter()
            .find(|a| a.submission_id == Some(submission_id))
            .map(|a| a.clone()))
    }

    async fn find_by_user_and_quiz(
        &self,
        user_id: i64,
        quiz_id: i64,
    ) -> Result<Option<QuizAttempt>> {
        Ok(self
            .quiz_attempts
            .iter()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
            .max_by_key(|a| a.id)
            .map(|a| a.clone()))
    }
}

#[async_trait]
impl MediaObjectLookup for InMemoryDirectory {
    async fn find_media_object(&self, media_id: &str) -> Result<Option<i64>> {
        Ok(self.media_objects.get(media_id).map(|id| *id))
    }
}

#[async_trait]
impl RecipientResolver for InMemoryDirectory {
    async fn resolve(&self, recipient: &Recipient) -> Result<Vec<i64>> {
        let ids = match recipient {
            Recipient::Student { user_id } => vec![*user_id],
            Recipient::AdminsInChargeOf {
                user_id,
                context_id,
            } => {
                let admins = self
                    .admins
                    .get(context_id)
                    .map(|a| a.clone())
                    .unwrap_or_default();
                debug!(
                    "Resolved {} admin(s) in charge of user {} in context {}",
                    admins.len(),
                    user_id,
                    context_id
                );
                admins
            }
        };
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_quiz_lookup_prefers_latest_attempt_for_user() {
        let directory = InMemoryDirectory::new();
        for id in [3, 7] {
            directory.put_quiz_attempt(QuizAttempt {
                id,
                user_id: 5,
                quiz_id: 9,
                submission_id: None,
                score: Some(1.0),
                complete: true,
            });
        }
        let found = directory.find_by_user_and_quiz(5, 9).await.unwrap();
        assert_eq!(found.map(|a| a.id), Some(7));
        assert!(directory.find_by_submission(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_media_object_lookup() {
        let directory = InMemoryDirectory::new();
        directory.put_media_object("m-1", 42);
        assert_eq!(directory.find_media_object("m-1").await.unwrap(), Some(42));
        assert_eq!(directory.find_media_object("m-2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_resolve_recipients() {
        let directory = InMemoryDirectory::new();
        directory.add_admin(10, 100);
        directory.add_admin(10, 100);
        directory.add_admin(10, 101);

        let admins = directory
            .resolve(&Recipient::AdminsInChargeOf {
                user_id: 1,
                context_id: 10,
            })
            .await
            .unwrap();
        assert_eq!(admins, vec![100, 101]);

        let student = directory
            .resolve(&Recipient::Student { user_id: 1 })
            .await
            .unwrap();
        assert_eq!(student, vec![1]);
    }
}
