//! 基于 tokio broadcast 的通知推送
//!
//! 每个在线用户一个广播通道，订阅者断开后自动清理。

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::NotificationDispatcher;
use crate::collaborators::RecipientResolver;
use crate::errors::Result;
use crate::models::notifications::entities::{NotificationEvent, NotificationKind};

const CHANNEL_CAPACITY: usize = 100;

/// 推送给用户的消息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationMessage {
    Notification { payload: NotificationPayload },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationPayload {
    pub notification_type: NotificationKind,
    pub submission_id: i64,
    pub assignment_id: i64,
    pub user_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&NotificationEvent> for NotificationPayload {
    fn from(event: &NotificationEvent) -> Self {
        Self {
            notification_type: event.kind,
            submission_id: event.submission_id,
            assignment_id: event.assignment_id,
            user_id: event.user_id,
            created_at: event.occurred_at,
        }
    }
}

pub struct BroadcastDispatcher {
    resolver: Arc<dyn RecipientResolver>,
    /// 用户 ID -> 广播发送器
    connections: DashMap<i64, broadcast::Sender<NotificationMessage>>,
}

impl BroadcastDispatcher {
    pub fn new(resolver: Arc<dyn RecipientResolver>) -> Self {
        Self {
            resolver,
            connections: DashMap::new(),
        }
    }

    /// 注册用户连接
    pub fn register(&self, user_id: i64) -> broadcast::Receiver<NotificationMessage> {
        let entry = self.connections.entry(user_id).or_insert_with(|| {
            let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
            tx
        });
        entry.subscribe()
    }

    /// 没有订阅者时移除连接
    pub fn unregister(&self, user_id: i64) {
        self.connections
            .remove_if(&user_id, |_, sender| sender.receiver_count() == 0);
    }

    fn send_to_user(&self, user_id: i64, message: NotificationMessage) -> bool {
        match self.connections.get(&user_id) {
            Some(sender) => sender.send(message).is_ok(),
            None => false,
        }
    }

    pub fn online_count(&self) -> usize {
        self.connections.len()
    }
}

#[async_trait]
impl NotificationDispatcher for BroadcastDispatcher {
    async fn dispatch(&self, event: &NotificationEvent) -> Result<usize> {
        let user_ids = self.resolver.resolve(&event.recipient).await?;
        let message = NotificationMessage::Notification {
            payload: NotificationPayload::from(event),
        };

        let mut delivered = 0;
        for user_id in &user_ids {
            if self.send_to_user(*user_id, message.clone()) {
                delivered += 1;
            }
        }

        if user_ids.is_empty() {
            warn!(
                "No recipients for {} on submission {}",
                event.kind, event.submission_id
            );
        } else {
            debug!(
                "Delivered {} to {}/{} recipient(s)",
                event.kind,
                delivered,
                user_ids.len()
            );
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::InMemoryDirectory;
    use crate::models::notifications::entities::Recipient;
    use chrono::Utc;

    fn event(recipient: Recipient) -> NotificationEvent {
        NotificationEvent {
            kind: NotificationKind::SubmissionGraded,
            recipient,
            submission_id: 1,
            assignment_id: 2,
            user_id: 3,
            occurred_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_dispatch_to_online_student() {
        let dispatcher = BroadcastDispatcher::new(Arc::new(InMemoryDirectory::new()));
        let mut rx = dispatcher.register(3);

        let delivered = dispatcher
            .dispatch(&event(Recipient::Student { user_id: 3 }))
            .await
            .unwrap();
        assert_eq!(delivered, 1);

        let NotificationMessage::Notification { payload } = rx.recv().await.unwrap();
        assert_eq!(payload.notification_type, NotificationKind::SubmissionGraded);
        assert_eq!(payload.submission_id, 1);
    }

    #[tokio::test]
    async fn test_dispatch_to_admins() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory.add_admin(10, 70);
        directory.add_admin(10, 71);
        let dispatcher = BroadcastDispatcher::new(directory);
        let _rx = dispatcher.register(70);

        let delivered = dispatcher
            .dispatch(&event(Recipient::AdminsInChargeOf {
                user_id: 3,
                context_id: 10,
            }))
            .await
            .unwrap();
        // 71 不在线
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn test_unregister_keeps_live_subscribers() {
        let dispatcher = BroadcastDispatcher::new(Arc::new(InMemoryDirectory::new()));
        let rx = dispatcher.register(5);
        dispatcher.unregister(5);
        assert_eq!(dispatcher.online_count(), 1);
        drop(rx);
        dispatcher.unregister(5);
        assert_eq!(dispatcher.online_count(), 0);
    }

    #[test]
    fn test_message_json_shape() {
        let message = NotificationMessage::Notification {
            payload: NotificationPayload::from(&event(Recipient::Student { user_id: 3 })),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "notification");
        assert_eq!(value["payload"]["notification_type"], "submission_graded");
    }
}
