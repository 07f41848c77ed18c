//! 通知分发
//!
//! 生命周期只决定发不发；解析收件人和实际投递由分发方负责。

pub mod broadcast;

use async_trait::async_trait;

use crate::errors::Result;
use crate::models::notifications::entities::NotificationEvent;

pub use broadcast::{BroadcastDispatcher, NotificationMessage};

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// 投递一条通知，返回实际送达的用户数
    async fn dispatch(&self, event: &NotificationEvent) -> Result<usize>;
}
