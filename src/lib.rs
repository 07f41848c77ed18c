//! HWSystem Lifecycle - 作业提交生命周期管理
//!
//! 负责提交在保存前的状态推导、通知判定、查重轮询与提交历史。
//!
//! # 架构
//! - `collaborators`: 外部协作方接口（课程目录、查重、截图、成绩册）
//! - `config`: 配置管理
//! - `dispatch`: 通知分发
//! - `errors`: 统一错误处理
//! - `models`: 数据模型定义
//! - `queue`: 后台任务队列
//! - `runtime`: 运行时生命周期管理
//! - `services`: 业务逻辑层
//! - `storage`: 数据存储层（内存）
//! - `utils`: 工具函数

pub mod collaborators;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod models;
pub mod queue;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod utils;
