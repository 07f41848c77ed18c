use serde::{Deserialize, Serialize};

/// 应用配置结构体
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub queue: QueueConfig,
    pub plagiarism: PlagiarismConfig,
    pub screenshot: ScreenshotConfig,
    pub limits: LimitConfig,
}

/// 应用设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub system_name: String,
    pub environment: String,
    pub log_level: String,
}

/// 后台任务队列配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    pub workers: usize,     // 0 表示按 CPU 核数自动推断
    pub max_workers: usize, // 自动推断时的上限
    pub capacity: usize,    // 每个优先级通道的缓冲大小
}

/// 查重服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlagiarismConfig {
    pub enabled: bool,
    pub submit_max_attempts: u32,     // 提交查重失败后的最大重试次数
    pub submit_retry_delay_secs: u64, // 提交重试间隔 (秒)
}

/// 网页截图配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    pub enabled: bool,
    pub max_process_attempts: i32,
}

/// 限制配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    pub max_url_length: usize,       // 超出部分会整体转存到正文
    pub max_long_text_length: usize, // 正文最大字符数
}
