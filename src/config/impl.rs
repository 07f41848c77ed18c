use config::{Config, ConfigError, Environment, File};
use std::sync::OnceLock;

use super::AppConfig;

static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

impl AppConfig {
    /// 加载配置
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Self::with_defaults(Config::builder())?
            // 首先加载默认配置文件
            .add_source(File::with_name("config").required(false))
            // 然后根据环境加载特定配置文件
            .add_source(
                File::with_name(&format!(
                    "config.{}",
                    std::env::var("APP_ENV").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // 最后加载环境变量覆盖
            .add_source(
                Environment::with_prefix("LIFECYCLE")
                    .separator("_")
                    .try_parsing(true),
            );

        // 支持从环境变量加载
        builder = builder
            .set_override_option("app.environment", std::env::var("APP_ENV").ok())?
            .set_override_option("app.log_level", std::env::var("RUST_LOG").ok())?
            .set_override_option("queue.workers", std::env::var("QUEUE_WORKERS").ok())?;

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        Ok(app_config.resolve_workers())
    }

    /// 注册默认值，保证空环境也能加载
    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("app.system_name", "HWSystem Lifecycle")?
            .set_default("app.environment", "development")?
            .set_default("app.log_level", "info")?
            .set_default("queue.workers", 0)?
            .set_default("queue.max_workers", 8)?
            .set_default("queue.capacity", 1024)?
            .set_default("plagiarism.enabled", true)?
            .set_default("plagiarism.submit_max_attempts", 5)?
            .set_default("plagiarism.submit_retry_delay_secs", 300)?
            .set_default("screenshot.enabled", true)?
            .set_default("screenshot.max_process_attempts", 3)?
            .set_default("limits.max_url_length", 250)?
            .set_default("limits.max_long_text_length", 65535)
    }

    /// 处理工作线程数
    fn resolve_workers(mut self) -> Self {
        if self.queue.workers == 0 {
            self.queue.workers = num_cpus::get().min(self.queue.max_workers).max(1);
        }
        self
    }

    /// 获取全局配置实例
    pub fn get() -> &'static AppConfig {
        APP_CONFIG.get_or_init(|| {
            Self::load().unwrap_or_else(|e| {
                eprintln!("Failed to load configuration: {e}");
                std::process::exit(1);
            })
        })
    }

    /// 初始化配置 (在应用启动时调用)
    pub fn init() -> Result<(), ConfigError> {
        let config = Self::load()?;
        APP_CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("Configuration already initialized".to_string()))?;
        Ok(())
    }

    /// 检查是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app.environment == "production"
    }

    /// 检查是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app.environment == "development"
    }
}

impl Default for AppConfig {
    /// 仅使用内置默认值（测试和嵌入场景）
    fn default() -> Self {
        use super::{
            AppSettings, LimitConfig, PlagiarismConfig, QueueConfig, ScreenshotConfig,
        };

        AppConfig {
            app: AppSettings {
                system_name: "HWSystem Lifecycle".to_string(),
                environment: "development".to_string(),
                log_level: "info".to_string(),
            },
            queue: QueueConfig {
                workers: 0,
                max_workers: 8,
                capacity: 1024,
            },
            plagiarism: PlagiarismConfig {
                enabled: true,
                submit_max_attempts: 5,
                submit_retry_delay_secs: 300,
            },
            screenshot: ScreenshotConfig {
                enabled: true,
                max_process_attempts: 3,
            },
            limits: LimitConfig {
                max_url_length: 250,
                max_long_text_length: 65535,
            },
        }
        .resolve_workers()
    }
}
