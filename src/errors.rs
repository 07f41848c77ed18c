//! 统一错误处理模块
//!
//! 使用宏自动生成错误类型，支持错误代码和类型名称。

use std::fmt;

/// 定义错误类型的宏
///
/// 自动生成：
/// - enum 定义
/// - code() 方法 - 返回错误代码
/// - error_type() 方法 - 返回错误类型名称
/// - message() 方法 - 返回错误详情
/// - 便捷构造函数
macro_rules! define_lifecycle_errors {
    ($(
        $variant:ident($code:literal, $type_name:literal)
    ),* $(,)?) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum LifecycleError {
            $($variant(String),)*
        }

        impl LifecycleError {
            /// 获取错误代码
            pub fn code(&self) -> &'static str {
                match self {
                    $(LifecycleError::$variant(_) => $code,)*
                }
            }

            /// 获取错误类型名称
            pub fn error_type(&self) -> &'static str {
                match self {
                    $(LifecycleError::$variant(_) => $type_name,)*
                }
            }

            /// 获取错误详情
            pub fn message(&self) -> &str {
                match self {
                    $(LifecycleError::$variant(msg) => msg,)*
                }
            }
        }

        // 生成便捷构造函数
        paste::paste! {
            impl LifecycleError {
                $(
                    pub fn [<$variant:snake>]<T: Into<String>>(msg: T) -> Self {
                        LifecycleError::$variant(msg.into())
                    }
                )*
            }
        }
    };
}

define_lifecycle_errors! {
    Validation("E001", "Validation Error"),
    Enrollment("E002", "Enrollment Error"),
    NotFound("E003", "Resource Not Found"),
    Authorization("E004", "Authorization Error"),
    InvalidTransition("E005", "Invalid Workflow Transition"),
    ExternalService("E006", "External Service Error"),
    TaskQueue("E007", "Task Queue Error"),
    Notification("E008", "Notification Dispatch Error"),
    Configuration("E009", "Configuration Error"),
    Serialization("E010", "Serialization Error"),
}

impl LifecycleError {
    /// 是否为阻止保存的校验类错误
    pub fn blocks_save(&self) -> bool {
        matches!(
            self,
            LifecycleError::Validation(_)
                | LifecycleError::Enrollment(_)
                | LifecycleError::InvalidTransition(_)
        )
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for LifecycleError {}

impl From<serde_json::Error> for LifecycleError {
    fn from(err: serde_json::Error) -> Self {
        LifecycleError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for LifecycleError {
    fn from(err: config::ConfigError) -> Self {
        LifecycleError::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LifecycleError::validation("test").code(), "E001");
        assert_eq!(LifecycleError::enrollment("test").code(), "E002");
        assert_eq!(LifecycleError::invalid_transition("test").code(), "E005");
        assert_eq!(LifecycleError::serialization("test").code(), "E010");
    }

    #[test]
    fn test_error_types() {
        assert_eq!(
            LifecycleError::external_service("test").error_type(),
            "External Service Error"
        );
        assert_eq!(
            LifecycleError::validation("test").error_type(),
            "Validation Error"
        );
    }

    #[test]
    fn test_blocks_save() {
        assert!(LifecycleError::validation("bad url").blocks_save());
        assert!(LifecycleError::enrollment("not enrolled").blocks_save());
        assert!(!LifecycleError::external_service("timeout").blocks_save());
    }

    #[test]
    fn test_format_simple() {
        let err = LifecycleError::validation("Invalid URL");
        let formatted = err.format_simple();
        assert!(formatted.contains("Validation Error"));
        assert!(formatted.contains("Invalid URL"));
    }

    #[test]
    fn test_from_serde_json() {
        let err: LifecycleError = serde_json::from_str::<i32>("nope").unwrap_err().into();
        assert_eq!(err.code(), "E010");
    }
}
