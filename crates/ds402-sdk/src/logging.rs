//! 日志初始化
//!
//! 安装 `tracing-subscriber` 的 fmt 订阅者，过滤规则优先取 `RUST_LOG`，
//! 并把 `log` crate 的记录桥接到 tracing。

use std::error::Error;

use tracing_subscriber::EnvFilter;

/// 默认过滤规则
pub const DEFAULT_DIRECTIVES: &str = "info";

/// 初始化日志（默认规则），已初始化时静默忽略
pub fn init_logger() {
    init_logger_with_filter(DEFAULT_DIRECTIVES);
}

/// 使用指定的默认规则初始化日志，已初始化时静默忽略
///
/// `RUST_LOG` 存在时优先使用环境变量。
pub fn init_logger_with_filter(directives: &str) {
    let _ = try_init_logger_with_filter(directives);
}

/// 初始化日志
///
/// # 错误
///
/// - 过滤规则无法解析
/// - 全局订阅者或 `log` 桥接已被设置
pub fn try_init_logger_with_filter(directives: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directives)?,
    };

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logger_twice_does_not_panic() {
        init_logger_with_filter("ds402_client=debug");
        init_logger();
        tracing::info!("logger initialised");
        assert!(try_init_logger_with_filter("info").is_err());
    }
}
