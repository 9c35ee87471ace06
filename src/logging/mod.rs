//! 日志系统
//!
//! 控制台输出人类可读格式，可选的文件输出为 JSON 并按小时/天轮转。

use crate::config::LoggingConfig;
use crate::error::DashboardError;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 本 crate 的默认过滤指令
pub const DEFAULT_DIRECTIVE: &str = "bitaxe_dashboard=info";

/// 日志配置
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: String,
    /// 日志文件路径
    pub file_path: Option<PathBuf>,
    /// 是否启用彩色输出
    pub colored: bool,
    /// 是否显示目标模块
    pub show_target: bool,
    /// 日志轮转配置
    pub rotation: LogRotation,
}

/// 日志轮转配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    /// 不轮转
    Never,
    /// 每小时轮转
    Hourly,
    /// 每天轮转
    Daily,
}

impl LogRotation {
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "never" => LogRotation::Never,
            "hourly" => LogRotation::Hourly,
            _ => LogRotation::Daily,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            colored: true,
            show_target: false,
            rotation: LogRotation::Daily,
        }
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        Self {
            level: config.level.clone(),
            file_path: config.file.clone(),
            rotation: LogRotation::parse(&config.rotation),
            ..Self::default()
        }
    }
}

/// 构建过滤器：`RUST_LOG` 优先，否则以配置的级别作用于本 crate
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = match level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {
                format!("bitaxe_dashboard={},tower_http={}", level.to_lowercase(), level.to_lowercase())
            }
            _ => DEFAULT_DIRECTIVE.to_string(),
        };
        EnvFilter::new(directive)
    })
}

/// 初始化日志系统
///
/// 返回的 guard 需要保持到进程退出，否则文件日志可能丢失尾部内容。
pub fn init_logging(config: LogConfig) -> Result<Option<WorkerGuard>, DashboardError> {
    let registry = tracing_subscriber::registry().with(build_filter(&config.level));

    // 控制台输出层
    let console_layer = fmt::layer()
        .with_ansi(config.colored)
        .with_target(config.show_target)
        .boxed();

    // 文件输出层
    let Some(file_path) = config.file_path else {
        registry
            .with(console_layer)
            .try_init()
            .map_err(|e| DashboardError::System(format!("Failed to initialize logging: {}", e)))?;
        return Ok(None);
    };

    let directory = file_path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let file_name = file_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("bitaxe-dashboard.log");

    let (writer, guard) = match config.rotation {
        LogRotation::Never => {
            std::fs::create_dir_all(directory)
                .map_err(|e| DashboardError::System(format!("Failed to create log directory: {}", e)))?;
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&file_path)
                .map_err(|e| DashboardError::System(format!("Failed to open log file: {}", e)))?;
            non_blocking(file)
        }
        LogRotation::Hourly => non_blocking(rolling::hourly(directory, file_name)),
        LogRotation::Daily => non_blocking(rolling::daily(directory, file_name)),
    };

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .json();

    registry
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| DashboardError::System(format!("Failed to initialize logging: {}", e)))?;

    Ok(Some(guard))
}
