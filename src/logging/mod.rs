use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日志格式配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 人类可读格式
    Pretty,
    /// 紧凑格式
    Compact,
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    pub show_target: bool,
    pub show_thread_ids: bool,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            show_target: true,
            show_thread_ids: false,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    /// 开发环境：debug 级别，显示构造和缓存事件
    pub fn development() -> Self {
        Self {
            level: Level::DEBUG,
            show_thread_ids: true,
            ..Self::default()
        }
    }

    /// 测试环境：只输出超时和错误，紧凑无颜色
    pub fn testing() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
            ansi: false,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
    }
}

/// 初始化全局日志订阅器，`RUST_LOG` 优先于配置的级别
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = config.env_filter();

    match config.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(config.ansi);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(config.ansi);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    tracing::info!(
        level = ?config.level,
        format = ?config.format,
        "Logging system initialized"
    );

    Ok(())
}
