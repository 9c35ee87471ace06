use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 环境变量前缀，例如 `BITAXE_DASHBOARD__SERVER__PORT=8080`
pub const ENV_PREFIX: &str = "BITAXE_DASHBOARD";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "dashboard.toml")]
    pub config: String,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,

    /// HTTP port
    #[arg(long)]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long)]
    pub bind: Option<String>,

    /// Directory holding app-config.json and the mapping documents
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory of the built frontend
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Serve demo telemetry instead of contacting devices
    #[arg(long)]
    pub simulated: bool,

    /// Log level
    #[arg(long)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the dashboard server (default)
    Serve,

    /// Print a password hash usable as authentication.passwordHash
    HashPassword {
        /// Password to hash; read from stdin when omitted
        password: Option<String>,
    },

    /// Print a new random JWT secret
    GenerateSecret,

    /// Show device status from a running dashboard
    Status {
        /// Dashboard base URL
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        url: String,

        /// Username, used when authentication is enabled
        #[arg(short, long)]
        username: Option<String>,

        /// Password, used when authentication is enabled
        #[arg(short, long)]
        password: Option<String>,

        /// Only show this device (id or name)
        #[arg(long)]
        device: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub transport: TransportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
    pub allow_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// 直连设备，失败如实上报
    Strict,
    /// 演示数据
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub mode: TransportMode,
    pub read_timeout_secs: u64,
    pub write_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// never | hourly | daily
    pub rotation: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: Some(PathBuf::from("public")),
            allow_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("config"),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: TransportMode::Strict,
            read_timeout_secs: 5,
            write_timeout_secs: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            rotation: "daily".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            transport: TransportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TransportConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl Config {
    /// 依次叠加：内置默认值、配置文件（可缺失）、`BITAXE_DASHBOARD__*` 环境变量、`PORT`
    pub fn load(path: &str) -> Result<Self> {
        let mut builder = ::config::Config::builder()
            .add_source(
                ::config::Config::try_from(&Config::default())
                    .context("Failed to build default config")?,
            )
            .add_source(::config::File::new(path, ::config::FileFormat::Toml).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.allow_origins")
                    .try_parsing(true),
            );

        if let Some(port) = std::env::var("PORT").ok().and_then(|port| port.parse::<u16>().ok()) {
            builder = builder
                .set_override("server.port", i64::from(port))
                .context("Failed to apply PORT")?;
        }

        let config: Config = builder
            .build()
            .with_context(|| format!("Failed to load config file: {}", path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    /// 命令行参数覆盖配置
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(bind) = &args.bind {
            self.server.bind_address = bind.clone();
        }
        if let Some(data_dir) = &args.data_dir {
            self.storage.data_dir = data_dir.clone();
        }
        if let Some(static_dir) = &args.static_dir {
            self.server.static_dir = Some(static_dir.clone());
        }
        if args.simulated {
            self.transport.mode = TransportMode::Simulated;
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.debug {
            self.logging.level = "debug".to_string();
        }
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let config_content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, config_content)
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        // 验证服务配置
        if self.server.bind_address.trim().is_empty() {
            anyhow::bail!("Bind address must not be empty");
        }
        if self.server.port == 0 {
            anyhow::bail!("Server port must be between 1 and 65535");
        }
        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be greater than 0");
        }

        // 验证存储配置
        if self.storage.data_dir.as_os_str().is_empty() {
            anyhow::bail!("Data directory must not be empty");
        }

        // 验证设备访问超时
        if self.transport.read_timeout_secs == 0 || self.transport.write_timeout_secs == 0 {
            anyhow::bail!("Transport timeouts must be greater than 0");
        }

        // 验证日志配置
        if !["never", "hourly", "daily"].contains(&self.logging.rotation.as_str()) {
            anyhow::bail!(
                "Log rotation '{}' must be one of never, hourly, daily",
                self.logging.rotation
            );
        }

        Ok(())
    }

    /// 检查配置是否有效
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

#[cfg(test)]
mod tests;
