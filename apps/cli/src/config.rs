//! CLI 配置文件
//!
//! 默认路径 `~/.config/ur10/config.toml`，可以用 `--config` 覆盖。
//!
//! ```toml
//! [robot]
//! host = "192.168.1.100"
//! realtime_port = 30003
//! primary_port = 30001
//! dashboard_port = 29999
//! timeout_ms = 1000
//! reply_timeout_ms = 1000
//!
//! [reconnect]
//! attempts = 3
//! delay_ms = 1000
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use ur_sdk::client::{CommandConfig, DashboardConfig};
use ur_sdk::driver::ReceiverBuilder;
use ur_sdk::net::{ChannelConfig, ReconnectPolicy};

/// 机器人连接参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotSection {
    pub host: String,
    pub realtime_port: u16,
    pub primary_port: u16,
    pub dashboard_port: u16,
    /// 连接与读写超时
    pub timeout_ms: u64,
    /// 命令 / Dashboard 应答超时
    pub reply_timeout_ms: u64,
}

impl Default for RobotSection {
    fn default() -> Self {
        Self {
            host: ur_sdk::driver::DEFAULT_HOST.to_string(),
            realtime_port: ur_sdk::driver::DEFAULT_REALTIME_PORT,
            primary_port: ur_sdk::client::DEFAULT_PRIMARY_PORT,
            dashboard_port: ur_sdk::client::DEFAULT_DASHBOARD_PORT,
            timeout_ms: 1000,
            reply_timeout_ms: 1000,
        }
    }
}

/// 重连参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSection {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_ms: 1000,
        }
    }
}

/// CLI 配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub robot: RobotSection,
    pub reconnect: ReconnectSection,
}

/// 默认配置文件路径
pub fn default_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("Cannot determine config directory")?;
    path.push("ur10");
    path.push("config.toml");
    Ok(path)
}

impl CliConfig {
    /// 加载配置；文件不存在时返回默认值
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// 写入配置（自动创建目录）
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    fn channel(&self) -> ChannelConfig {
        ChannelConfig::with_timeout(Duration::from_millis(self.robot.timeout_ms))
    }

    fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(
            self.reconnect.attempts,
            Duration::from_millis(self.reconnect.delay_ms),
        )
    }

    pub fn receiver_builder(&self) -> ReceiverBuilder {
        let policy = self.reconnect_policy();
        ReceiverBuilder::new(self.robot.host.clone())
            .port(self.robot.realtime_port)
            .channel_config(self.channel())
            .reconnect(policy.attempts, policy.delay)
    }

    pub fn command_config(&self) -> CommandConfig {
        CommandConfig {
            host: self.robot.host.clone(),
            port: self.robot.primary_port,
            channel: self.channel(),
            reply_timeout: Duration::from_millis(self.robot.reply_timeout_ms),
            reconnect: self.reconnect_policy(),
            ..Default::default()
        }
    }

    pub fn dashboard_config(&self) -> DashboardConfig {
        DashboardConfig {
            host: self.robot.host.clone(),
            port: self.robot.dashboard_port,
            channel: self.channel(),
            reply_timeout: Duration::from_millis(self.robot.reply_timeout_ms),
            reconnect: self.reconnect_policy(),
        }
    }
}
