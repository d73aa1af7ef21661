//! 接收器配置

use crate::stats::DEFAULT_SMOOTHING;
use std::time::Duration;
use ur_net::{ChannelConfig, ReconnectPolicy};
use ur_protocol::{DEFAULT_MAX_FRAME_LEN, TelemetryLayout};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 实时接口默认端口
pub const DEFAULT_REALTIME_PORT: u16 = 30003;

/// 默认控制器地址
pub const DEFAULT_HOST: &str = "192.168.1.100";

/// 实时接收器配置
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReceiverConfig {
    pub host: String,
    pub port: u16,
    /// 连接与读写超时
    pub channel: ChannelConfig,
    /// 帧长度上限
    pub max_frame_len: u32,
    /// `reconnect()` 使用的重试策略
    pub reconnect: ReconnectPolicy,
    /// 字段偏移表
    pub layout: TelemetryLayout,
    /// 频率 EMA 平滑系数
    pub smoothing: f64,
    /// `disconnect()` 等待接收线程退出的上限
    pub join_timeout: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_REALTIME_PORT,
            channel: ChannelConfig::default(),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            reconnect: ReconnectPolicy::default(),
            layout: TelemetryLayout::default(),
            smoothing: DEFAULT_SMOOTHING,
            join_timeout: Duration::from_secs(2),
        }
    }
}

/// 接收循环配置（纯数据，随线程移动）
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub max_frame_len: u32,
    pub layout: TelemetryLayout,
    pub smoothing: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            layout: TelemetryLayout::default(),
            smoothing: DEFAULT_SMOOTHING,
        }
    }
}

impl From<&ReceiverConfig> for PipelineConfig {
    fn from(config: &ReceiverConfig) -> Self {
        Self {
            max_frame_len: config.max_frame_len,
            layout: config.layout.clone(),
            smoothing: config.smoothing,
        }
    }
}
