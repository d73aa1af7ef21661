//! 通道配置

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// TCP 通道配置
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChannelConfig {
    /// 单个地址的连接超时
    pub connect_timeout: Duration,
    /// 单次读超时（也是停止信号的检查间隔）
    pub read_timeout: Duration,
    /// 写超时
    pub write_timeout: Duration,
    /// 是否禁用 Nagle 算法
    pub nodelay: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
            write_timeout: Duration::from_secs(1),
            nodelay: true,
        }
    }
}

impl ChannelConfig {
    /// 连接与读写统一使用同一个超时
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            connect_timeout: timeout,
            read_timeout: timeout,
            write_timeout: timeout,
            ..Self::default()
        }
    }
}
