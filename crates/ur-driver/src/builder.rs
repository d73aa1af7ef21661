//! Builder 模式实现
//!
//! 提供链式构造 `RealtimeReceiver` 实例的便捷方式。

use crate::config::ReceiverConfig;
use crate::receiver::RealtimeReceiver;
use std::time::Duration;
use ur_net::{ChannelConfig, ReconnectPolicy};
use ur_protocol::TelemetryLayout;

/// 实时接收器 Builder（链式构造）
///
/// `build()` 不会建立连接，需要显式调用 `connect()`。
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use ur_driver::ReceiverBuilder;
///
/// let receiver = ReceiverBuilder::new("192.168.1.100")
///     .timeout(Duration::from_millis(500))
///     .reconnect(5, Duration::from_secs(2))
///     .build();
/// receiver.connect().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReceiverBuilder {
    config: ReceiverConfig,
}

impl ReceiverBuilder {
    /// 以控制器地址创建 Builder，其余参数取默认值
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: ReceiverConfig {
                host: host.into(),
                ..Default::default()
            },
        }
    }

    /// 从完整配置开始
    pub fn from_config(config: ReceiverConfig) -> Self {
        Self { config }
    }

    /// 设置端口（默认 30003）
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// 连接与读写统一超时（默认 1 秒）
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.channel = ChannelConfig {
            nodelay: self.config.channel.nodelay,
            ..ChannelConfig::with_timeout(timeout)
        };
        self
    }

    /// 设置完整通道配置
    pub fn channel_config(mut self, channel: ChannelConfig) -> Self {
        self.config.channel = channel;
        self
    }

    /// 帧长度上限（默认 10000）
    pub fn max_frame_len(mut self, max_frame_len: u32) -> Self {
        self.config.max_frame_len = max_frame_len;
        self
    }

    /// `reconnect()` 的尝试次数与间隔
    pub fn reconnect(mut self, attempts: u32, delay: Duration) -> Self {
        self.config.reconnect = ReconnectPolicy::new(attempts, delay);
        self
    }

    /// 自定义字段偏移表（不同控制器固件版本）
    pub fn layout(mut self, layout: TelemetryLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// 频率 EMA 平滑系数，取值 (0, 1]
    pub fn smoothing(mut self, alpha: f64) -> Self {
        self.config.smoothing = alpha;
        self
    }

    /// `disconnect()` 等待接收线程的上限（默认 2 秒）
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.config.join_timeout = timeout;
        self
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    pub fn build(self) -> RealtimeReceiver {
        RealtimeReceiver::new(self.config)
    }
}
