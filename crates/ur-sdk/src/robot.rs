//! 三通道组合
//!
//! `UrRobot` 持有一个实时接收器、一个命令客户端和一个 Dashboard 客户端，
//! 提供一次性连接 / 断开全部通道的入口。

use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use ur_client::{
    Ack, CommandClient, CommandConfig, CommandError, DEFAULT_DASHBOARD_PORT, DEFAULT_PRIMARY_PORT,
    DEFAULT_STOP_DECELERATION, DashboardClient, DashboardConfig, DashboardError,
};
use ur_driver::{DEFAULT_REALTIME_PORT, RealtimeReceiver, ReceiverBuilder, ReceiverError};
use ur_net::{ChannelConfig, ReconnectPolicy};
use ur_protocol::JogSpace;

/// `connect_all()` 失败（记录第一个失败的通道）
#[derive(Error, Debug)]
pub enum ConnectAllError {
    #[error("Real-time channel: {0}")]
    Realtime(#[from] ReceiverError),

    #[error("Command channel: {0}")]
    Command(#[from] CommandError),

    #[error("Dashboard channel: {0}")]
    Dashboard(#[from] DashboardError),
}

/// `UrRobot` Builder
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use ur_sdk::UrRobotBuilder;
///
/// let mut robot = UrRobotBuilder::new("192.168.1.100")
///     .timeout(Duration::from_millis(500))
///     .build();
/// robot.connect_all()?;
/// println!("TCP: {:?}", robot.receiver().get_tcp_pose());
/// robot.disconnect_all();
/// # Ok::<(), ur_sdk::ConnectAllError>(())
/// ```
#[derive(Debug, Clone)]
pub struct UrRobotBuilder {
    host: String,
    realtime_port: u16,
    primary_port: u16,
    dashboard_port: u16,
    channel: ChannelConfig,
    reply_timeout: Option<Duration>,
    reconnect: ReconnectPolicy,
}

impl UrRobotBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            realtime_port: DEFAULT_REALTIME_PORT,
            primary_port: DEFAULT_PRIMARY_PORT,
            dashboard_port: DEFAULT_DASHBOARD_PORT,
            channel: ChannelConfig::default(),
            reply_timeout: None,
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn realtime_port(mut self, port: u16) -> Self {
        self.realtime_port = port;
        self
    }

    pub fn primary_port(mut self, port: u16) -> Self {
        self.primary_port = port;
        self
    }

    pub fn dashboard_port(mut self, port: u16) -> Self {
        self.dashboard_port = port;
        self
    }

    /// 三个通道统一的连接与读写超时
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.channel = ChannelConfig::with_timeout(timeout);
        self
    }

    /// 命令 / Dashboard 应答超时（默认各自的默认值）
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    pub fn reconnect(mut self, attempts: u32, delay: Duration) -> Self {
        self.reconnect = ReconnectPolicy::new(attempts, delay);
        self
    }

    pub fn build(self) -> UrRobot {
        let receiver = ReceiverBuilder::new(self.host.clone())
            .port(self.realtime_port)
            .channel_config(self.channel.clone())
            .reconnect(self.reconnect.attempts, self.reconnect.delay)
            .build();

        let mut command = CommandConfig {
            host: self.host.clone(),
            port: self.primary_port,
            channel: self.channel.clone(),
            reconnect: self.reconnect,
            ..Default::default()
        };
        let mut dashboard = DashboardConfig {
            host: self.host,
            port: self.dashboard_port,
            channel: self.channel,
            reconnect: self.reconnect,
            ..Default::default()
        };
        if let Some(timeout) = self.reply_timeout {
            command.reply_timeout = timeout;
            dashboard.reply_timeout = timeout;
        }

        UrRobot {
            receiver,
            command: CommandClient::new(command),
            dashboard: DashboardClient::new(dashboard),
        }
    }
}

/// 一台机器人的全部通道
#[derive(Debug)]
pub struct UrRobot {
    receiver: RealtimeReceiver,
    command: CommandClient,
    dashboard: DashboardClient,
}

impl UrRobot {
    /// 连接全部通道
    ///
    /// 每个通道都会尝试连接；返回第一个失败。已连接的通道保持连接。
    pub fn connect_all(&mut self) -> Result<(), ConnectAllError> {
        let mut first_error: Option<ConnectAllError> = None;

        if let Err(e) = self.receiver.connect() {
            warn!("Real-time channel failed to connect: {}", e);
            first_error.get_or_insert(e.into());
        }
        if let Err(e) = self.command.connect() {
            warn!("Command channel failed to connect: {}", e);
            first_error.get_or_insert(e.into());
        }
        if let Err(e) = self.dashboard.connect() {
            warn!("Dashboard channel failed to connect: {}", e);
            first_error.get_or_insert(e.into());
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                info!("All channels connected");
                Ok(())
            },
        }
    }

    /// 断开全部通道（幂等）
    pub fn disconnect_all(&mut self) {
        self.receiver.disconnect();
        self.command.disconnect();
        self.dashboard.disconnect();
    }

    /// 三个通道是否都已连接
    pub fn is_fully_connected(&self) -> bool {
        self.receiver.is_connected() && self.command.is_connected() && self.dashboard.is_connected()
    }

    /// 在主接口上发送 `stopj`，停止当前运动
    pub fn stop_motion(&mut self) -> Result<Ack, CommandError> {
        self.command.stop_jog(JogSpace::Joint, DEFAULT_STOP_DECELERATION)
    }

    pub fn receiver(&self) -> &RealtimeReceiver {
        &self.receiver
    }

    pub fn command(&mut self) -> &mut CommandClient {
        &mut self.command
    }

    pub fn dashboard(&mut self) -> &mut DashboardClient {
        &mut self.dashboard
    }
}
