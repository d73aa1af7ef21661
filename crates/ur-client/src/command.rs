//! 主接口命令客户端
//!
//! 向主接口（默认端口 30001）发送 URScript 文本，并读取控制器随后发来的
//! 一个长度前缀数据包作为确认。控制器在连接建立时和运行期间会主动推送数据包，
//! 发送前先丢弃已缓冲的推送包，直到连接空闲 `drain_idle`，确认包因此总是
//! 本次写入之后到达的第一个包。确认只说明连接仍然存活、指令已写入，
//! 不代表程序已执行。

use crate::error::CommandError;
use crate::session::Session;
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use ur_net::{ChannelConfig, ChannelError, FramedChannel, ReconnectPolicy};
use ur_protocol::{DEFAULT_MAX_FRAME_LEN, FRAME_HEADER_LEN, FrameHeader, JogCommand, JogSpace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 主接口默认端口
pub const DEFAULT_PRIMARY_PORT: u16 = 30001;

/// `stop_jog` / `stop_motion` 默认减速度（rad/s² 或 m/s²）
pub const DEFAULT_STOP_DECELERATION: f64 = 2.0;

/// 发送前判定连接空闲的默认时长
pub const DEFAULT_DRAIN_IDLE: Duration = Duration::from_millis(20);

/// 命令客户端配置
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CommandConfig {
    pub host: String,
    pub port: u16,
    pub channel: ChannelConfig,
    /// 等待确认包的总时长
    pub reply_timeout: Duration,
    /// 确认包长度上限
    pub max_frame_len: u32,
    /// 发送前丢弃推送包时，连续无数据多久视为空闲
    pub drain_idle: Duration,
    /// `reconnect()` 使用的重试策略
    pub reconnect: ReconnectPolicy,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            port: DEFAULT_PRIMARY_PORT,
            channel: ChannelConfig::default(),
            reply_timeout: Duration::from_secs(1),
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            drain_idle: DEFAULT_DRAIN_IDLE,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl CommandConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }
}

/// 控制器确认
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// 确认包的消息类型字节
    pub message_type: u8,
    /// 确认包总长度（含前缀）
    pub frame_len: u32,
    /// 发送前丢弃的控制器推送包数量
    pub discarded: usize,
}

/// 主接口命令客户端
///
/// 方法接受 `&mut self`：同一连接上同时只有一个请求在途。
///
/// # 示例
///
/// ```rust,no_run
/// use ur_client::{CommandClient, CommandConfig};
/// use ur_protocol::{CartesianAxis, JogCommand, JogMotion};
///
/// let mut client = CommandClient::new(CommandConfig::new("192.168.1.100"));
/// let jog = JogCommand::cartesian(
///     CartesianAxis::X,
///     JogMotion::Velocity { speed: 0.05, acceleration: 0.5, duration: 0.1 },
/// );
/// let ack = client.send_jog_command(&jog)?;
/// println!("controller replied with type {}", ack.message_type);
/// # Ok::<(), ur_client::CommandError>(())
/// ```
pub struct CommandClient {
    config: CommandConfig,
    session: Session,
}

impl CommandClient {
    pub fn new(config: CommandConfig) -> Self {
        let session = Session::new(
            "primary",
            config.host.clone(),
            config.port,
            config.channel.clone(),
        );
        Self { config, session }
    }

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// 建立连接（已连接时复用）
    pub fn connect(&mut self) -> Result<(), CommandError> {
        self.session.ensure(|_| Ok::<(), CommandError>(()))?;
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.session.close();
    }

    /// 断开后按重试策略重新连接，返回最后一次失败
    pub fn reconnect(&mut self) -> Result<(), CommandError> {
        self.disconnect();
        let policy = self.config.reconnect;
        policy.run(|_| self.connect()).map_err(|e| e.last_error)
    }

    /// 发送点动指令
    ///
    /// 指令先校验再发送；校验失败时不会建立连接。
    ///
    /// # 错误
    /// - `CommandError::InvalidCommand`: 数值或轴索引非法
    /// - `CommandError::NotConnected`: 无法连接
    /// - `CommandError::Timeout` / `ProtocolError`: 未收到合法确认，连接已丢弃
    pub fn send_jog_command(&mut self, command: &JogCommand) -> Result<Ack, CommandError> {
        let script = command.to_script()?;
        self.send_validated(&script)
    }

    /// 减速停止当前点动（`stopl` / `stopj`）
    pub fn stop_jog(&mut self, space: JogSpace, deceleration: f64) -> Result<Ack, CommandError> {
        self.send_jog_command(&JogCommand::stop(space, deceleration))
    }

    /// 发送任意 URScript 文本（缺少结尾换行时自动补上）
    pub fn send_script(&mut self, script: &str) -> Result<Ack, CommandError> {
        if script.trim().is_empty() {
            return Err(ur_protocol::ProtocolError::InvalidText("empty script".to_string()).into());
        }
        if script.ends_with('\n') {
            self.send_validated(script)
        } else {
            self.send_validated(&format!("{}\n", script))
        }
    }

    fn send_validated(&mut self, script: &str) -> Result<Ack, CommandError> {
        let limits = ReplyLimits {
            timeout: self.config.reply_timeout,
            drain_idle: self.config.drain_idle,
            max_frame_len: self.config.max_frame_len,
        };

        let channel = self.session.ensure(|_| Ok::<(), CommandError>(()))?;
        debug!("Sending script to primary interface: {}", script.trim_end());

        match exchange(channel, script.as_bytes(), &limits) {
            Ok(ack) => {
                trace!(
                    "Primary interface ack: type {} ({} bytes, {} pushed packages discarded)",
                    ack.message_type, ack.frame_len, ack.discarded
                );
                Ok(ack)
            },
            Err(e) => {
                self.session.drop_channel(&e);
                Err(e)
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ReplyLimits {
    timeout: Duration,
    drain_idle: Duration,
    max_frame_len: u32,
}

/// 丢弃推送包，写入指令，再读取一个完整数据包
fn exchange(channel: &mut FramedChannel, script: &[u8], limits: &ReplyLimits) -> Result<Ack, CommandError> {
    let discarded = drain_pushed(channel, limits)?;
    if discarded > 0 {
        trace!("Discarded {} pushed packages before sending", discarded);
    }

    channel
        .send(script)
        .map_err(|e| CommandError::from_channel(e, limits.timeout))?;

    let deadline = Instant::now() + limits.timeout;
    let (message_type, frame_len) = read_package(channel, deadline, limits)?;
    Ok(Ack {
        message_type,
        frame_len,
        discarded,
    })
}

/// 丢弃已缓冲或在 `drain_idle` 内到达的数据包
///
/// 控制器持续推送且从不空闲时，最多丢弃 `timeout` 时长，然后照常发送。
fn drain_pushed(channel: &mut FramedChannel, limits: &ReplyLimits) -> Result<usize, CommandError> {
    let budget = Instant::now() + limits.timeout;
    let mut discarded = 0;
    while Instant::now() < budget {
        match channel.receive_exact_within(FRAME_HEADER_LEN, limits.drain_idle) {
            Ok(header_bytes) => {
                let header = parse_header(&header_bytes, limits.max_frame_len)?;
                channel
                    .receive_exact_within(header.payload_len(), limits.timeout)
                    .map_err(|e| CommandError::from_channel(e, limits.timeout))?;
                discarded += 1;
            },
            Err(ChannelError::TimedOut) => break,
            Err(e) => return Err(CommandError::from_channel(e, limits.timeout)),
        }
    }
    Ok(discarded)
}

fn read_package(
    channel: &mut FramedChannel,
    deadline: Instant,
    limits: &ReplyLimits,
) -> Result<(u8, u32), CommandError> {
    let map = |e: ChannelError| CommandError::from_channel(e, limits.timeout);

    let header_bytes = channel
        .receive_exact_within(FRAME_HEADER_LEN, remaining(deadline, limits.timeout)?)
        .map_err(map)?;
    let header = parse_header(&header_bytes, limits.max_frame_len)?;

    let payload = channel
        .receive_exact_within(header.payload_len(), remaining(deadline, limits.timeout)?)
        .map_err(map)?;
    let message_type = payload
        .first()
        .copied()
        .ok_or_else(|| CommandError::ProtocolError("Empty reply payload".to_string()))?;

    Ok((message_type, header.length))
}

fn parse_header(bytes: &[u8], max_frame_len: u32) -> Result<FrameHeader, CommandError> {
    FrameHeader::parse_slice(bytes, max_frame_len)
        .map_err(|e| CommandError::ProtocolError(format!("Malformed reply header: {}", e)))
}

fn remaining(deadline: Instant, timeout: Duration) -> Result<Duration, CommandError> {
    let left = deadline.saturating_duration_since(Instant::now());
    if left.is_zero() {
        Err(CommandError::Timeout(timeout))
    } else {
        Ok(left)
    }
}

impl Drop for CommandClient {
    fn drop(&mut self) {
        self.session.close();
    }
}

impl std::fmt::Debug for CommandClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandClient")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}
