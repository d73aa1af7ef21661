//! 客户端错误类型

use std::time::Duration;
use thiserror::Error;
use ur_net::{ChannelError, ConnectError};

/// 主接口（命令通道）错误
#[derive(Error, Debug)]
pub enum CommandError {
    /// 无法建立连接
    #[error("Primary interface not connected: {0}")]
    NotConnected(#[from] ConnectError),

    /// 连接中断或应答格式错误（连接已被丢弃）
    #[error("Primary interface protocol error: {0}")]
    ProtocolError(String),

    /// 应答超时（连接已被丢弃）
    #[error("No reply from primary interface within {0:?}")]
    Timeout(Duration),

    /// 指令未通过校验，未发送
    #[error("Invalid command: {0}")]
    InvalidCommand(#[from] ur_protocol::ProtocolError),
}

impl CommandError {
    pub(crate) fn from_channel(e: ChannelError, timeout: Duration) -> Self {
        match e {
            ChannelError::TimedOut => Self::Timeout(timeout),
            e => Self::ProtocolError(e.to_string()),
        }
    }
}

/// Dashboard 错误
#[derive(Error, Debug)]
pub enum DashboardError {
    /// 无法建立连接
    #[error("Dashboard server not connected: {0}")]
    NotConnected(#[from] ConnectError),

    /// 连接中断、横幅或应答格式错误
    #[error("Dashboard protocol error: {0}")]
    ProtocolError(String),

    /// 应答超时（连接已被丢弃）
    #[error("No reply from dashboard server within {0:?}")]
    Timeout(Duration),

    /// 指令为空或包含换行，未发送
    #[error("Invalid command: {0}")]
    InvalidCommand(#[from] ur_protocol::ProtocolError),

    /// 服务端明确拒绝（例如 `Failed to execute: play`）
    #[error("Dashboard rejected '{command}': {reply}")]
    Rejected { command: String, reply: String },
}

impl DashboardError {
    pub(crate) fn from_channel(e: ChannelError, timeout: Duration) -> Self {
        match e {
            ChannelError::TimedOut => Self::Timeout(timeout),
            e => Self::ProtocolError(e.to_string()),
        }
    }
}
