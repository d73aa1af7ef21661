//! 通道错误类型

use std::net::SocketAddr;
use thiserror::Error;

/// 建立连接失败
#[derive(Error, Debug)]
pub enum ConnectError {
    /// 主机名解析失败
    #[error("Failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    /// 解析结果为空
    #[error("No address found for {host}")]
    NoAddress { host: String },

    /// 所有地址均连接失败（记录最后一个）
    #[error("Failed to connect to {addr}: {source}")]
    Unreachable {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// 连接已建立，但设置 socket 选项失败
    #[error("Failed to configure socket: {0}")]
    Configure(#[source] std::io::Error),
}

/// 收发错误
#[derive(Error, Debug)]
pub enum ChannelError {
    /// 对端关闭连接（读到 0 字节或写入已关闭的连接）
    #[error("Connection closed by peer")]
    Closed,

    /// 停止信号触发或本地主动关闭
    #[error("Operation cancelled")]
    Cancelled,

    /// 整体超时（仅限有界读取）
    #[error("Operation timed out")]
    TimedOut,

    /// 行长度超过上限
    #[error("Line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// 是否意味着连接已不可用
    ///
    /// `TimedOut` 与 `LineTooLong` 之后流可能失步，由调用方决定是否丢弃连接。
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Closed | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ChannelError::Closed.is_fatal());
        assert!(ChannelError::Io(std::io::Error::other("boom")).is_fatal());
        assert!(!ChannelError::Cancelled.is_fatal());
        assert!(!ChannelError::TimedOut.is_fatal());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            ChannelError::LineTooLong { limit: 4096 }.to_string(),
            "Line exceeds 4096 bytes"
        );
    }
}
