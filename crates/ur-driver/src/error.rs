//! 接收器错误类型

use thiserror::Error;
use ur_net::ConnectError;

/// 实时接收器错误
#[derive(Error, Debug)]
pub enum ReceiverError {
    /// 连接失败（接收器保持 `Disconnected`）
    #[error("Failed to connect to real-time interface: {0}")]
    Connect(#[from] ConnectError),

    /// 重连次数耗尽
    #[error("Reconnect failed after {attempts} attempt(s): {last_error}")]
    ReconnectExhausted {
        attempts: u32,
        #[source]
        last_error: Box<ReceiverError>,
    },

    /// 接收线程创建失败
    #[error("Failed to spawn receive thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_reconnect_exhausted_display() {
        let inner = ReceiverError::Connect(ConnectError::NoAddress {
            host: "robot.local".to_string(),
        });
        let err = ReceiverError::ReconnectExhausted {
            attempts: 3,
            last_error: Box::new(inner),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Reconnect failed after 3 attempt(s)"), "{}", msg);
        assert!(msg.contains("robot.local"));
        assert!(err.source().is_some());
    }
}
