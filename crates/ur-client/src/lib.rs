//! # UR Client
//!
//! 请求 / 应答式客户端：
//!
//! - [`CommandClient`]: 主接口（30001），发送 URScript 点动 / 停止指令
//! - [`DashboardClient`]: Dashboard 服务（29999），发送文本指令（上电、松闸、解除保护性停止等）
//!
//! 两个客户端都按需建立连接并复用；任何收发失败都会丢弃连接，
//! 下一次调用重新连接。它们与实时接收线程完全独立。

mod command;
mod dashboard;
mod error;
mod session;

pub use command::{
    Ack, CommandClient, CommandConfig, DEFAULT_DRAIN_IDLE, DEFAULT_PRIMARY_PORT,
    DEFAULT_STOP_DECELERATION,
};
pub use dashboard::{DEFAULT_DASHBOARD_PORT, DashboardClient, DashboardConfig};
pub use error::{CommandError, DashboardError};
