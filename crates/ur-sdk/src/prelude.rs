//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use ur_sdk::prelude::*;
//! ```

// 组合入口
pub use crate::{ConnectAllError, UrRobot, UrRobotBuilder};

// 实时接收
pub use ur_driver::{
    ConnectionStatistics, LinkState, ObserverToken, PositionSnapshot, RealtimeReceiver,
    ReceiverBuilder, RobotState, SafetySnapshot,
};

// 指令
pub use ur_client::{Ack, CommandClient, CommandConfig, DashboardClient, DashboardConfig};
pub use ur_protocol::{
    CartesianAxis, DashboardCommand, Joint, JogCommand, JogMotion, JogSpace, RobotMode, SafetyMode,
    Vector6,
};

// 错误类型
pub use ur_client::{CommandError, DashboardError};
pub use ur_driver::ReceiverError;
pub use ur_protocol::ProtocolError;
