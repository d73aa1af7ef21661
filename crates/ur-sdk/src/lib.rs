//! UR SDK - Universal Robots UR10 控制器 Rust SDK
//!
//! 通过三个独立的 TCP 通道与控制器通信：
//!
//! | 通道      | 端口  | 用途                         |
//! |-----------|-------|------------------------------|
//! | 实时接口  | 30003 | 接收二进制遥测帧（数百 Hz）  |
//! | 主接口    | 30001 | 发送 URScript 点动 / 停止    |
//! | Dashboard | 29999 | 上电、松闸、解除保护性停止等 |
//!
//! # 架构设计
//!
//! - **协议层** (`protocol`): 帧头、遥测解码、URScript 编码，无 IO
//! - **网络层** (`net`): 阻塞式 TCP 通道、重连策略
//! - **驱动层** (`driver`): 实时接收线程、状态快照、观察者
//! - **客户端层** (`client`): 命令与 Dashboard 客户端
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use ur_sdk::prelude::*;
//!
//! ur_sdk::init_logging();
//!
//! let mut robot = UrRobotBuilder::new("192.168.1.100").build();
//! robot.receiver().add_safety_observer(|s| {
//!     if s.emergency_stopped {
//!         eprintln!("E-STOP");
//!     }
//! });
//! robot.connect_all()?;
//!
//! let jog = JogCommand::joint(
//!     Joint::J1,
//!     JogMotion::Velocity { speed: 0.1, acceleration: 0.5, duration: 0.2 },
//! );
//! robot.command().send_jog_command(&jog)?;
//! robot.stop_motion()?;
//! robot.disconnect_all();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod logging;
pub mod prelude;
mod robot;

pub use ur_client as client;
pub use ur_driver as driver;
pub use ur_net as net;
pub use ur_protocol as protocol;

pub use logging::{DEFAULT_LOG_FILTER, init_logging};
pub use robot::{ConnectAllError, UrRobot, UrRobotBuilder};

pub use ur_client::{CommandClient, CommandError, DashboardClient, DashboardError};
pub use ur_driver::{RealtimeReceiver, ReceiverBuilder, ReceiverError, RobotState};
pub use ur_protocol::ProtocolError;
