//! 实时接收层
//!
//! 本模块提供 UR 控制器实时接口（端口 30003）的接收功能，包括：
//! - 接收线程管理（单个后台线程，有界停止）
//! - 状态同步（ArcSwap 无锁读取）
//! - 帧解码与部分消息合并
//! - 消息频率估计与连接质量
//! - 观察者回调（完整状态 / 位置 / 安全）
//!
//! # 使用场景
//!
//! 适用于只需要监视机器人状态的场景。需要同时发送运动或 Dashboard 命令时，
//! 使用 `ur-sdk` 提供的 `UrRobot`。

mod builder;
pub mod config;
mod error;
pub mod link;
pub mod metrics;
pub mod observers;
pub mod pipeline;
mod receiver;
pub mod state;
pub mod stats;

pub use builder::ReceiverBuilder;
pub use config::{DEFAULT_HOST, DEFAULT_REALTIME_PORT, PipelineConfig, ReceiverConfig};
pub use error::ReceiverError;
pub use link::{AtomicLinkState, LinkState};
pub use metrics::{MetricsSnapshot, ReceiverMetrics};
pub use observers::{ObserverRegistry, ObserverToken};
pub use pipeline::{apply_message, rx_loop};
pub use receiver::{RX_THREAD_NAME, RealtimeReceiver};
pub use state::{PositionSnapshot, ReceiverContext, RobotState, SafetySnapshot};
pub use stats::{ConnectionStatistics, DEFAULT_SMOOTHING, FrequencyEstimator};
