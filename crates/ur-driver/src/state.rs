//! 机器人状态
//!
//! 接收线程独占一份工作副本，每处理一条消息后整体发布为不可变快照
//! （`ArcSwap<RobotState>`）。读取方拿到的是副本，不会看到半更新的状态。

use crate::link::AtomicLinkState;
use crate::metrics::ReceiverMetrics;
use crate::observers::ObserverRegistry;
use crate::stats::ConnectionStatistics;
use arc_swap::ArcSwap;
use std::sync::Arc;
use std::time::SystemTime;
use ur_protocol::{RobotMode, RobotStateFeedback, SafetyFeedback, SafetyMode, Vector6};

/// 完整机器人状态
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RobotState {
    /// 最后一次更新的墙钟时间（首条消息前为 `UNIX_EPOCH`）
    pub timestamp: SystemTime,
    /// TCP 位姿 [x, y, z, rx, ry, rz]（m, rad）
    pub tcp_pose: Vector6,
    /// 关节角 J1..J6（rad）
    pub joint_angles: Vector6,
    pub tcp_speed: Vector6,
    pub joint_speeds: Vector6,
    pub joint_currents: Vector6,
    pub joint_temperatures: Vector6,
    pub tcp_force: Vector6,
    pub robot_mode: i32,
    pub safety_mode: i32,
    pub program_running: bool,
    pub emergency_stopped: bool,
    pub protective_stopped: bool,
    /// 速度缩放，始终在 [0, 1]
    pub speed_scaling: f64,
    pub digital_inputs: u64,
    pub digital_outputs: u64,
    pub analog_inputs: [f64; 2],
    pub analog_outputs: [f64; 2],
    pub controller_time: f64,
    pub execution_time: f64,
    /// 连接质量百分比
    pub connection_quality: u8,
}

impl Default for RobotState {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::UNIX_EPOCH,
            tcp_pose: [0.0; 6],
            joint_angles: [0.0; 6],
            tcp_speed: [0.0; 6],
            joint_speeds: [0.0; 6],
            joint_currents: [0.0; 6],
            joint_temperatures: [0.0; 6],
            tcp_force: [0.0; 6],
            robot_mode: 0,
            safety_mode: 0,
            program_running: false,
            emergency_stopped: false,
            protective_stopped: false,
            speed_scaling: 1.0,
            digital_inputs: 0,
            digital_outputs: 0,
            analog_inputs: [0.0; 2],
            analog_outputs: [0.0; 2],
            controller_time: 0.0,
            execution_time: 0.0,
            connection_quality: 100,
        }
    }
}

impl RobotState {
    /// 合并机器人状态消息，`None` 字段保留旧值
    pub fn apply_robot_state(&mut self, msg: &RobotStateFeedback) {
        fn merge<T: Copy>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }

        merge(&mut self.controller_time, msg.controller_time);
        merge(&mut self.joint_angles, msg.joint_angles);
        merge(&mut self.joint_speeds, msg.joint_speeds);
        merge(&mut self.joint_currents, msg.joint_currents);
        merge(&mut self.tcp_pose, msg.tcp_pose);
        merge(&mut self.tcp_speed, msg.tcp_speed);
        merge(&mut self.tcp_force, msg.tcp_force);
        merge(&mut self.digital_inputs, msg.digital_inputs);
        merge(&mut self.joint_temperatures, msg.joint_temperatures);
        merge(&mut self.execution_time, msg.execution_time);
        merge(&mut self.digital_outputs, msg.digital_outputs);
        merge(&mut self.analog_inputs, msg.analog_inputs);
        merge(&mut self.analog_outputs, msg.analog_outputs);
    }

    /// 合并安全状态消息
    pub fn apply_safety(&mut self, msg: &SafetyFeedback) {
        if let Some(mode) = msg.robot_mode {
            self.robot_mode = mode;
        }
        if let Some(mode) = msg.safety_mode {
            self.safety_mode = mode;
        }
        if let Some(flags) = msg.flags {
            self.emergency_stopped = flags.emergency_stopped();
            self.protective_stopped = flags.protective_stopped();
            self.program_running = flags.program_running();
        }
        if let Some(scaling) = msg.speed_scaling {
            // 解码层已钳制，这里再保证一次不变式
            if scaling.is_finite() {
                self.speed_scaling = scaling.clamp(0.0, 1.0);
            }
        }
    }

    pub fn robot_mode_kind(&self) -> RobotMode {
        RobotMode::from(self.robot_mode)
    }

    pub fn safety_mode_kind(&self) -> SafetyMode {
        SafetyMode::from(self.safety_mode)
    }

    pub fn position(&self) -> PositionSnapshot {
        PositionSnapshot {
            timestamp: self.timestamp,
            tcp_pose: self.tcp_pose,
            joint_angles: self.joint_angles,
        }
    }

    pub fn safety(&self) -> SafetySnapshot {
        SafetySnapshot {
            timestamp: self.timestamp,
            robot_mode: self.robot_mode,
            safety_mode: self.safety_mode,
            emergency_stopped: self.emergency_stopped,
            protective_stopped: self.protective_stopped,
            program_running: self.program_running,
            speed_scaling: self.speed_scaling,
        }
    }
}

/// 位置视图（位置观察者使用）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PositionSnapshot {
    pub timestamp: SystemTime,
    pub tcp_pose: Vector6,
    pub joint_angles: Vector6,
}

/// 安全视图（安全观察者使用）
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SafetySnapshot {
    pub timestamp: SystemTime,
    pub robot_mode: i32,
    pub safety_mode: i32,
    pub emergency_stopped: bool,
    pub protective_stopped: bool,
    pub program_running: bool,
    pub speed_scaling: f64,
}

/// 接收器共享上下文
///
/// 接收线程是 `robot_state` 与 `statistics` 的唯一写入方。
pub struct ReceiverContext {
    pub robot_state: ArcSwap<RobotState>,
    pub statistics: ArcSwap<ConnectionStatistics>,
    pub link: AtomicLinkState,
    pub observers: ObserverRegistry,
    pub metrics: ReceiverMetrics,
}

impl ReceiverContext {
    pub fn new() -> Self {
        Self {
            robot_state: ArcSwap::from_pointee(RobotState::default()),
            statistics: ArcSwap::from_pointee(ConnectionStatistics::default()),
            link: AtomicLinkState::default(),
            observers: ObserverRegistry::new(),
            metrics: ReceiverMetrics::new(),
        }
    }

    /// 当前状态快照（`Arc` 克隆，无拷贝）
    pub fn snapshot(&self) -> Arc<RobotState> {
        self.robot_state.load_full()
    }
}

impl Default for ReceiverContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReceiverContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverContext")
            .field("link", &self.link.get())
            .field("observers", &self.observers.len())
            .field("metrics", &self.metrics.snapshot())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ur_protocol::SafetyFlags;

    fn flags(estop: bool, protective: bool, running: bool) -> SafetyFlags {
        let mut flags = SafetyFlags::default();
        flags.set_emergency_stopped(estop);
        flags.set_protective_stopped(protective);
        flags.set_program_running(running);
        flags
    }

    #[test]
    fn test_default_state() {
        let state = RobotState::default();
        assert_eq!(state.timestamp, SystemTime::UNIX_EPOCH);
        assert_eq!(state.speed_scaling, 1.0);
        assert_eq!(state.connection_quality, 100);
        assert_eq!(state.analog_inputs, [0.0; 2]);
    }

    #[test]
    fn test_apply_robot_state_keeps_missing_fields() {
        let mut state = RobotState {
            tcp_pose: [9.0; 6],
            ..Default::default()
        };
        let msg = RobotStateFeedback {
            joint_angles: Some([1.0; 6]),
            ..Default::default()
        };
        state.apply_robot_state(&msg);
        assert_eq!(state.joint_angles, [1.0; 6]);
        assert_eq!(state.tcp_pose, [9.0; 6]);
    }

    #[test]
    fn test_apply_safety_flags_are_independent() {
        let mut state = RobotState::default();
        state.apply_safety(&SafetyFeedback {
            robot_mode: Some(7),
            safety_mode: Some(3),
            flags: Some(flags(false, true, false)),
            speed_scaling: Some(0.3),
            ..Default::default()
        });
        assert!(!state.emergency_stopped);
        assert!(state.protective_stopped);
        assert!(!state.program_running);
        assert_eq!(state.robot_mode_kind(), RobotMode::Running);
        assert_eq!(state.safety_mode_kind(), SafetyMode::ProtectiveStop);
        assert_eq!(state.speed_scaling, 0.3);

        state.apply_safety(&SafetyFeedback {
            flags: Some(flags(true, true, false)),
            ..Default::default()
        });
        assert!(state.emergency_stopped);
        assert!(state.protective_stopped);
        // 未携带的字段保持不变
        assert_eq!(state.robot_mode, 7);
        assert_eq!(state.speed_scaling, 0.3);
    }

    #[test]
    fn test_derived_views() {
        let state = RobotState {
            tcp_pose: [0.1, 0.2, 0.3, 0.0, 0.0, 0.0],
            joint_angles: [1.0; 6],
            speed_scaling: 0.5,
            ..Default::default()
        };
        let position = state.position();
        assert_eq!(position.tcp_pose, state.tcp_pose);
        assert_eq!(position.joint_angles, state.joint_angles);
        assert_eq!(state.safety().speed_scaling, 0.5);
    }

    #[test]
    fn test_context_snapshot_is_immutable_copy() {
        let ctx = ReceiverContext::new();
        let before = ctx.snapshot();
        let next = RobotState {
            tcp_pose: [1.0; 6],
            ..(*before).clone()
        };
        ctx.robot_state.store(Arc::new(next));
        assert_eq!(before.tcp_pose, [0.0; 6]);
        assert_eq!(ctx.snapshot().tcp_pose, [1.0; 6]);
    }
}
