//! 字段偏移表
//!
//! 实时接口的字段位置以数据形式给出（字段名 → 偏移 + 宽度），
//! 解析逻辑不包含任何硬编码偏移。偏移量相对于载荷起点（第 0 字节为消息类型）。
//!
//! ⚠️ 默认偏移表是示意性的近似值，并非 Universal Robots 官方实时接口布局。
//! 部署前必须对照目标控制器固件版本的协议文档校正，
//! 校正只需修改 [`TelemetryLayout`]，无需改动解析代码。

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 单个 double 的宽度
pub const F64_WIDTH: usize = 8;
/// 6 个 double 组成的向量宽度
pub const VECTOR6_WIDTH: usize = 6 * F64_WIDTH;
/// 2 个 double 组成的向量宽度（模拟量输入/输出）
pub const VECTOR2_WIDTH: usize = 2 * F64_WIDTH;

/// 字段位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldOffset {
    /// 相对载荷起点的字节偏移
    pub offset: usize,
    /// 字段宽度（字节）
    pub width: usize,
}

impl FieldOffset {
    pub const fn new(offset: usize, width: usize) -> Self {
        Self { offset, width }
    }

    /// 6 × f64 向量字段
    pub const fn vector6(offset: usize) -> Self {
        Self::new(offset, VECTOR6_WIDTH)
    }

    /// 2 × f64 向量字段
    pub const fn vector2(offset: usize) -> Self {
        Self::new(offset, VECTOR2_WIDTH)
    }

    /// 单个 f64 字段
    pub const fn f64(offset: usize) -> Self {
        Self::new(offset, F64_WIDTH)
    }

    /// 单个 i32 字段
    pub const fn i32(offset: usize) -> Self {
        Self::new(offset, 4)
    }

    /// 单字节字段
    pub const fn byte(offset: usize) -> Self {
        Self::new(offset, 1)
    }

    /// 字段结束位置（不含）
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.width)
    }

    /// 取出字段对应的字节切片，载荷不足时返回 `None`
    pub fn slice<'a>(&self, payload: &'a [u8]) -> Option<&'a [u8]> {
        payload.get(self.offset..self.end()?)
    }
}

/// 机器人状态消息（type 16）偏移表
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RobotStateLayout {
    pub controller_time: Option<FieldOffset>,
    pub joint_angles: Option<FieldOffset>,
    pub joint_speeds: Option<FieldOffset>,
    pub joint_currents: Option<FieldOffset>,
    pub tcp_pose: Option<FieldOffset>,
    pub tcp_speed: Option<FieldOffset>,
    pub tcp_force: Option<FieldOffset>,
    pub digital_inputs: Option<FieldOffset>,
    pub joint_temperatures: Option<FieldOffset>,
    pub execution_time: Option<FieldOffset>,
    pub digital_outputs: Option<FieldOffset>,
    pub analog_inputs: Option<FieldOffset>,
    pub analog_outputs: Option<FieldOffset>,
}

impl Default for RobotStateLayout {
    fn default() -> Self {
        // 载荷第 0 字节为消息类型，其后每个数据段 48 字节
        Self {
            controller_time: Some(FieldOffset::f64(5)),
            joint_angles: Some(FieldOffset::vector6(253)),
            joint_speeds: Some(FieldOffset::vector6(301)),
            joint_currents: Some(FieldOffset::vector6(349)),
            tcp_pose: Some(FieldOffset::vector6(445)),
            tcp_speed: Some(FieldOffset::vector6(493)),
            tcp_force: Some(FieldOffset::vector6(541)),
            digital_inputs: Some(FieldOffset::f64(685)),
            joint_temperatures: Some(FieldOffset::vector6(693)),
            execution_time: Some(FieldOffset::f64(741)),
            digital_outputs: Some(FieldOffset::f64(1045)),
            analog_inputs: None,
            analog_outputs: None,
        }
    }
}

/// 安全状态消息（type 20）偏移表
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SafetyLayout {
    pub robot_mode: Option<FieldOffset>,
    pub safety_mode: Option<FieldOffset>,
    /// 状态位：bit0 急停，bit1 保护性停止，bit2 程序运行
    pub status_flags: Option<FieldOffset>,
    pub speed_scaling: Option<FieldOffset>,
}

impl Default for SafetyLayout {
    fn default() -> Self {
        Self {
            robot_mode: Some(FieldOffset::i32(1)),
            safety_mode: Some(FieldOffset::i32(5)),
            status_flags: Some(FieldOffset::byte(9)),
            speed_scaling: Some(FieldOffset::f64(10)),
        }
    }
}

/// 完整遥测偏移表
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TelemetryLayout {
    pub robot_state: RobotStateLayout,
    pub safety: SafetyLayout,
}

impl TelemetryLayout {
    /// 机器人状态消息中所有已配置字段的最大结束位置
    ///
    /// 用于构造测试帧或估算最小完整载荷长度。
    pub fn robot_state_extent(&self) -> usize {
        let l = &self.robot_state;
        [
            l.controller_time,
            l.joint_angles,
            l.joint_speeds,
            l.joint_currents,
            l.tcp_pose,
            l.tcp_speed,
            l.tcp_force,
            l.digital_inputs,
            l.joint_temperatures,
            l.execution_time,
            l.digital_outputs,
            l.analog_inputs,
            l.analog_outputs,
        ]
        .into_iter()
        .flatten()
        .filter_map(|field| field.end())
        .max()
        .unwrap_or(1)
    }
}
