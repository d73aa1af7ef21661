//! 点动（jog）指令
//!
//! 点动只是把速度 / 步进请求透传给控制器，不做轨迹规划。
//! 每个请求编码为一段完整的 URScript 文本，以换行结尾。

use crate::ProtocolError;
use std::fmt::Write as _;

/// 点动空间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JogSpace {
    /// 工具坐标（TCP）直线 / 旋转
    Cartesian,
    /// 单关节
    Joint,
}

/// 笛卡尔轴
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CartesianAxis {
    X = 0,
    Y = 1,
    Z = 2,
    Rx = 3,
    Ry = 4,
    Rz = 5,
}

impl CartesianAxis {
    pub const ALL: [Self; 6] = [Self::X, Self::Y, Self::Z, Self::Rx, Self::Ry, Self::Rz];

    pub fn index(self) -> usize {
        self as usize
    }

    /// 是否为旋转轴（单位 rad，否则为 m）
    pub fn is_rotation(self) -> bool {
        matches!(self, Self::Rx | Self::Ry | Self::Rz)
    }
}

/// 关节编号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Joint {
    J1 = 0,
    J2 = 1,
    J3 = 2,
    J4 = 3,
    J5 = 4,
    J6 = 5,
}

impl Joint {
    pub const ALL: [Self; 6] = [Self::J1, Self::J2, Self::J3, Self::J4, Self::J5, Self::J6];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<usize> for CartesianAxis {
    type Error = ProtocolError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(ProtocolError::InvalidAxis(index))
    }
}

impl TryFrom<usize> for Joint {
    type Error = ProtocolError;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(ProtocolError::InvalidAxis(index))
    }
}

/// 点动方式
///
/// 单位：笛卡尔平移 m / m/s / m/s²，旋转与关节 rad / rad/s / rad/s²，时间 s。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JogMotion {
    /// 连续速度点动，`speed` 的符号表示方向
    Velocity {
        speed: f64,
        acceleration: f64,
        duration: f64,
    },
    /// 相对当前位置步进 `distance`（带符号）
    Step {
        distance: f64,
        speed: f64,
        acceleration: f64,
    },
    /// 减速停止
    Stop { deceleration: f64 },
}

/// 点动指令
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JogCommand {
    pub space: JogSpace,
    /// 轴索引 0..6
    pub axis: usize,
    pub motion: JogMotion,
}

fn require_finite(field: &'static str, value: f64) -> Result<(), ProtocolError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ProtocolError::InvalidValue { field, value })
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ProtocolError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ProtocolError::InvalidValue { field, value })
    }
}

impl JogCommand {
    /// 笛卡尔点动
    pub fn cartesian(axis: CartesianAxis, motion: JogMotion) -> Self {
        Self {
            space: JogSpace::Cartesian,
            axis: axis.index(),
            motion,
        }
    }

    /// 关节点动
    pub fn joint(joint: Joint, motion: JogMotion) -> Self {
        Self {
            space: JogSpace::Joint,
            axis: joint.index(),
            motion,
        }
    }

    /// 停止指令（`stopl` / `stopj`）
    pub fn stop(space: JogSpace, deceleration: f64) -> Self {
        Self {
            space,
            axis: 0,
            motion: JogMotion::Stop { deceleration },
        }
    }

    /// 校验轴索引和数值
    ///
    /// # 错误
    /// - `ProtocolError::InvalidAxis`: 轴索引不在 0..6
    /// - `ProtocolError::InvalidValue`: 非有限值，或速度 / 加速度 / 时长不为正
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.axis >= 6 {
            return Err(ProtocolError::InvalidAxis(self.axis));
        }
        match self.motion {
            JogMotion::Velocity {
                speed,
                acceleration,
                duration,
            } => {
                require_finite("speed", speed)?;
                require_positive("acceleration", acceleration)?;
                require_positive("duration", duration)?;
            },
            JogMotion::Step {
                distance,
                speed,
                acceleration,
            } => {
                require_finite("distance", distance)?;
                require_positive("speed", speed)?;
                require_positive("acceleration", acceleration)?;
            },
            JogMotion::Stop { deceleration } => {
                require_positive("deceleration", deceleration)?;
            },
        }
        Ok(())
    }

    /// 编码为 URScript 程序文本（以换行结尾）
    ///
    /// # 示例
    ///
    /// ```
    /// use ur_protocol::{CartesianAxis, JogCommand, JogMotion};
    ///
    /// let cmd = JogCommand::cartesian(
    ///     CartesianAxis::Z,
    ///     JogMotion::Velocity { speed: 0.1, acceleration: 0.5, duration: 0.2 },
    /// );
    /// assert_eq!(
    ///     cmd.to_script().unwrap(),
    ///     "speedl([0.000000,0.000000,0.100000,0.000000,0.000000,0.000000],0.500000,0.200000)\n"
    /// );
    /// ```
    pub fn to_script(&self) -> Result<String, ProtocolError> {
        self.validate()?;

        let script = match (self.space, self.motion) {
            (
                space,
                JogMotion::Velocity {
                    speed,
                    acceleration,
                    duration,
                },
            ) => {
                let func = match space {
                    JogSpace::Cartesian => "speedl",
                    JogSpace::Joint => "speedj",
                };
                format!(
                    "{}({},{},{})\n",
                    func,
                    axis_vector(self.axis, speed),
                    num(acceleration),
                    num(duration)
                )
            },
            (
                JogSpace::Cartesian,
                JogMotion::Step {
                    distance,
                    speed,
                    acceleration,
                },
            ) => format!(
                "movel(pose_add(get_actual_tcp_pose(),p{}),a={},v={})\n",
                axis_vector(self.axis, distance),
                num(acceleration),
                num(speed)
            ),
            (
                JogSpace::Joint,
                JogMotion::Step {
                    distance,
                    speed,
                    acceleration,
                },
            ) => {
                let mut program = String::from("def ur_jog_step():\n");
                let _ = writeln!(program, "  q = get_actual_joint_positions()");
                let _ = writeln!(
                    program,
                    "  q[{axis}] = q[{axis}] + {}",
                    num(distance),
                    axis = self.axis
                );
                let _ = writeln!(program, "  movej(q,a={},v={})", num(acceleration), num(speed));
                program.push_str("end\n");
                program
            },
            (JogSpace::Cartesian, JogMotion::Stop { deceleration }) => {
                format!("stopl({})\n", num(deceleration))
            },
            (JogSpace::Joint, JogMotion::Stop { deceleration }) => {
                format!("stopj({})\n", num(deceleration))
            },
        };
        Ok(script)
    }
}

/// 固定 6 位小数，保证输出稳定
fn num(value: f64) -> String {
    format!("{:.6}", value)
}

/// 只有 `axis` 位置非零的 6 元向量
fn axis_vector(axis: usize, value: f64) -> String {
    let parts: Vec<String> = (0..6)
        .map(|i| if i == axis { num(value) } else { num(0.0) })
        .collect();
    format!("[{}]", parts.join(","))
}
