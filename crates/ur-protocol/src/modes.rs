//! 机器人模式 / 安全模式
//!
//! 控制器以小整数上报模式，这里提供类型化视图。
//! 未知数值映射为 `Unknown`，原始整数仍保存在状态快照中。

use std::fmt;
use std::str::FromStr;

/// 机器人模式（robot mode）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, num_enum::FromPrimitive)]
#[repr(i32)]
pub enum RobotMode {
    NoController = -1,
    Disconnected = 0,
    ConfirmSafety = 1,
    Booting = 2,
    PowerOff = 3,
    PowerOn = 4,
    Idle = 5,
    Backdrive = 6,
    Running = 7,
    UpdatingFirmware = 8,
    /// 未识别的数值
    #[default]
    Unknown = 255,
}

impl RobotMode {
    /// 控制器使用的名称（Dashboard 应答中的写法）
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoController => "NO_CONTROLLER",
            Self::Disconnected => "DISCONNECTED",
            Self::ConfirmSafety => "CONFIRM_SAFETY",
            Self::Booting => "BOOTING",
            Self::PowerOff => "POWER_OFF",
            Self::PowerOn => "POWER_ON",
            Self::Idle => "IDLE",
            Self::Backdrive => "BACKDRIVE",
            Self::Running => "RUNNING",
            Self::UpdatingFirmware => "UPDATING_FIRMWARE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for RobotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RobotMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s.trim().to_ascii_uppercase().as_str() {
            "NO_CONTROLLER" => Self::NoController,
            "DISCONNECTED" => Self::Disconnected,
            "CONFIRM_SAFETY" => Self::ConfirmSafety,
            "BOOTING" => Self::Booting,
            "POWER_OFF" => Self::PowerOff,
            "POWER_ON" => Self::PowerOn,
            "IDLE" => Self::Idle,
            "BACKDRIVE" => Self::Backdrive,
            "RUNNING" => Self::Running,
            "UPDATING_FIRMWARE" => Self::UpdatingFirmware,
            _ => return Err(()),
        };
        Ok(mode)
    }
}

/// 安全模式（safety mode）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, num_enum::FromPrimitive)]
#[repr(i32)]
pub enum SafetyMode {
    Normal = 1,
    Reduced = 2,
    ProtectiveStop = 3,
    Recovery = 4,
    SafeguardStop = 5,
    SystemEmergencyStop = 6,
    RobotEmergencyStop = 7,
    Violation = 8,
    Fault = 9,
    ValidateJointId = 10,
    Undefined = 11,
    AutomaticModeSafeguardStop = 12,
    SystemThreePositionEnablingStop = 13,
    /// 未识别的数值
    #[default]
    Unknown = 255,
}

impl SafetyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Reduced => "REDUCED",
            Self::ProtectiveStop => "PROTECTIVE_STOP",
            Self::Recovery => "RECOVERY",
            Self::SafeguardStop => "SAFEGUARD_STOP",
            Self::SystemEmergencyStop => "SYSTEM_EMERGENCY_STOP",
            Self::RobotEmergencyStop => "ROBOT_EMERGENCY_STOP",
            Self::Violation => "VIOLATION",
            Self::Fault => "FAULT",
            Self::ValidateJointId => "VALIDATE_JOINT_ID",
            Self::Undefined => "UNDEFINED_SAFETY_MODE",
            Self::AutomaticModeSafeguardStop => "AUTOMATIC_MODE_SAFEGUARD_STOP",
            Self::SystemThreePositionEnablingStop => "SYSTEM_THREE_POSITION_ENABLING_STOP",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// 是否处于任一急停模式
    pub fn is_emergency_stop(self) -> bool {
        matches!(self, Self::SystemEmergencyStop | Self::RobotEmergencyStop)
    }
}

impl fmt::Display for SafetyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SafetyMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s.trim().to_ascii_uppercase().as_str() {
            "NORMAL" => Self::Normal,
            "REDUCED" => Self::Reduced,
            "PROTECTIVE_STOP" => Self::ProtectiveStop,
            "RECOVERY" => Self::Recovery,
            "SAFEGUARD_STOP" => Self::SafeguardStop,
            "SYSTEM_EMERGENCY_STOP" => Self::SystemEmergencyStop,
            "ROBOT_EMERGENCY_STOP" => Self::RobotEmergencyStop,
            "VIOLATION" => Self::Violation,
            "FAULT" => Self::Fault,
            "VALIDATE_JOINT_ID" => Self::ValidateJointId,
            "UNDEFINED_SAFETY_MODE" => Self::Undefined,
            "AUTOMATIC_MODE_SAFEGUARD_STOP" => Self::AutomaticModeSafeguardStop,
            "SYSTEM_THREE_POSITION_ENABLING_STOP" => Self::SystemThreePositionEnablingStop,
            _ => return Err(()),
        };
        Ok(mode)
    }
}
