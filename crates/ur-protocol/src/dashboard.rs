//! Dashboard 文本协议
//!
//! 每条指令一行 ASCII 文本（`\n` 结尾），服务端回复一行文本。
//! 连接建立后服务端先发送一行欢迎横幅。

use crate::ProtocolError;
use crate::modes::{RobotMode, SafetyMode};

/// 欢迎横幅前缀
pub const DASHBOARD_BANNER_PREFIX: &str = "Connected: Universal Robots Dashboard Server";

/// 单行应答长度上限（字节）
pub const MAX_REPLY_LEN: usize = 4096;

/// 常用 Dashboard 指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DashboardCommand {
    PowerOn,
    PowerOff,
    BrakeRelease,
    UnlockProtectiveStop,
    CloseSafetyPopup,
    RestartSafety,
    Play,
    Pause,
    Stop,
    RobotMode,
    SafetyStatus,
}

impl DashboardCommand {
    /// 指令文本（不含换行）
    pub fn as_line(self) -> &'static str {
        match self {
            Self::PowerOn => "power on",
            Self::PowerOff => "power off",
            Self::BrakeRelease => "brake release",
            Self::UnlockProtectiveStop => "unlock protective stop",
            Self::CloseSafetyPopup => "close safety popup",
            Self::RestartSafety => "restart safety",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::RobotMode => "robotmode",
            Self::SafetyStatus => "safetystatus",
        }
    }
}

/// 校验一行指令文本
///
/// 指令不能为空（去除空白后），也不能包含 `\r` / `\n`，
/// 否则一次请求会被服务端拆成多条指令。
pub fn validate_line(line: &str) -> Result<(), ProtocolError> {
    if line.trim().is_empty() {
        return Err(ProtocolError::InvalidText("empty command".to_string()));
    }
    if line.contains(['\r', '\n']) {
        return Err(ProtocolError::InvalidText(format!(
            "command contains line terminator: {:?}",
            line
        )));
    }
    Ok(())
}

/// 是否为欢迎横幅
pub fn is_banner(line: &str) -> bool {
    line.starts_with(DASHBOARD_BANNER_PREFIX)
}

/// 应答是否表示执行失败（例如 `Failed to execute: play`）
pub fn is_failure_reply(reply: &str) -> bool {
    let lower = reply.trim_start().to_ascii_lowercase();
    lower.starts_with("failed") || lower.starts_with("could not") || lower.starts_with("error")
}

/// 取 `Key: VALUE` 形式应答中 `key` 对应的值（不区分大小写）
fn reply_value<'a>(reply: &'a str, keys: &[&str]) -> Option<&'a str> {
    let (key, value) = reply.split_once(':')?;
    let key = key.trim();
    keys.iter()
        .any(|k| key.eq_ignore_ascii_case(k))
        .then(|| value.trim())
}

/// 解析 `robotmode` 应答（`Robotmode: RUNNING`）
pub fn parse_robot_mode_reply(reply: &str) -> Option<RobotMode> {
    reply_value(reply, &["Robotmode"])?.parse().ok()
}

/// 解析 `safetystatus` 应答（`Safetystatus: NORMAL`，旧固件为 `Safetymode: NORMAL`）
pub fn parse_safety_status_reply(reply: &str) -> Option<SafetyMode> {
    reply_value(reply, &["Safetystatus", "Safetymode"])?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_lines_are_valid() {
        for cmd in [
            DashboardCommand::PowerOn,
            DashboardCommand::BrakeRelease,
            DashboardCommand::UnlockProtectiveStop,
            DashboardCommand::SafetyStatus,
        ] {
            assert!(validate_line(cmd.as_line()).is_ok());
        }
    }

    #[test]
    fn test_validate_line_rejects_terminators() {
        assert!(validate_line("play\nstop").is_err());
        assert!(validate_line("play\r").is_err());
        assert!(validate_line("   ").is_err());
        assert!(validate_line("").is_err());
    }

    #[test]
    fn test_banner() {
        assert!(is_banner("Connected: Universal Robots Dashboard Server"));
        assert!(!is_banner("Robotmode: RUNNING"));
    }

    #[test]
    fn test_parse_robot_mode_reply() {
        assert_eq!(
            parse_robot_mode_reply("Robotmode: RUNNING"),
            Some(RobotMode::Running)
        );
        assert_eq!(
            parse_robot_mode_reply("robotmode: power_off"),
            Some(RobotMode::PowerOff)
        );
        assert_eq!(parse_robot_mode_reply("Safetystatus: NORMAL"), None);
        assert_eq!(parse_robot_mode_reply("garbage"), None);
    }

    #[test]
    fn test_parse_safety_status_reply() {
        assert_eq!(
            parse_safety_status_reply("Safetystatus: PROTECTIVE_STOP"),
            Some(SafetyMode::ProtectiveStop)
        );
        assert_eq!(
            parse_safety_status_reply("Safetymode: NORMAL"),
            Some(SafetyMode::Normal)
        );
    }

    #[test]
    fn test_failure_reply() {
        assert!(is_failure_reply("Failed to execute: play"));
        assert!(!is_failure_reply("Starting program"));
    }
}
