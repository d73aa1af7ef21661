//! Dashboard 客户端
//!
//! Dashboard 服务（默认端口 29999）是逐行文本协议：连接后服务端先发送一行横幅，
//! 之后每条指令对应一行应答。

use crate::error::DashboardError;
use crate::session::Session;
use std::time::Duration;
use tracing::{debug, info, warn};
use ur_net::{ChannelConfig, FramedChannel, ReconnectPolicy};
use ur_protocol::dashboard::{
    MAX_REPLY_LEN, is_banner, is_failure_reply, parse_robot_mode_reply, parse_safety_status_reply,
    validate_line,
};
use ur_protocol::{DashboardCommand, RobotMode, SafetyMode};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dashboard 默认端口
pub const DEFAULT_DASHBOARD_PORT: u16 = 29999;

/// Dashboard 客户端配置
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DashboardConfig {
    pub host: String,
    pub port: u16,
    pub channel: ChannelConfig,
    /// 等待横幅或应答行的时长
    pub reply_timeout: Duration,
    /// `reconnect()` 使用的重试策略
    pub reconnect: ReconnectPolicy,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.100".to_string(),
            port: DEFAULT_DASHBOARD_PORT,
            channel: ChannelConfig::default(),
            reply_timeout: Duration::from_secs(2),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl DashboardConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }
}

/// Dashboard 客户端
///
/// # 示例
///
/// ```rust,no_run
/// use ur_client::{DashboardClient, DashboardConfig};
///
/// let mut dashboard = DashboardClient::new(DashboardConfig::new("192.168.1.100"));
/// dashboard.connect()?;
/// dashboard.power_on()?;
/// dashboard.brake_release()?;
/// println!("mode: {}", dashboard.robot_mode()?);
/// # Ok::<(), ur_client::DashboardError>(())
/// ```
pub struct DashboardClient {
    config: DashboardConfig,
    session: Session,
}

impl DashboardClient {
    pub fn new(config: DashboardConfig) -> Self {
        let session = Session::new(
            "dashboard",
            config.host.clone(),
            config.port,
            config.channel.clone(),
        );
        Self { config, session }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// 建立连接并读取横幅（已连接时直接返回）
    pub fn connect(&mut self) -> Result<(), DashboardError> {
        let timeout = self.config.reply_timeout;
        self.session.ensure(|channel| read_banner(channel, timeout))?;
        Ok(())
    }

    pub fn disconnect(&mut self) {
        self.session.close();
    }

    /// 断开后按重试策略重新连接，返回最后一次失败
    pub fn reconnect(&mut self) -> Result<(), DashboardError> {
        self.disconnect();
        let policy = self.config.reconnect;
        policy.run(|_| self.connect()).map_err(|e| e.last_error)
    }

    /// 发送一行文本指令并返回应答行
    ///
    /// 应答内容原样返回，包括 `Failed to execute` 一类的失败应答。
    ///
    /// # 错误
    /// - `DashboardError::InvalidCommand`: 空指令或包含换行（不发送）
    /// - `DashboardError::Timeout` / `ProtocolError`: 连接已丢弃
    pub fn send_text_command(&mut self, line: &str) -> Result<String, DashboardError> {
        validate_line(line)?;

        let timeout = self.config.reply_timeout;
        let channel = self.session.ensure(|channel| read_banner(channel, timeout))?;
        debug!("Dashboard <- {}", line);

        match exchange(channel, line, timeout) {
            Ok(reply) => {
                debug!("Dashboard -> {}", reply);
                Ok(reply)
            },
            Err(e) => {
                self.session.drop_channel(&e);
                Err(e)
            },
        }
    }

    /// 发送预定义指令，失败应答转为 `DashboardError::Rejected`
    pub fn send_command(&mut self, command: DashboardCommand) -> Result<String, DashboardError> {
        let line = command.as_line();
        let reply = self.send_text_command(line)?;
        if is_failure_reply(&reply) {
            warn!("Dashboard rejected '{}': {}", line, reply);
            return Err(DashboardError::Rejected {
                command: line.to_string(),
                reply,
            });
        }
        Ok(reply)
    }

    pub fn power_on(&mut self) -> Result<String, DashboardError> {
        self.send_command(DashboardCommand::PowerOn)
    }

    pub fn power_off(&mut self) -> Result<String, DashboardError> {
        self.send_command(DashboardCommand::PowerOff)
    }

    pub fn brake_release(&mut self) -> Result<String, DashboardError> {
        self.send_command(DashboardCommand::BrakeRelease)
    }

    /// 解除保护性停止
    pub fn unlock_protective_stop(&mut self) -> Result<String, DashboardError> {
        self.send_command(DashboardCommand::UnlockProtectiveStop)
    }

    pub fn close_safety_popup(&mut self) -> Result<String, DashboardError> {
        self.send_command(DashboardCommand::CloseSafetyPopup)
    }

    /// 重启安全系统（故障 / 违规后）
    pub fn restart_safety(&mut self) -> Result<String, DashboardError> {
        self.send_command(DashboardCommand::RestartSafety)
    }

    pub fn play(&mut self) -> Result<String, DashboardError> {
        self.send_command(DashboardCommand::Play)
    }

    pub fn pause(&mut self) -> Result<String, DashboardError> {
        self.send_command(DashboardCommand::Pause)
    }

    pub fn stop(&mut self) -> Result<String, DashboardError> {
        self.send_command(DashboardCommand::Stop)
    }

    /// 查询机器人模式
    pub fn robot_mode(&mut self) -> Result<RobotMode, DashboardError> {
        let reply = self.send_command(DashboardCommand::RobotMode)?;
        parse_robot_mode_reply(&reply).ok_or_else(|| {
            DashboardError::ProtocolError(format!("Unexpected robotmode reply: {}", reply))
        })
    }

    /// 查询安全状态
    pub fn safety_status(&mut self) -> Result<SafetyMode, DashboardError> {
        let reply = self.send_command(DashboardCommand::SafetyStatus)?;
        parse_safety_status_reply(&reply).ok_or_else(|| {
            DashboardError::ProtocolError(format!("Unexpected safetystatus reply: {}", reply))
        })
    }
}

fn read_line(channel: &mut FramedChannel, timeout: Duration) -> Result<String, DashboardError> {
    let bytes = channel
        .receive_line(MAX_REPLY_LEN, timeout)
        .map_err(|e| DashboardError::from_channel(e, timeout))?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| DashboardError::ProtocolError(format!("Reply is not UTF-8: {}", e)))
}

fn read_banner(channel: &mut FramedChannel, timeout: Duration) -> Result<(), DashboardError> {
    let banner = read_line(channel, timeout)?;
    if is_banner(&banner) {
        info!("Dashboard banner: {}", banner);
    } else {
        warn!("Unexpected dashboard banner: {}", banner);
    }
    Ok(())
}

fn exchange(channel: &mut FramedChannel, line: &str, timeout: Duration) -> Result<String, DashboardError> {
    let mut request = String::with_capacity(line.len() + 1);
    request.push_str(line);
    request.push('\n');
    channel
        .send(request.as_bytes())
        .map_err(|e| DashboardError::from_channel(e, timeout))?;
    read_line(channel, timeout)
}

impl Drop for DashboardClient {
    fn drop(&mut self) {
        self.session.close();
    }
}

impl std::fmt::Debug for DashboardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardClient")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    fn reply_for(line: &str) -> String {
        match line {
            "robotmode" => "Robotmode: RUNNING".to_string(),
            "safetystatus" => "Safetystatus: PROTECTIVE_STOP".to_string(),
            "power on" => "Powering on".to_string(),
            "play" => "Failed to execute: play".to_string(),
            "mute" => String::new(),
            other => format!("echo: {}", other),
        }
    }

    /// 模拟 Dashboard 服务：发送横幅，逐行应答；`mute` 不应答
    fn spawn_dashboard_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let mut writer = stream.try_clone().unwrap();
                if writer
                    .write_all(b"Connected: Universal Robots Dashboard Server\r\n")
                    .is_err()
                {
                    continue;
                }
                for line in BufReader::new(stream).lines() {
                    let Ok(line) = line else { break };
                    let reply = reply_for(&line);
                    if reply.is_empty() {
                        continue;
                    }
                    if writer.write_all(format!("{}\n", reply).as_bytes()).is_err() {
                        break;
                    }
                }
            }
        });
        port
    }

    fn client_for(port: u16) -> DashboardClient {
        DashboardClient::new(DashboardConfig {
            host: "127.0.0.1".to_string(),
            port,
            channel: ChannelConfig::with_timeout(Duration::from_millis(200)),
            reply_timeout: Duration::from_millis(300),
            reconnect: ReconnectPolicy::new(2, Duration::ZERO),
        })
    }

    #[test]
    fn test_text_command_round_trip() {
        let mut client = client_for(spawn_dashboard_server());
        client.connect().unwrap();
        assert!(client.is_connected());
        assert_eq!(
            client.send_text_command("load jog.urp").unwrap(),
            "echo: load jog.urp"
        );
    }

    #[test]
    fn test_typed_helpers() {
        let mut client = client_for(spawn_dashboard_server());
        assert_eq!(client.power_on().unwrap(), "Powering on");
        assert_eq!(client.robot_mode().unwrap(), RobotMode::Running);
        assert_eq!(client.safety_status().unwrap(), SafetyMode::ProtectiveStop);
    }

    #[test]
    fn test_failure_reply_is_rejected() {
        let mut client = client_for(spawn_dashboard_server());
        match client.play().unwrap_err() {
            DashboardError::Rejected { command, reply } => {
                assert_eq!(command, "play");
                assert_eq!(reply, "Failed to execute: play");
            },
            other => panic!("Expected Rejected, got {:?}", other),
        }
        // 失败应答不影响连接
        assert!(client.is_connected());
    }

    #[test]
    fn test_invalid_lines_are_not_sent() {
        let mut client = client_for(spawn_dashboard_server());
        assert!(matches!(
            client.send_text_command("play\nstop").unwrap_err(),
            DashboardError::InvalidCommand(_)
        ));
        assert!(matches!(
            client.send_text_command("").unwrap_err(),
            DashboardError::InvalidCommand(_)
        ));
        assert!(!client.is_connected());
    }

    #[test]
    fn test_timeout_drops_connection_and_next_call_reconnects() {
        let mut client = client_for(spawn_dashboard_server());
        assert!(matches!(
            client.send_text_command("mute").unwrap_err(),
            DashboardError::Timeout(_)
        ));
        assert!(!client.is_connected());
        assert_eq!(client.send_text_command("ping").unwrap(), "echo: ping");
    }

    #[test]
    fn test_reconnect_and_disconnect() {
        let mut client = client_for(spawn_dashboard_server());
        client.reconnect().unwrap();
        assert!(client.is_connected());
        client.disconnect();
        client.disconnect();
        assert!(!client.is_connected());
    }
}
