//! 点动命令

use crate::config::CliConfig;
use anyhow::Result;
use clap::{Args, ValueEnum};
use ur_sdk::CommandClient;
use ur_sdk::protocol::{JogCommand, JogMotion, JogSpace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SpaceArg {
    Cartesian,
    Joint,
}

impl From<SpaceArg> for JogSpace {
    fn from(space: SpaceArg) -> Self {
        match space {
            SpaceArg::Cartesian => JogSpace::Cartesian,
            SpaceArg::Joint => JogSpace::Joint,
        }
    }
}

/// 点动命令参数
#[derive(Args, Debug)]
pub struct JogArgs {
    /// 点动空间
    #[arg(long, value_enum, default_value_t = SpaceArg::Joint)]
    pub space: SpaceArg,

    /// 轴索引（笛卡尔 0..6 = X Y Z Rx Ry Rz，关节 0..6 = J1..J6）
    #[arg(long)]
    pub axis: usize,

    /// 速度（带符号，m/s 或 rad/s）
    #[arg(long, allow_hyphen_values = true)]
    pub speed: f64,

    /// 步进距离（带符号）；指定后改为步进点动
    #[arg(long, allow_hyphen_values = true)]
    pub step: Option<f64>,

    /// 速度点动持续时间（秒）
    #[arg(long, default_value_t = 0.2)]
    pub duration: f64,

    /// 加速度
    #[arg(long, default_value_t = 0.5)]
    pub acceleration: f64,
}

impl JogArgs {
    pub fn to_command(&self) -> JogCommand {
        let motion = match self.step {
            Some(distance) => JogMotion::Step {
                distance,
                speed: self.speed.abs(),
                acceleration: self.acceleration,
            },
            None => JogMotion::Velocity {
                speed: self.speed,
                acceleration: self.acceleration,
                duration: self.duration,
            },
        };
        JogCommand {
            space: self.space.into(),
            axis: self.axis,
            motion,
        }
    }

    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let command = self.to_command();
        command.validate()?;

        let mut client = CommandClient::new(config.command_config());
        let ack = client.send_jog_command(&command)?;
        println!(
            "✅ Sent {:?} jog on axis {} (ack type {}, {} bytes)",
            command.space, command.axis, ack.message_type, ack.frame_len
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(step: Option<f64>) -> JogArgs {
        JogArgs {
            space: SpaceArg::Cartesian,
            axis: 2,
            speed: -0.05,
            step,
            duration: 0.2,
            acceleration: 0.5,
        }
    }

    #[test]
    fn test_velocity_jog() {
        let command = args(None).to_command();
        assert_eq!(command.space, JogSpace::Cartesian);
        assert_eq!(
            command.motion,
            JogMotion::Velocity {
                speed: -0.05,
                acceleration: 0.5,
                duration: 0.2
            }
        );
    }

    #[test]
    fn test_step_jog_uses_absolute_speed() {
        let command = args(Some(-0.01)).to_command();
        assert_eq!(
            command.motion,
            JogMotion::Step {
                distance: -0.01,
                speed: 0.05,
                acceleration: 0.5
            }
        );
        assert!(command.validate().is_ok());
    }
}
