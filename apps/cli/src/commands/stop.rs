//! 停止命令
//!
//! 在主接口上发送 `stopj` / `stopl`，减速停止当前运动。

use super::jog::SpaceArg;
use crate::config::CliConfig;
use anyhow::Result;
use clap::Args;
use ur_sdk::CommandClient;
use ur_sdk::client::DEFAULT_STOP_DECELERATION;

/// 停止命令参数
#[derive(Args, Debug)]
pub struct StopCommand {
    /// 停止空间（joint 发送 stopj，cartesian 发送 stopl）
    #[arg(long, value_enum, default_value_t = SpaceArg::Joint)]
    pub space: SpaceArg,

    /// 减速度
    #[arg(long, default_value_t = DEFAULT_STOP_DECELERATION)]
    pub deceleration: f64,
}

impl StopCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let mut client = CommandClient::new(config.command_config());
        println!("🛑 Stopping motion...");
        client.stop_jog(self.space.into(), self.deceleration)?;
        println!("✅ Stop sent");
        Ok(())
    }
}
