//! Dashboard 命令
//!
//! 把剩余参数拼成一行指令发送给 Dashboard 服务，例如 `ur-cli dashboard brake release`。

use crate::config::CliConfig;
use anyhow::Result;
use clap::Args;
use ur_sdk::DashboardClient;

#[derive(Args, Debug)]
pub struct DashboardArgs {
    /// 指令文本（多个单词以空格连接）
    #[arg(required = true, num_args = 1..)]
    pub words: Vec<String>,
}

impl DashboardArgs {
    pub fn line(&self) -> String {
        self.words.join(" ")
    }

    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let mut client = DashboardClient::new(config.dashboard_config());
        let reply = client.send_text_command(&self.line())?;
        println!("{}", reply);
        client.disconnect();
        Ok(())
    }
}
