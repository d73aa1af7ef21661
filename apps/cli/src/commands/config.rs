//! 配置管理命令

use crate::config::CliConfig;
use anyhow::{Result, bail};
use clap::Subcommand;
use std::path::Path;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示当前生效的配置
    Show,

    /// 写入默认配置文件
    Init {
        /// 覆盖已有文件
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(&self, path: &Path, config: &CliConfig) -> Result<()> {
        match self {
            ConfigCommand::Show => {
                let state = if path.exists() { "" } else { " (not found, defaults)" };
                println!("# {}{}", path.display(), state);
                print!("{}", config.to_toml()?);
                Ok(())
            },
            ConfigCommand::Init { force } => {
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                CliConfig::default().save(path)?;
                println!("✅ Wrote {}", path.display());
                Ok(())
            },
        }
    }
}
