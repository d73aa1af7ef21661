//! # UR CLI
//!
//! Command-line interface for Universal Robots UR10 controllers.
//!
//! ```bash
//! # 写入默认配置（~/.config/ur10/config.toml）
//! ur-cli config init
//!
//! # 监控实时状态
//! ur-cli --host 192.168.1.100 monitor --rate 5
//!
//! # Dashboard 指令
//! ur-cli dashboard power on
//! ur-cli dashboard brake release
//!
//! # 点动与停止
//! ur-cli jog --space cartesian --axis 2 --speed 0.05
//! ur-cli stop
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{ConfigCommand, DashboardArgs, JogArgs, MonitorCommand, StopCommand};
use config::CliConfig;

/// UR CLI - UR10 命令行工具
#[derive(Parser, Debug)]
#[command(name = "ur-cli")]
#[command(about = "Command-line interface for Universal Robots UR10 controllers", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径（默认 ~/.config/ur10/config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 控制器地址（覆盖配置文件）
    #[arg(long, global = true)]
    host: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 监控实时状态
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },

    /// 发送 Dashboard 指令
    Dashboard {
        #[command(flatten)]
        args: DashboardArgs,
    },

    /// 点动
    Jog {
        #[command(flatten)]
        args: JogArgs,
    },

    /// 停止运动
    Stop {
        #[command(flatten)]
        args: StopCommand,
    },

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ur_cli=info,ur_driver=warn,ur_client=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();

    let path = match cli.config {
        Some(path) => path,
        None => config::default_path()?,
    };
    let mut config = CliConfig::load(&path)?;
    if let Some(host) = cli.host {
        config.robot.host = host;
    }
    tracing::debug!("Using config {:?}", config);

    match cli.command {
        Commands::Monitor { args } => args.execute(&config),
        Commands::Dashboard { args } => args.execute(&config),
        Commands::Jog { args } => args.execute(&config),
        Commands::Stop { args } => args.execute(&config),
        Commands::Config(cmd) => cmd.execute(&path, &config),
    }
}
