//! 命令定义和实现

pub mod config;
pub mod dashboard;
pub mod jog;
pub mod monitor;
pub mod stop;

pub use config::ConfigCommand;
pub use dashboard::DashboardArgs;
pub use jog::JogArgs;
pub use monitor::MonitorCommand;
pub use stop::StopCommand;
