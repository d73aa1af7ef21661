//! 监控命令
//!
//! 连接实时接口，按固定频率打印状态，直到 Ctrl+C 或达到指定时长。

use crate::config::CliConfig;
use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use ur_sdk::RobotState;
use ur_sdk::driver::{ConnectionStatistics, MetricsSnapshot};

/// 监控命令参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 刷新频率（Hz）
    #[arg(short, long, default_value_t = 10)]
    pub rate: u32,

    /// 运行时长（秒），不指定则运行到 Ctrl+C
    #[arg(short, long)]
    pub duration: Option<f64>,
}

impl MonitorCommand {
    pub fn execute(&self, config: &CliConfig) -> Result<()> {
        let receiver = config.receiver_builder().build();

        println!(
            "⏳ Connecting to {}:{} ...",
            config.robot.host, config.robot.realtime_port
        );
        receiver.connect().context("Failed to connect to real-time interface")?;
        println!("✅ Connected, press Ctrl+C to stop\n");

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))
            .context("Failed to install Ctrl+C handler")?;

        let interval = Duration::from_secs_f64(1.0 / f64::from(self.rate.max(1)));
        let deadline = self
            .duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| Instant::now() + Duration::from_secs_f64(d));

        while running.load(Ordering::SeqCst) {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                break;
            }
            if !receiver.is_connected() {
                println!("⚠️  Connection lost");
                break;
            }

            print_state(
                &receiver.get_robot_state(),
                &receiver.statistics(),
                &receiver.metrics(),
            );
            thread::sleep(interval);
        }

        receiver.disconnect();
        println!("✅ Monitor stopped");
        Ok(())
    }
}

fn fmt_vec(values: &[f64; 6]) -> String {
    let parts: Vec<String> = values.iter().map(|v| format!("{:+.4}", v)).collect();
    parts.join(" ")
}

fn print_state(state: &RobotState, stats: &ConnectionStatistics, metrics: &MetricsSnapshot) {
    println!(
        "[{:>6} msgs {:>6.1} Hz q={:>3}%] mode={} safety={}{}{}",
        stats.messages_received,
        stats.message_frequency,
        state.connection_quality,
        state.robot_mode_kind(),
        state.safety_mode_kind(),
        if state.emergency_stopped { " E-STOP" } else { "" },
        if state.protective_stopped { " P-STOP" } else { "" },
    );
    println!("  tcp   {}", fmt_vec(&state.tcp_pose));
    println!("  joint {}", fmt_vec(&state.joint_angles));
    if metrics.decode_errors > 0 || metrics.oversized_frames > 0 {
        println!(
            "  decode errors {} oversized {}",
            metrics.decode_errors, metrics.oversized_frames
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_vec() {
        assert_eq!(
            fmt_vec(&[0.1, -0.2, 0.0, 1.0, 0.0, 0.0]),
            "+0.1000 -0.2000 +0.0000 +1.0000 +0.0000 +0.0000"
        );
    }
}
