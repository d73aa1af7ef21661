//! 连接统计
//!
//! 消息频率使用瞬时频率的指数移动平均（EMA）：
//!
//! ```text
//! f = α · (1 / Δt) + (1 − α) · f
//! ```
//!
//! 间隔使用单调时钟（`Instant`），`last_message_time` 使用墙钟（`SystemTime`）。

use std::time::{Duration, Instant, SystemTime};

/// 默认平滑系数
pub const DEFAULT_SMOOTHING: f64 = 0.1;

/// 连接统计快照
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionStatistics {
    /// 收到的消息总数（含未识别类型）
    pub messages_received: u64,
    /// 最后一条消息的墙钟时间
    pub last_message_time: Option<SystemTime>,
    /// 消息频率（Hz）
    pub message_frequency: f64,
}

impl ConnectionStatistics {
    /// 距最后一条消息的时间
    pub fn time_since_last_message(&self) -> Option<Duration> {
        self.last_message_time
            .and_then(|t| SystemTime::now().duration_since(t).ok())
    }
}

/// 消息频率估计器（接收线程独占）
#[derive(Debug, Clone)]
pub struct FrequencyEstimator {
    alpha: f64,
    last: Option<Instant>,
    frequency: f64,
    seeded: bool,
}

impl FrequencyEstimator {
    /// `alpha` 不在 (0, 1] 内时使用默认值
    pub fn new(alpha: f64) -> Self {
        let alpha = if alpha.is_finite() && alpha > 0.0 && alpha <= 1.0 {
            alpha
        } else {
            DEFAULT_SMOOTHING
        };
        Self {
            alpha,
            last: None,
            frequency: 0.0,
            seeded: false,
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// 记录一条消息，返回当前频率估计
    ///
    /// 第一条消息只建立基准；间隔为零时忽略本次采样（基准不变）。
    /// 第一个有效采样直接作为初值，之后按 EMA 平滑。
    ///
    /// 与从 0 Hz 起步的 EMA 不同：从 0 起步时，α = 0.1 需要约 30 个采样
    /// 才能接近真实频率；这里第二条消息之后即为 `1/Δt`。两者的稳态相同。
    pub fn record(&mut self, now: Instant) -> f64 {
        let Some(last) = self.last else {
            self.last = Some(now);
            return self.frequency;
        };

        let interval = now.saturating_duration_since(last);
        if interval.is_zero() {
            return self.frequency;
        }
        self.last = Some(now);

        let instant = 1.0 / interval.as_secs_f64();
        if self.seeded {
            self.frequency = self.alpha * instant + (1.0 - self.alpha) * self.frequency;
        } else {
            self.frequency = instant;
            self.seeded = true;
        }
        self.frequency
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }
}

impl Default for FrequencyEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_message_is_baseline_only() {
        let mut est = FrequencyEstimator::default();
        assert_eq!(est.record(Instant::now()), 0.0);
    }

    #[test]
    fn test_zero_interval_ignored() {
        let mut est = FrequencyEstimator::default();
        let t0 = Instant::now();
        est.record(t0);
        assert_eq!(est.record(t0), 0.0);
        let f = est.record(t0 + Duration::from_millis(10));
        assert!((f - 100.0).abs() < 1e-6, "f = {}", f);
    }

    #[test]
    fn test_converges_to_constant_rate() {
        let mut est = FrequencyEstimator::new(0.1);
        let t0 = Instant::now();
        let dt = Duration::from_millis(8); // 125 Hz
        est.record(t0);
        // 先以 50 Hz 运行一段时间，再切换到 125 Hz
        let mut t = t0;
        for _ in 0..10 {
            t += Duration::from_millis(20);
            est.record(t);
        }
        assert!((est.frequency() - 50.0).abs() < 1e-6);
        for _ in 0..200 {
            t += dt;
            est.record(t);
        }
        assert!((est.frequency() - 125.0).abs() < 0.01, "f = {}", est.frequency());
    }

    #[test]
    fn test_ema_step() {
        let mut est = FrequencyEstimator::new(0.1);
        let t0 = Instant::now();
        est.record(t0);
        est.record(t0 + Duration::from_millis(10)); // 100 Hz
        let f = est.record(t0 + Duration::from_millis(30)); // 瞬时 50 Hz
        assert!((f - 95.0).abs() < 1e-6, "f = {}", f);
    }

    #[test]
    fn test_invalid_alpha_falls_back() {
        assert_eq!(FrequencyEstimator::new(0.0).alpha(), DEFAULT_SMOOTHING);
        assert_eq!(FrequencyEstimator::new(f64::NAN).alpha(), DEFAULT_SMOOTHING);
        assert_eq!(FrequencyEstimator::new(1.0).alpha(), 1.0);
    }

    #[test]
    fn test_time_since_last_message() {
        let stats = ConnectionStatistics::default();
        assert!(stats.time_since_last_message().is_none());
        let stats = ConnectionStatistics {
            last_message_time: Some(SystemTime::now() - Duration::from_secs(1)),
            ..Default::default()
        };
        assert!(stats.time_since_last_message().unwrap() >= Duration::from_secs(1));
    }
}
