//! 接收器性能指标
//!
//! 原子计数器，接收线程写入，任意线程读取快照。

use std::sync::atomic::{AtomicU64, Ordering};

/// 接收器指标（原子计数器）
#[derive(Debug, Default)]
pub struct ReceiverMetrics {
    /// 读取到的帧头总数（含被拒绝的帧）
    pub frames_total: AtomicU64,
    /// 成功解码的消息数（含未识别类型）
    pub frames_decoded: AtomicU64,
    /// 解码失败次数（过短帧、空载荷）
    pub decode_errors: AtomicU64,
    /// 超长帧次数
    pub oversized_frames: AtomicU64,
    /// 观察者回调 panic 次数
    pub observer_panics: AtomicU64,
    /// 连接尝试次数
    pub connect_attempts: AtomicU64,
    /// 连接失败次数
    pub connect_failures: AtomicU64,
}

impl ReceiverMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_total: self.frames_total.load(Ordering::Relaxed),
            frames_decoded: self.frames_decoded.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            oversized_frames: self.oversized_frames.load(Ordering::Relaxed),
            observer_panics: self.observer_panics.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricsSnapshot {
    pub frames_total: u64,
    pub frames_decoded: u64,
    pub decode_errors: u64,
    pub oversized_frames: u64,
    pub observer_panics: u64,
    pub connect_attempts: u64,
    pub connect_failures: u64,
}

impl MetricsSnapshot {
    /// 连接质量百分比：解码成功帧 / 收到帧，未收到任何帧时为 100
    pub fn connection_quality(&self) -> u8 {
        if self.frames_total == 0 {
            return 100;
        }
        let ratio = self.frames_decoded.saturating_mul(100) / self.frames_total;
        ratio.min(100) as u8
    }
}
