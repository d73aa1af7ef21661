//! 接收循环
//!
//! 每次迭代：
//! 1. 检查停止信号
//! 2. 读取 4 字节帧头并校验
//! 3. 读取载荷并解码
//! 4. 合并到工作副本，更新统计
//! 5. 发布快照，按到达顺序同步通知观察者
//!
//! 单帧解码失败只记录并计数，循环继续；通道致命错误结束循环。

use crate::config::PipelineConfig;
use crate::link::LinkState;
use crate::state::{ReceiverContext, RobotState};
use crate::stats::FrequencyEstimator;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Instant, SystemTime};
use tracing::{debug, error, trace, warn};
use ur_net::{ChannelError, RxChannel, StopSignal};
use ur_protocol::{DecodeError, FRAME_HEADER_LEN, FrameHeader, TelemetryMessage, decode_payload};

/// 将一条消息合并到状态
///
/// 未识别的消息类型不修改任何字段（时间戳由调用方刷新）。
pub fn apply_message(state: &mut RobotState, message: &TelemetryMessage) {
    match message {
        TelemetryMessage::RobotState(msg) => state.apply_robot_state(msg),
        TelemetryMessage::Safety(msg) => state.apply_safety(msg),
        TelemetryMessage::Unrecognized { .. } => {},
    }
}

/// 接收线程主循环
///
/// # 参数
/// - `rx`: 字节源（真实通道或 mock）
/// - `ctx`: 共享上下文（状态快照、统计、观察者、指标）
/// - `config`: 帧长度上限、偏移表、平滑系数
/// - `stop`: 停止信号
pub fn rx_loop(
    mut rx: impl RxChannel,
    ctx: Arc<ReceiverContext>,
    config: PipelineConfig,
    stop: StopSignal,
) {
    let metrics = &ctx.metrics;
    let mut working = (*ctx.snapshot()).clone();
    let mut statistics = **ctx.statistics.load();
    let mut estimator = FrequencyEstimator::new(config.smoothing);

    loop {
        if stop.is_raised() {
            trace!("RX thread: stop signal raised, exiting");
            break;
        }

        // ============================================================
        // 1. 帧头
        // ============================================================
        let header_bytes = match rx.receive_exact(FRAME_HEADER_LEN) {
            Ok(bytes) => bytes,
            Err(e) => {
                handle_channel_error(&ctx, e, "header");
                break;
            },
        };
        metrics.frames_total.fetch_add(1, Ordering::Relaxed);

        let header = match FrameHeader::parse_slice(&header_bytes, config.max_frame_len) {
            Ok(header) => header,
            Err(e @ DecodeError::Oversized { .. }) => {
                // 不读取声明的长度，直接读取下一个帧头
                metrics.oversized_frames.fetch_add(1, Ordering::Relaxed);
                warn!("RX thread: {}, skipping", e);
                continue;
            },
            Err(e) => {
                metrics.decode_errors.fetch_add(1, Ordering::Relaxed);
                debug!("RX thread: {}, skipping", e);
                continue;
            },
        };

        // ============================================================
        // 2. 载荷
        // ============================================================
        let payload = match rx.receive_exact(header.payload_len()) {
            Ok(bytes) => bytes,
            Err(e) => {
                handle_channel_error(&ctx, e, "payload");
                break;
            },
        };

        let message = match decode_payload(&payload, &config.layout) {
            Ok(message) => message,
            Err(e) => {
                metrics.decode_errors.fetch_add(1, Ordering::Relaxed);
                debug!("RX thread: failed to decode payload: {}", e);
                continue;
            },
        };
        metrics.frames_decoded.fetch_add(1, Ordering::Relaxed);

        if !message.skipped().is_empty() {
            trace!(
                "RX thread: type {} frame ({} bytes) skipped fields {:?}",
                message.message_type(),
                header.length,
                message.skipped()
            );
        } else {
            trace!(
                "RX thread: type {} frame ({} bytes)",
                message.message_type(),
                header.length
            );
        }

        // ============================================================
        // 3. 合并状态与统计
        // ============================================================
        apply_message(&mut working, &message);

        let now = SystemTime::now();
        working.timestamp = now;
        working.connection_quality = metrics.snapshot().connection_quality();

        statistics.messages_received += 1;
        statistics.last_message_time = Some(now);
        statistics.message_frequency = estimator.record(Instant::now());

        // ============================================================
        // 4. 发布快照并通知
        // ============================================================
        ctx.statistics.store(Arc::new(statistics));
        ctx.robot_state.store(Arc::new(working.clone()));
        ctx.observers.notify(&working, metrics);
    }

    trace!("RX thread: loop exited");
}

fn handle_channel_error(ctx: &ReceiverContext, e: ChannelError, stage: &str) {
    match e {
        ChannelError::Cancelled => {
            debug!("RX thread: receive cancelled while reading {}", stage);
        },
        e => {
            error!("RX thread: connection lost while reading {}: {}", stage, e);
            // 只从 Connected 降级，不覆盖其他状态
            if !ctx.link.transition(LinkState::Connected, LinkState::Disconnected) {
                debug!("RX thread: link already {}, state left unchanged", ctx.link.get());
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Bytes, BytesMut};
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU64;
    use ur_protocol::{RobotStateFeedback, TelemetryLayout, encode_frame, write_f64_array_be};

    /// 内存字节源：数据耗尽后返回 `end` 指定的错误
    struct MockRx {
        data: BytesMut,
        end: fn() -> ChannelError,
    }

    impl MockRx {
        fn new(chunks: &[Vec<u8>]) -> Self {
            let mut data = BytesMut::new();
            for chunk in chunks {
                data.extend_from_slice(chunk);
            }
            Self {
                data,
                end: || ChannelError::Closed,
            }
        }

        fn ending_with(mut self, end: fn() -> ChannelError) -> Self {
            self.end = end;
            self
        }
    }

    impl RxChannel for MockRx {
        fn receive_exact(&mut self, n: usize) -> Result<Bytes, ChannelError> {
            if self.data.len() >= n {
                Ok(self.data.split_to(n).freeze())
            } else {
                self.data.clear();
                Err((self.end)())
            }
        }
    }

    fn tcp_pose_frame(pose: [f64; 6]) -> Vec<u8> {
        let mut payload = vec![0u8; 1060];
        payload[0] = 16;
        write_f64_array_be(&mut payload, 445, &pose).unwrap();
        encode_frame(&payload)
    }

    fn run(rx: MockRx, ctx: &Arc<ReceiverContext>) {
        ctx.link.set(LinkState::Connected);
        rx_loop(rx, ctx.clone(), PipelineConfig::default(), StopSignal::new());
    }

    #[test]
    fn test_rx_loop_decodes_1064_byte_frame() {
        let ctx = Arc::new(ReceiverContext::new());
        let frame = tcp_pose_frame([0.1, 0.2, 0.3, 0.0, 0.0, 0.0]);
        assert_eq!(frame.len(), 1064);

        run(MockRx::new(&[frame]), &ctx);

        let state = ctx.snapshot();
        assert_eq!(state.tcp_pose, [0.1, 0.2, 0.3, 0.0, 0.0, 0.0]);
        assert!(state.timestamp > SystemTime::UNIX_EPOCH);
        assert_eq!(ctx.statistics.load().messages_received, 1);
        // 对端关闭后链路为 Disconnected
        assert_eq!(ctx.link.get(), LinkState::Disconnected);
    }

    #[test]
    fn test_rx_loop_skips_oversized_header_without_reading_body() {
        let ctx = Arc::new(ReceiverContext::new());
        let oversized = 20_000u32.to_be_bytes().to_vec();
        let frame = tcp_pose_frame([1.0; 6]);

        run(MockRx::new(&[oversized, frame]), &ctx);

        let metrics = ctx.metrics.snapshot();
        assert_eq!(metrics.oversized_frames, 1);
        assert_eq!(metrics.frames_total, 2);
        assert_eq!(metrics.frames_decoded, 1);
        assert_eq!(ctx.snapshot().tcp_pose, [1.0; 6]);
        assert_eq!(ctx.snapshot().connection_quality, 50);
    }

    #[test]
    fn test_rx_loop_truncated_frame_disconnects() {
        let ctx = Arc::new(ReceiverContext::new());
        let mut frame = tcp_pose_frame([1.0; 6]);
        frame.truncate(600);

        run(MockRx::new(&[frame]), &ctx);

        assert_eq!(ctx.link.get(), LinkState::Disconnected);
        assert_eq!(ctx.metrics.snapshot().frames_decoded, 0);
        assert_eq!(ctx.snapshot().tcp_pose, [0.0; 6]);
    }

    #[test]
    fn test_rx_loop_cancelled_keeps_link_state() {
        let ctx = Arc::new(ReceiverContext::new());
        run(MockRx::new(&[]).ending_with(|| ChannelError::Cancelled), &ctx);
        // 停止由 disconnect() 负责更新状态
        assert_eq!(ctx.link.get(), LinkState::Connected);
    }

    #[test]
    fn test_rx_loop_fatal_error_only_downgrades_connected() {
        let ctx = Arc::new(ReceiverContext::new());
        ctx.link.set(LinkState::Connecting);
        rx_loop(
            MockRx::new(&[]),
            ctx.clone(),
            PipelineConfig::default(),
            StopSignal::new(),
        );
        assert_eq!(ctx.link.get(), LinkState::Connecting);
    }

    #[test]
    fn test_rx_loop_unrecognized_type_notifies() {
        let ctx = Arc::new(ReceiverContext::new());
        let hits = Arc::new(AtomicU64::new(0));
        let h = hits.clone();
        ctx.observers.add_state_observer(move |_| {
            h.fetch_add(1, Ordering::Relaxed);
        });

        run(MockRx::new(&[encode_frame(&[99, 1, 2, 3])]), &ctx);

        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert_eq!(ctx.statistics.load().messages_received, 1);
        assert!(ctx.snapshot().timestamp > SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_rx_loop_undersized_header_counts_decode_error() {
        let ctx = Arc::new(ReceiverContext::new());
        let undersized = 4u32.to_be_bytes().to_vec();
        run(MockRx::new(&[undersized, tcp_pose_frame([2.0; 6])]), &ctx);

        let metrics = ctx.metrics.snapshot();
        assert_eq!(metrics.decode_errors, 1);
        assert_eq!(metrics.frames_decoded, 1);
    }

    #[test]
    fn test_rx_loop_observers_see_arrival_order() {
        let ctx = Arc::new(ReceiverContext::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        ctx.observers
            .add_position_observer(move |snap| s.lock().push(snap.tcp_pose[0]));
        ctx.observers.add_state_observer(|_| panic!("bad observer"));

        let frames: Vec<Vec<u8>> = (0..5).map(|i| tcp_pose_frame([i as f64; 6])).collect();
        run(MockRx::new(&frames), &ctx);

        assert_eq!(*seen.lock(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(ctx.metrics.snapshot().observer_panics, 5);
    }

    #[test]
    fn test_rx_loop_merges_partial_messages() {
        let ctx = Arc::new(ReceiverContext::new());
        let layout = TelemetryLayout::default();
        let first = RobotStateFeedback {
            tcp_pose: Some([0.5; 6]),
            joint_angles: Some([0.25; 6]),
            ..Default::default()
        }
        .encode(&layout, 1060);
        // 截断到 400 字节：只携带 joint_angles
        let second = RobotStateFeedback {
            joint_angles: Some([0.75; 6]),
            ..Default::default()
        }
        .encode(&layout, 400);
        assert_eq!(second.len(), 400);

        run(
            MockRx::new(&[encode_frame(&first), encode_frame(&second)]),
            &ctx,
        );

        let state = ctx.snapshot();
        assert_eq!(state.joint_angles, [0.75; 6]);
        assert_eq!(state.tcp_pose, [0.5; 6]);
    }

    #[test]
    fn test_rx_loop_exits_when_stop_already_raised() {
        let ctx = Arc::new(ReceiverContext::new());
        let stop = StopSignal::new();
        stop.raise();
        rx_loop(
            MockRx::new(&[tcp_pose_frame([1.0; 6])]),
            ctx.clone(),
            PipelineConfig::default(),
            stop,
        );
        assert_eq!(ctx.metrics.snapshot().frames_total, 0);
    }
}
