//! 实时接收器
//!
//! 提供对外的 `RealtimeReceiver`，封装接收线程和状态同步细节。

use crate::config::{PipelineConfig, ReceiverConfig};
use crate::error::ReceiverError;
use crate::link::LinkState;
use crate::metrics::MetricsSnapshot;
use crate::observers::ObserverToken;
use crate::pipeline::rx_loop;
use crate::state::{PositionSnapshot, ReceiverContext, RobotState, SafetySnapshot};
use crate::stats::ConnectionStatistics;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use ur_net::{ChannelCloser, FramedChannel, StopSignal};
use ur_protocol::{RobotMode, SafetyMode, Vector6};

/// 接收线程名称
pub const RX_THREAD_NAME: &str = "ur-rt-rx";

/// 带超时的线程 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        let (tx, rx) = crossbeam_channel::bounded(1);

        // 看门狗线程负责 join，超时后它继续运行直到目标线程退出
        thread::spawn(move || {
            let _ = tx.send(self.join().map(|_| ()));
        });

        match rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::TimedOut, "Thread join timeout"),
            )),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(Box::new(
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, "Join watchdog exited"),
            )),
        }
    }
}

/// 一次连接会话（线程 + 停止信号 + 关闭句柄）
struct Session {
    thread: JoinHandle<()>,
    stop: StopSignal,
    closer: ChannelCloser,
}

/// UR 实时接口接收器
///
/// 所有方法都接受 `&self`，可以放进 `Arc` 在多个线程间共享。
/// 状态只由接收线程写入，查询方法返回快照副本。
///
/// # 示例
///
/// ```rust,no_run
/// use ur_driver::ReceiverBuilder;
///
/// let receiver = ReceiverBuilder::new("192.168.1.100").build();
/// receiver.add_position_observer(|pos| println!("TCP: {:?}", pos.tcp_pose));
/// receiver.connect()?;
/// std::thread::sleep(std::time::Duration::from_secs(1));
/// println!("{:.1} Hz", receiver.get_message_frequency());
/// receiver.disconnect();
/// # Ok::<(), ur_driver::ReceiverError>(())
/// ```
pub struct RealtimeReceiver {
    config: ReceiverConfig,
    ctx: Arc<ReceiverContext>,
    session: Mutex<Option<Session>>,
}

impl RealtimeReceiver {
    pub fn new(config: ReceiverConfig) -> Self {
        Self {
            config,
            ctx: Arc::new(ReceiverContext::new()),
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    /// 共享上下文（高级用法：直接读取 `ArcSwap` 快照）
    pub fn context(&self) -> &Arc<ReceiverContext> {
        &self.ctx
    }

    // ========================================================================
    // 连接管理
    // ========================================================================

    /// 建立连接并启动接收线程
    ///
    /// 不等待首条遥测即返回。已连接时直接返回成功。
    ///
    /// # 错误
    /// - `ReceiverError::Connect`: 连接失败，状态保持 `Disconnected`
    /// - `ReceiverError::ThreadSpawn`: 线程创建失败
    pub fn connect(&self) -> Result<(), ReceiverError> {
        let mut session = self.session.lock();

        if session.is_some() {
            if self.ctx.link.get().is_connected() {
                debug!("Real-time receiver already connected");
                return Ok(());
            }
            // 接收线程已因连接丢失退出，先回收旧会话
            if let Some(stale) = session.take() {
                self.shutdown_session(stale);
            }
        }

        self.ctx.link.set(LinkState::Connecting);
        self.ctx.metrics.connect_attempts.fetch_add(1, Ordering::Relaxed);

        let channel = match FramedChannel::connect(&self.config.host, self.config.port, &self.config.channel) {
            Ok(channel) => channel,
            Err(e) => {
                self.ctx.metrics.connect_failures.fetch_add(1, Ordering::Relaxed);
                self.ctx.link.set(LinkState::Disconnected);
                error!(
                    "Failed to connect to real-time interface at {}:{}: {}",
                    self.config.host, self.config.port, e
                );
                return Err(e.into());
            },
        };

        let stop = StopSignal::new();
        let channel = channel.with_stop_signal(stop.clone());
        let closer = channel.closer();

        // 先置为 Connected，接收线程如果立即失败会覆盖为 Disconnected
        self.ctx.link.set(LinkState::Connected);

        let ctx = self.ctx.clone();
        let pipeline_config = PipelineConfig::from(&self.config);
        let loop_stop = stop.clone();
        let spawned = thread::Builder::new()
            .name(RX_THREAD_NAME.to_string())
            .spawn(move || rx_loop(channel, ctx, pipeline_config, loop_stop));

        let thread = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                closer.close();
                self.ctx.link.set(LinkState::Disconnected);
                error!("Failed to spawn real-time receive thread: {}", e);
                return Err(ReceiverError::ThreadSpawn(e));
            },
        };

        info!(
            "Connected to UR real-time interface at {}:{}",
            self.config.host, self.config.port
        );
        *session = Some(Session {
            thread,
            stop,
            closer,
        });
        Ok(())
    }

    /// 停止接收线程并关闭连接
    ///
    /// 幂等，可在 `connect()` 之前调用。
    pub fn disconnect(&self) {
        let stale = self.session.lock().take();
        match stale {
            Some(session) => {
                self.shutdown_session(session);
                info!("Disconnected from UR real-time interface");
            },
            None => debug!("Real-time receiver not connected, nothing to disconnect"),
        }
        self.ctx.link.set(LinkState::Disconnected);
    }

    /// 断开后按重试策略重新连接
    ///
    /// # 错误
    /// - `ReceiverError::ReconnectExhausted`: 全部尝试失败，状态为 `Disconnected`
    pub fn reconnect(&self) -> Result<(), ReceiverError> {
        self.disconnect();
        let policy = self.config.reconnect;
        info!(
            "Reconnecting to real-time interface ({} attempt(s), {:?} apart)",
            policy.attempts.max(1),
            policy.delay
        );
        policy.run(|_| self.connect()).map_err(|e| {
            self.ctx.link.set(LinkState::Disconnected);
            ReceiverError::ReconnectExhausted {
                attempts: e.attempts,
                last_error: Box::new(e.last_error),
            }
        })
    }

    /// 停止信号 → 有界 join → 关闭通道
    fn shutdown_session(&self, session: Session) {
        session.stop.raise();
        let join_timeout = self.config.join_timeout;
        if let Err(_e) = session.thread.join_timeout(join_timeout) {
            warn!(
                "Real-time receive thread panicked or failed to stop within {:?}",
                join_timeout
            );
        }
        session.closer.close();
    }

    pub fn is_connected(&self) -> bool {
        self.ctx.link.get().is_connected()
    }

    pub fn link_state(&self) -> LinkState {
        self.ctx.link.get()
    }

    // ========================================================================
    // 观察者
    // ========================================================================

    /// 注册完整状态观察者（在接收线程中同步调用）
    pub fn add_state_observer<F>(&self, observer: F) -> ObserverToken
    where
        F: Fn(&RobotState) + Send + Sync + 'static,
    {
        self.ctx.observers.add_state_observer(observer)
    }

    /// 注册位置观察者
    pub fn add_position_observer<F>(&self, observer: F) -> ObserverToken
    where
        F: Fn(&PositionSnapshot) + Send + Sync + 'static,
    {
        self.ctx.observers.add_position_observer(observer)
    }

    /// 注册安全观察者
    pub fn add_safety_observer<F>(&self, observer: F) -> ObserverToken
    where
        F: Fn(&SafetySnapshot) + Send + Sync + 'static,
    {
        self.ctx.observers.add_safety_observer(observer)
    }

    /// 注销观察者，返回是否找到
    pub fn remove_observer(&self, token: ObserverToken) -> bool {
        self.ctx.observers.remove(token)
    }

    // ========================================================================
    // 查询
    // ========================================================================

    /// 完整状态副本
    pub fn get_robot_state(&self) -> RobotState {
        (*self.ctx.snapshot()).clone()
    }

    pub fn get_tcp_pose(&self) -> Vector6 {
        self.ctx.robot_state.load().tcp_pose
    }

    pub fn get_joint_angles(&self) -> Vector6 {
        self.ctx.robot_state.load().joint_angles
    }

    pub fn get_tcp_speed(&self) -> Vector6 {
        self.ctx.robot_state.load().tcp_speed
    }

    pub fn get_joint_speeds(&self) -> Vector6 {
        self.ctx.robot_state.load().joint_speeds
    }

    pub fn is_emergency_stopped(&self) -> bool {
        self.ctx.robot_state.load().emergency_stopped
    }

    pub fn is_protective_stopped(&self) -> bool {
        self.ctx.robot_state.load().protective_stopped
    }

    pub fn is_program_running(&self) -> bool {
        self.ctx.robot_state.load().program_running
    }

    pub fn get_robot_mode(&self) -> RobotMode {
        self.ctx.robot_state.load().robot_mode_kind()
    }

    pub fn get_safety_mode(&self) -> SafetyMode {
        self.ctx.robot_state.load().safety_mode_kind()
    }

    pub fn get_speed_scaling(&self) -> f64 {
        self.ctx.robot_state.load().speed_scaling
    }

    pub fn get_message_frequency(&self) -> f64 {
        self.ctx.statistics.load().message_frequency
    }

    pub fn statistics(&self) -> ConnectionStatistics {
        **self.ctx.statistics.load()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    /// 距最后一条消息的时间，尚未收到消息时为 `None`
    pub fn time_since_last_message(&self) -> Option<Duration> {
        self.statistics().time_since_last_message()
    }
}

impl Drop for RealtimeReceiver {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            self.shutdown_session(session);
        }
    }
}

impl std::fmt::Debug for RealtimeReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeReceiver")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("link", &self.ctx.link.get())
            .finish()
    }
}
