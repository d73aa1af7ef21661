//! TCP 通道
//!
//! 三个接口共用同一套收发逻辑：
//! - 实时接口：`receive_exact` 读取长度前缀帧，直到停止信号触发
//! - 主接口：`send` 发送 URScript，`receive_exact_within` 有界读取应答包
//! - Dashboard：`send` + `receive_line`

use crate::config::ChannelConfig;
use crate::error::{ChannelError, ConnectError};
use bytes::{Bytes, BytesMut};
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// 单次 `read` 的缓冲区大小
const READ_CHUNK: usize = 4096;

/// 协作式停止标志
///
/// 接收线程在每次读超时时检查，触发后当前读取返回 `ChannelError::Cancelled`。
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// 跨线程关闭句柄
///
/// `close()` 幂等：第一次调用设置关闭标志并双向 shutdown，
/// 正在阻塞的读取随即返回。
#[derive(Debug, Clone)]
pub struct ChannelCloser {
    stream: Arc<TcpStream>,
    closed: Arc<AtomicBool>,
}

impl ChannelCloser {
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => debug!("Channel shut down"),
            // 对端已断开
            Err(e) if e.kind() == ErrorKind::NotConnected => {},
            Err(e) => warn!("Failed to shut down channel: {}", e),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// 一条 TCP 连接
///
/// 读取到的多余字节保存在内部缓冲区中，供下一次读取使用。
#[derive(Debug)]
pub struct FramedChannel {
    stream: TcpStream,
    peer: SocketAddr,
    read_timeout: Duration,
    closer: ChannelCloser,
    stop: StopSignal,
    pending: BytesMut,
}

impl FramedChannel {
    /// 建立连接
    ///
    /// 依次尝试解析到的每个地址，全部失败时返回最后一个错误。
    ///
    /// # 错误
    /// - `ConnectError::Resolve` / `ConnectError::NoAddress`: 地址解析失败
    /// - `ConnectError::Unreachable`: 所有地址均无法连接
    /// - `ConnectError::Configure`: socket 选项设置失败
    pub fn connect(host: &str, port: u16, config: &ChannelConfig) -> Result<Self, ConnectError> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|source| ConnectError::Resolve {
                host: host.to_string(),
                source,
            })?
            .collect();

        let mut last_error = None;
        for addr in addrs {
            trace!("Connecting to {} (timeout {:?})", addr, config.connect_timeout);
            match TcpStream::connect_timeout(&addr, config.connect_timeout) {
                Ok(stream) => return Self::from_stream(stream, addr, config),
                Err(source) => {
                    debug!("Connect to {} failed: {}", addr, source);
                    last_error = Some(ConnectError::Unreachable { addr, source });
                },
            }
        }

        Err(last_error.unwrap_or_else(|| ConnectError::NoAddress {
            host: host.to_string(),
        }))
    }

    fn from_stream(
        stream: TcpStream,
        peer: SocketAddr,
        config: &ChannelConfig,
    ) -> Result<Self, ConnectError> {
        stream
            .set_read_timeout(Some(config.read_timeout))
            .map_err(ConnectError::Configure)?;
        stream
            .set_write_timeout(Some(config.write_timeout))
            .map_err(ConnectError::Configure)?;
        stream.set_nodelay(config.nodelay).map_err(ConnectError::Configure)?;

        let shutdown_handle = stream.try_clone().map_err(ConnectError::Configure)?;
        info!("Connected to {}", peer);

        Ok(Self {
            stream,
            peer,
            read_timeout: config.read_timeout,
            closer: ChannelCloser {
                stream: Arc::new(shutdown_handle),
                closed: Arc::new(AtomicBool::new(false)),
            },
            stop: StopSignal::new(),
            pending: BytesMut::with_capacity(READ_CHUNK),
        })
    }

    /// 替换停止信号（接收线程与控制方共享同一个信号）
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn closer(&self) -> ChannelCloser {
        self.closer.clone()
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_closed(&self) -> bool {
        self.closer.is_closed()
    }

    /// 关闭连接（幂等）
    pub fn close(&self) {
        self.closer.close();
    }

    /// 读取恰好 `n` 个字节
    ///
    /// 读超时不是错误：未触发停止信号时继续等待。
    pub fn receive_exact(&mut self, n: usize) -> Result<Bytes, ChannelError> {
        self.fill_exact(n, None)
    }

    /// 在 `timeout` 内读取恰好 `n` 个字节
    ///
    /// # 错误
    /// - `ChannelError::TimedOut`: 超时（已读取的字节保留在缓冲区中）
    pub fn receive_exact_within(&mut self, n: usize, timeout: Duration) -> Result<Bytes, ChannelError> {
        let result = self.fill_exact(n, Some(Instant::now() + timeout));
        self.restore_read_timeout();
        result
    }

    /// 在 `timeout` 内读取一行（`\n` 结尾）
    ///
    /// 返回内容不含换行符，末尾的 `\r` 会被去掉。
    ///
    /// # 错误
    /// - `ChannelError::LineTooLong`: 超过 `max_len` 字节仍未遇到换行
    /// - `ChannelError::TimedOut`: 超时
    pub fn receive_line(&mut self, max_len: usize, timeout: Duration) -> Result<Bytes, ChannelError> {
        let result = self.fill_line(max_len, Instant::now() + timeout);
        self.restore_read_timeout();
        result
    }

    /// 发送全部字节并 flush
    pub fn send(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        if self.closer.is_closed() {
            return Err(ChannelError::Cancelled);
        }
        let result = self.stream.write_all(bytes).and_then(|()| self.stream.flush());
        match result {
            Ok(()) => {
                trace!("Sent {} bytes to {}", bytes.len(), self.peer);
                Ok(())
            },
            Err(e) if matches!(e.kind(), ErrorKind::BrokenPipe | ErrorKind::ConnectionReset) => {
                Err(ChannelError::Closed)
            },
            Err(e) => Err(ChannelError::Io(e)),
        }
    }

    fn fill_exact(&mut self, n: usize, deadline: Option<Instant>) -> Result<Bytes, ChannelError> {
        while self.pending.len() < n {
            self.read_some(deadline)?;
        }
        Ok(self.pending.split_to(n).freeze())
    }

    fn fill_line(&mut self, max_len: usize, deadline: Instant) -> Result<Bytes, ChannelError> {
        let mut scanned = 0;
        loop {
            if let Some(pos) = self.pending[scanned..].iter().position(|&b| b == b'\n') {
                let end = scanned + pos;
                if end > max_len {
                    return Err(ChannelError::LineTooLong { limit: max_len });
                }
                let mut line = self.pending.split_to(end + 1);
                line.truncate(end);
                if line.last() == Some(&b'\r') {
                    line.truncate(end - 1);
                }
                return Ok(line.freeze());
            }
            scanned = self.pending.len();
            if scanned > max_len {
                return Err(ChannelError::LineTooLong { limit: max_len });
            }
            self.read_some(Some(deadline))?;
        }
    }

    /// 本地主动终止（关闭或停止信号）
    fn interrupted(&self) -> bool {
        self.closer.is_closed() || self.stop.is_raised()
    }

    /// 至少读取 1 个字节到内部缓冲区
    fn read_some(&mut self, deadline: Option<Instant>) -> Result<usize, ChannelError> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if self.closer.is_closed() {
                return Err(ChannelError::Cancelled);
            }
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(ChannelError::TimedOut);
                }
                self.stream.set_read_timeout(Some(remaining.min(self.read_timeout)))?;
            }

            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    return Err(if self.interrupted() {
                        ChannelError::Cancelled
                    } else {
                        debug!("Peer {} closed the connection", self.peer);
                        ChannelError::Closed
                    });
                },
                Ok(n) => {
                    self.pending.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                },
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    if self.stop.is_raised() {
                        return Err(ChannelError::Cancelled);
                    }
                },
                Err(e) if e.kind() == ErrorKind::Interrupted => {},
                Err(e) => {
                    return Err(if self.interrupted() {
                        ChannelError::Cancelled
                    } else if e.kind() == ErrorKind::ConnectionReset {
                        ChannelError::Closed
                    } else {
                        ChannelError::Io(e)
                    });
                },
            }
        }
    }

    fn restore_read_timeout(&self) {
        if self.closer.is_closed() {
            return;
        }
        if let Err(e) = self.stream.set_read_timeout(Some(self.read_timeout)) {
            warn!("Failed to restore read timeout: {}", e);
        }
    }
}

impl Drop for FramedChannel {
    fn drop(&mut self) {
        self.closer.close();
    }
}
