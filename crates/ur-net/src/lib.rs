//! # UR Net
//!
//! 阻塞式 TCP 通道层，为三个控制器接口（实时 / 主接口 / Dashboard）提供统一的收发抽象。
//!
//! - [`FramedChannel`]: 一条 TCP 连接，支持精确长度读取、行读取和发送
//! - [`ChannelCloser`]: 可跨线程关闭通道的句柄
//! - [`StopSignal`]: 协作式停止标志，读超时时检查
//! - [`ReconnectPolicy`]: 固定次数、固定间隔的重试策略
//! - [`RxChannel`]: 接收循环使用的字节源抽象（测试中由 mock 实现）

use bytes::Bytes;

mod channel;
mod config;
mod error;
mod retry;

pub use channel::{ChannelCloser, FramedChannel, StopSignal};
pub use config::ChannelConfig;
pub use error::{ChannelError, ConnectError};
pub use retry::{ReconnectPolicy, RetryExhausted};

/// 接收端字节源
///
/// 接收循环只依赖这个 trait，因此可以用内存中的 mock 驱动。
pub trait RxChannel: Send {
    /// 读取恰好 `n` 个字节
    ///
    /// # 错误
    /// - `ChannelError::Closed`: 对端关闭（读到 0 字节）
    /// - `ChannelError::Cancelled`: 停止信号已触发或本地已关闭
    /// - `ChannelError::Io`: 其他 IO 错误
    fn receive_exact(&mut self, n: usize) -> Result<Bytes, ChannelError>;
}

impl RxChannel for FramedChannel {
    fn receive_exact(&mut self, n: usize) -> Result<Bytes, ChannelError> {
        FramedChannel::receive_exact(self, n)
    }
}

impl<T: RxChannel + ?Sized> RxChannel for Box<T> {
    fn receive_exact(&mut self, n: usize) -> Result<Bytes, ChannelError> {
        (**self).receive_exact(n)
    }
}
