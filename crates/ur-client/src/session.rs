//! 连接复用
//!
//! 命令客户端和 Dashboard 客户端都只持有一条连接：首次请求时建立，
//! 之后复用；任何收发失败后丢弃，下一次请求重新建立。

use tracing::{debug, info, warn};
use ur_net::{ChannelConfig, ConnectError, FramedChannel};

pub(crate) struct Session {
    /// 日志中使用的接口名称
    name: &'static str,
    host: String,
    port: u16,
    config: ChannelConfig,
    channel: Option<FramedChannel>,
}

impl Session {
    pub(crate) fn new(name: &'static str, host: String, port: u16, config: ChannelConfig) -> Self {
        Self {
            name,
            host,
            port,
            config,
            channel: None,
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.channel.as_ref().is_some_and(|c| !c.is_closed())
    }

    /// 复用现有连接，或新建连接并执行 `on_open`
    ///
    /// `on_open` 失败时新连接被丢弃。
    pub(crate) fn ensure<E>(
        &mut self,
        on_open: impl FnOnce(&mut FramedChannel) -> Result<(), E>,
    ) -> Result<&mut FramedChannel, E>
    where
        E: From<ConnectError>,
    {
        if self.channel.as_ref().is_some_and(FramedChannel::is_closed) {
            self.channel = None;
        }

        let channel = match self.channel.take() {
            Some(channel) => channel,
            None => {
                let mut channel = FramedChannel::connect(&self.host, self.port, &self.config)
                    .inspect_err(|e| warn!("Failed to connect to {} interface: {}", self.name, e))?;
                on_open(&mut channel)?;
                info!(
                    "Connected to {} interface at {}",
                    self.name,
                    channel.peer_addr()
                );
                channel
            },
        };
        Ok(self.channel.insert(channel))
    }

    /// 丢弃当前连接（流可能已失步）
    pub(crate) fn drop_channel(&mut self, reason: &dyn std::fmt::Display) {
        if let Some(channel) = self.channel.take() {
            warn!("Dropping {} connection: {}", self.name, reason);
            channel.close();
        }
    }

    pub(crate) fn close(&mut self) {
        match self.channel.take() {
            Some(channel) => {
                channel.close();
                info!("Disconnected from {} interface", self.name);
            },
            None => debug!("{} interface not connected, nothing to close", self.name),
        }
    }
}
