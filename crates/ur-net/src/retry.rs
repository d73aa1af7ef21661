//! 重连策略

use std::fmt::Display;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 固定次数、固定间隔的重试策略
///
/// 只在调用方主动请求时使用，不会自动触发。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReconnectPolicy {
    /// 最大尝试次数（0 按 1 处理）
    pub attempts: u32,
    /// 两次尝试之间的间隔（最后一次失败后不等待）
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// 所有尝试均失败
#[derive(Error, Debug)]
#[error("Gave up after {attempts} attempt(s): {last_error}")]
pub struct RetryExhausted<E: std::fmt::Debug + Display> {
    pub attempts: u32,
    pub last_error: E,
}

impl ReconnectPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// 不重试
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// 依次调用 `op(attempt)`（attempt 从 1 开始），直到成功或次数耗尽
    ///
    /// # 示例
    ///
    /// ```
    /// use std::time::Duration;
    /// use ur_net::ReconnectPolicy;
    ///
    /// let policy = ReconnectPolicy::new(3, Duration::ZERO);
    /// let result = policy.run(|attempt| if attempt == 2 { Ok(attempt) } else { Err("refused") });
    /// assert_eq!(result.unwrap(), 2);
    /// ```
    pub fn run<T, E, F>(&self, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        E: std::fmt::Debug + Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => {
                    if attempt > 1 {
                        info!("Succeeded on attempt {}/{}", attempt, attempts);
                    }
                    return Ok(value);
                },
                Err(e) if attempt >= attempts => {
                    warn!("Attempt {}/{} failed: {}, giving up", attempt, attempts, e);
                    return Err(RetryExhausted {
                        attempts: attempt,
                        last_error: e,
                    });
                },
                Err(e) => {
                    warn!(
                        "Attempt {}/{} failed: {}, retrying in {:?}",
                        attempt, attempts, e, self.delay
                    );
                    if !self.delay.is_zero() {
                        thread::sleep(self.delay);
                    }
                    attempt += 1;
                },
            }
        }
    }
}
