//! 日志初始化

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` 未设置时使用的过滤规则
pub const DEFAULT_LOG_FILTER: &str =
    "ur_sdk=info,ur_driver=info,ur_client=info,ur_net=info,ur_protocol=info";

static INIT: Once = Once::new();

/// 安装全局 `tracing` 订阅者，并把 `log` 记录桥接到 `tracing`
///
/// 过滤规则取自 `RUST_LOG`，未设置时使用 [`DEFAULT_LOG_FILTER`]。
/// 可以重复调用；如果应用已经安装了自己的订阅者，本函数不会覆盖它。
///
/// ```rust
/// ur_sdk::init_logging();
/// ur_sdk::init_logging();
/// ```
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_log::LogTracer::init_with_filter(log::LevelFilter::Trace);

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_names(true)
            .finish();
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            tracing::debug!("Global tracing subscriber already installed");
        }
    });
}
