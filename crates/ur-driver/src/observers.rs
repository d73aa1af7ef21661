//! 观察者注册表
//!
//! 三类观察者：完整状态、位置视图、安全视图。
//!
//! 列表采用写时复制：注册 / 注销时在写锁内复制整张表并替换，
//! 通知时只在读锁内克隆一次 `Arc`，回调执行期间不持有任何锁，
//! 因此回调内可以安全地注册或注销观察者。
//!
//! 每个回调都在 `catch_unwind` 中执行：单个回调 panic 只记录日志和计数，
//! 不影响接收线程和其他回调。

use crate::metrics::ReceiverMetrics;
use crate::state::{PositionSnapshot, RobotState, SafetySnapshot};
use parking_lot::RwLock;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::error;

pub type StateObserver = Arc<dyn Fn(&RobotState) + Send + Sync>;
pub type PositionObserver = Arc<dyn Fn(&PositionSnapshot) + Send + Sync>;
pub type SafetyObserver = Arc<dyn Fn(&SafetySnapshot) + Send + Sync>;

/// 注册凭据，用于注销
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(u64);

impl ObserverToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Clone, Default)]
struct ObserverLists {
    state: Vec<(ObserverToken, StateObserver)>,
    position: Vec<(ObserverToken, PositionObserver)>,
    safety: Vec<(ObserverToken, SafetyObserver)>,
}

impl ObserverLists {
    fn len(&self) -> usize {
        self.state.len() + self.position.len() + self.safety.len()
    }
}

/// 观察者注册表
pub struct ObserverRegistry {
    lists: RwLock<Arc<ObserverLists>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            lists: RwLock::new(Arc::new(ObserverLists::default())),
            next_id: AtomicU64::new(1),
        }
    }

    fn next_token(&self) -> ObserverToken {
        ObserverToken(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn update(&self, f: impl FnOnce(&mut ObserverLists)) {
        let mut guard = self.lists.write();
        let mut next = (**guard).clone();
        f(&mut next);
        *guard = Arc::new(next);
    }

    /// 注册完整状态观察者
    pub fn add_state_observer<F>(&self, observer: F) -> ObserverToken
    where
        F: Fn(&RobotState) + Send + Sync + 'static,
    {
        let token = self.next_token();
        self.update(|lists| lists.state.push((token, Arc::new(observer))));
        token
    }

    /// 注册位置观察者
    pub fn add_position_observer<F>(&self, observer: F) -> ObserverToken
    where
        F: Fn(&PositionSnapshot) + Send + Sync + 'static,
    {
        let token = self.next_token();
        self.update(|lists| lists.position.push((token, Arc::new(observer))));
        token
    }

    /// 注册安全观察者
    pub fn add_safety_observer<F>(&self, observer: F) -> ObserverToken
    where
        F: Fn(&SafetySnapshot) + Send + Sync + 'static,
    {
        let token = self.next_token();
        self.update(|lists| lists.safety.push((token, Arc::new(observer))));
        token
    }

    /// 注销观察者，返回是否找到
    pub fn remove(&self, token: ObserverToken) -> bool {
        let mut removed = false;
        self.update(|lists| {
            let before = lists.len();
            lists.state.retain(|(t, _)| *t != token);
            lists.position.retain(|(t, _)| *t != token);
            lists.safety.retain(|(t, _)| *t != token);
            removed = lists.len() != before;
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.lists.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按注册顺序通知所有观察者
    ///
    /// 顺序：完整状态 → 位置 → 安全。
    pub fn notify(&self, state: &RobotState, metrics: &ReceiverMetrics) {
        let lists = Arc::clone(&self.lists.read());

        for (token, observer) in &lists.state {
            invoke(*token, metrics, || observer(state));
        }

        if !lists.position.is_empty() {
            let position = state.position();
            for (token, observer) in &lists.position {
                invoke(*token, metrics, || observer(&position));
            }
        }

        if !lists.safety.is_empty() {
            let safety = state.safety();
            for (token, observer) in &lists.safety {
                invoke(*token, metrics, || observer(&safety));
            }
        }
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn invoke(token: ObserverToken, metrics: &ReceiverMetrics, f: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
        metrics.observer_panics.fetch_add(1, Ordering::Relaxed);
        error!(
            "Observer #{} panicked: {}",
            token.id(),
            panic_message(payload.as_ref())
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic payload>"
    }
}
