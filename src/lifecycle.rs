use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Uninitialized,
    Ready,
    ShuttingDown,
    Stopped,
}

/// Tracks the context through `Uninitialized -> Ready -> ShuttingDown -> Stopped`.
///
/// Each transition method returns `true` only when it actually moved the
/// state, so callers can run setup or teardown exactly once.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: LifecycleState,
    init_attempts: u32,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            init_attempts: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == LifecycleState::Ready
    }

    pub fn is_stopped(&self) -> bool {
        self.state == LifecycleState::Stopped
    }

    pub fn init_attempts(&self) -> u32 {
        self.init_attempts
    }

    /// Counts an initialization attempt. Returns `false` outside `Uninitialized`.
    pub fn record_attempt(&mut self) -> bool {
        if self.state != LifecycleState::Uninitialized {
            return false;
        }
        self.init_attempts += 1;
        true
    }

    pub fn mark_ready(&mut self) -> bool {
        if self.state != LifecycleState::Uninitialized {
            return false;
        }
        debug!(attempts = self.init_attempts, "sharing context ready");
        self.state = LifecycleState::Ready;
        true
    }

    /// Moves `Ready` to `ShuttingDown`. From `Uninitialized` the context goes
    /// straight to `Stopped` since there is nothing to tear down.
    pub fn begin_shutdown(&mut self) -> bool {
        match self.state {
            LifecycleState::Ready => {
                self.state = LifecycleState::ShuttingDown;
                true
            }
            LifecycleState::Uninitialized => {
                debug!("sharing context stopped before initialization");
                self.state = LifecycleState::Stopped;
                false
            }
            LifecycleState::ShuttingDown | LifecycleState::Stopped => false,
        }
    }

    pub fn finish_shutdown(&mut self) {
        if self.state == LifecycleState::ShuttingDown {
            debug!("sharing context stopped");
            self.state = LifecycleState::Stopped;
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}
