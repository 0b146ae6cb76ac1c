use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Tri-state lifecycle marker shared by every component.
///
/// Transitions are monotonic: `Active -> Dying -> Stopped`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    Active = 0,
    Dying = 1,
    Stopped = 2,
}

impl LifecycleState {
    #[inline]
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Active,
            1 => Self::Dying,
            _ => Self::Stopped,
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Dying => "dying",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic lifecycle flag.
///
/// This is the only state a component shares across threads without a lock.
/// `try_begin_shutdown` is the single gate into teardown.
#[derive(Debug)]
pub struct Lifecycle {
    state: Arc<AtomicU8>,
}

impl Lifecycle {
    #[inline]
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(LifecycleState::Active as u8)),
        }
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    /// `Active -> Dying`. Returns `true` for exactly one caller.
    #[inline]
    pub fn try_begin_shutdown(&self) -> bool {
        self.state
            .compare_exchange(
                LifecycleState::Active as u8,
                LifecycleState::Dying as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// `Dying -> Stopped`. Ignored unless the component is dying.
    #[inline]
    pub fn mark_stopped(&self) {
        let _ = self.state.compare_exchange(
            LifecycleState::Dying as u8,
            LifecycleState::Stopped as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Read-only view for peers (e.g. a surface lease held by the renderer).
    #[inline]
    pub fn observer(&self) -> LifecycleObserver {
        LifecycleObserver {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable, read-only handle on another component's lifecycle.
#[derive(Debug, Clone)]
pub struct LifecycleObserver {
    state: Arc<AtomicU8>,
}

impl LifecycleObserver {
    #[inline]
    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }
}
