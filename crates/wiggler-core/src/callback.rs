use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// `onLog(message)`.
pub type LogFn = dyn Fn(&str) + Send + Sync;

/// `onDraw`, `onClosing`, `onIsAboutToStop`, `onHasStopped`.
pub type SignalFn = dyn Fn() + Send + Sync;

/// `onResize(width, height)`.
pub type ResizeFn = dyn Fn(u32, u32) + Send + Sync;

/// One nullable outbound callback.
///
/// The receiving component owns the slot. Whatever the closure captures plays
/// the role of the callback context and must outlive the slot, which `Arc`
/// guarantees.
///
/// `get` clones the `Arc` out of the lock, so a callback may freely call back
/// into the component that fired it (including clearing this very slot).
pub struct Slot<F: ?Sized> {
    inner: RwLock<Option<Arc<F>>>,
}

impl<F: ?Sized> Slot<F> {
    #[inline]
    pub const fn empty() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    #[inline]
    pub fn set(&self, f: Arc<F>) {
        *self.inner.write() = Some(f);
    }

    #[inline]
    pub fn clear(&self) {
        *self.inner.write() = None;
    }

    #[inline]
    pub fn take(&self) -> Option<Arc<F>> {
        self.inner.write().take()
    }

    #[inline]
    pub fn get(&self) -> Option<Arc<F>> {
        self.inner.read().clone()
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.inner.read().is_some()
    }
}

impl<F: ?Sized> Default for Slot<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: ?Sized> fmt::Debug for Slot<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").field("set", &self.is_set()).finish()
    }
}

impl Slot<SignalFn> {
    /// Fires the callback if one is set.
    #[inline]
    pub fn emit(&self) {
        if let Some(f) = self.get() {
            f();
        }
    }
}

impl Slot<LogFn> {
    #[inline]
    pub fn emit(&self, message: &str) {
        if let Some(f) = self.get() {
            f(message);
        }
    }
}

impl Slot<ResizeFn> {
    #[inline]
    pub fn emit(&self, width: u32, height: u32) {
        if let Some(f) = self.get() {
            f(width, height);
        }
    }
}
