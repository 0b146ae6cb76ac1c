use std::sync::Arc;

use crate::callback::{LogFn, SignalFn, Slot};
use crate::lifecycle::{Lifecycle, LifecycleObserver, LifecycleState};

/// Prefix used for persisted lines, e.g. `[WARNING] surface lost`.
#[inline]
pub fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARNING",
        log::Level::Info => "INFO",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    }
}

/// Lifecycle flag plus the three callback slots every component carries.
///
/// Components embed one of these and route `destroy()` through [`ComponentHooks::shutdown`].
#[derive(Debug)]
pub struct ComponentHooks {
    name: &'static str,
    lifecycle: Lifecycle,
    on_log: Slot<LogFn>,
    on_is_about_to_stop: Slot<SignalFn>,
    on_has_stopped: Slot<SignalFn>,
}

impl ComponentHooks {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            lifecycle: Lifecycle::new(),
            on_log: Slot::empty(),
            on_is_about_to_stop: Slot::empty(),
            on_has_stopped: Slot::empty(),
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    #[inline]
    pub fn observer(&self) -> LifecycleObserver {
        self.lifecycle.observer()
    }

    #[inline]
    pub fn on_log(&self) -> &Slot<LogFn> {
        &self.on_log
    }

    #[inline]
    pub fn on_is_about_to_stop(&self) -> &Slot<SignalFn> {
        &self.on_is_about_to_stop
    }

    #[inline]
    pub fn on_has_stopped(&self) -> &Slot<SignalFn> {
        &self.on_has_stopped
    }

    /// Persists `[LEVEL] message` through `onLog` and mirrors it to the `log` facade.
    pub fn log(&self, level: log::Level, message: &str) {
        log::log!(target: self.name, level, "{message}");

        if let Some(f) = self.on_log.get() {
            f(&format!("[{}] {}", level_tag(level), message));
        }
    }

    /// Two-phase shutdown.
    ///
    /// 1. `Active -> Dying`; every caller but the first returns `false` here.
    /// 2. `onIsAboutToStop`.
    /// 3. Every outbound slot is cleared (`clear_outbound` clears the component-specific ones).
    /// 4. `release` frees owned resources; it may block.
    /// 5. `Dying -> Stopped`, then `onHasStopped`.
    pub fn shutdown<C, R>(&self, clear_outbound: C, release: R) -> bool
    where
        C: FnOnce(),
        R: FnOnce(),
    {
        if !self.lifecycle.try_begin_shutdown() {
            return false;
        }
        log::debug!(target: self.name, "{} dying", self.name);

        self.on_is_about_to_stop.emit();

        let has_stopped = self.on_has_stopped.take();
        self.on_log.clear();
        self.on_is_about_to_stop.clear();
        clear_outbound();

        release();

        self.lifecycle.mark_stopped();
        log::debug!(target: self.name, "{} stopped", self.name);

        if let Some(f) = has_stopped {
            f();
        }
        true
    }
}

/// Uniform public contract of Logger, Window and Engine.
///
/// Wiring setters must only be used before the component starts doing work.
pub trait Component {
    fn hooks(&self) -> &ComponentHooks;

    /// Idempotent, possibly blocking shutdown entry point.
    fn destroy(&self);

    #[inline]
    fn state(&self) -> LifecycleState {
        self.hooks().state()
    }

    #[inline]
    fn is_active(&self) -> bool {
        self.hooks().is_active()
    }

    fn set_on_log<F>(&self, f: F)
    where
        Self: Sized,
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.hooks().on_log().set(Arc::new(f));
    }

    fn set_on_is_about_to_stop<F>(&self, f: F)
    where
        Self: Sized,
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks().on_is_about_to_stop().set(Arc::new(f));
    }

    fn set_on_has_stopped<F>(&self, f: F)
    where
        Self: Sized,
        F: Fn() + Send + Sync + 'static,
    {
        self.hooks().on_has_stopped().set(Arc::new(f));
    }
}
