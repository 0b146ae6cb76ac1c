use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use winit::event_loop::EventLoopProxy;

use wiggler_core::{
    ComponentHooks, Extent2D, LifecycleState, ResizeFn, SharedExtent, SignalFn, Slot,
};

use crate::events::SurfaceEvent;

/// User event used only to wake a blocked event pump.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum WindowWake {
    Close,
}

/// Thread-safe half of the window: lifecycle, callback slots, close request.
pub(crate) struct WindowShared {
    pub(crate) hooks: ComponentHooks,
    pub(crate) on_draw: Slot<SignalFn>,
    pub(crate) on_resize: Slot<ResizeFn>,
    pub(crate) on_closing: Slot<SignalFn>,
    close_requested: AtomicBool,
    proxy: Mutex<Option<EventLoopProxy<WindowWake>>>,
    extent: SharedExtent,
}

impl WindowShared {
    pub(crate) fn new(extent: Extent2D) -> Self {
        Self {
            hooks: ComponentHooks::new("window"),
            on_draw: Slot::empty(),
            on_resize: Slot::empty(),
            on_closing: Slot::empty(),
            close_requested: AtomicBool::new(false),
            proxy: Mutex::new(None),
            extent: SharedExtent::new(extent),
        }
    }

    #[inline]
    pub(crate) fn set_proxy(&self, proxy: EventLoopProxy<WindowWake>) {
        *self.proxy.lock() = Some(proxy);
    }

    #[inline]
    pub(crate) fn extent(&self) -> Extent2D {
        self.extent.load()
    }

    #[inline]
    pub(crate) fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::Acquire)
    }

    /// Asks the pump to stop. Safe from any thread; wakes a blocked pump.
    pub(crate) fn request_close(&self) {
        if self.close_requested.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(proxy) = self.proxy.lock().as_ref() {
            let _ = proxy.send_event(WindowWake::Close);
        }
    }

    /// Routes one translated platform event to the outbound callbacks.
    pub(crate) fn dispatch(&self, event: SurfaceEvent) {
        if !self.hooks.is_active() {
            return;
        }

        match event {
            SurfaceEvent::Redraw => self.on_draw.emit(),
            SurfaceEvent::Resized { width, height } => {
                let next = Extent2D::new(width, height);
                if self.extent.swap(next) != next {
                    log::trace!("window resized to {width}x{height}");
                }
                self.on_resize.emit(width, height);
            }
            SurfaceEvent::CloseRequested => {
                // Nobody wired `onClosing`: closing is the only sensible default.
                match self.on_closing.get() {
                    Some(f) => f(),
                    None => self.request_close(),
                }
            }
        }
    }

    /// Runs the shared five-step shutdown; `release` frees the native objects.
    pub(crate) fn shutdown<R: FnOnce()>(&self, release: R) -> bool {
        self.hooks.shutdown(
            || {
                self.on_draw.clear();
                self.on_resize.clear();
                self.on_closing.clear();
            },
            || {
                self.proxy.lock().take();
                release();
            },
        )
    }
}

/// `Send + Sync` handle that can close the window from any thread.
#[derive(Clone)]
pub struct WindowCloser {
    pub(crate) shared: Arc<WindowShared>,
}

impl WindowCloser {
    /// Requests the event pump to stop; `run()` then destroys the window and returns.
    #[inline]
    pub fn close(&self) {
        self.shared.request_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn shared() -> Arc<WindowShared> {
        Arc::new(WindowShared::new(Extent2D::new(800, 600)))
    }

    #[test]
    fn dispatch_routes_to_slots() {
        let s = shared();
        let draws = Arc::new(AtomicUsize::new(0));
        let resized = Arc::new(Mutex::new(Vec::new()));

        let d = Arc::clone(&draws);
        s.on_draw.set(Arc::new(move || {
            d.fetch_add(1, Ordering::SeqCst);
        }));
        let r = Arc::clone(&resized);
        s.on_resize
            .set(Arc::new(move |w: u32, h: u32| r.lock().push((w, h))));

        s.dispatch(SurfaceEvent::Redraw);
        s.dispatch(SurfaceEvent::Resized {
            width: 1024,
            height: 0,
        });

        assert_eq!(draws.load(Ordering::SeqCst), 1);
        assert_eq!(*resized.lock(), vec![(1024, 0)]);
        assert_eq!(s.extent(), Extent2D::new(1024, 0));
    }

    #[test]
    fn close_request_goes_to_on_closing_when_wired() {
        let s = shared();
        let closing = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&closing);
        s.on_closing.set(Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        s.dispatch(SurfaceEvent::CloseRequested);
        assert_eq!(closing.load(Ordering::SeqCst), 1);
        assert!(!s.close_requested());
    }

    #[test]
    fn close_request_closes_when_unwired() {
        let s = shared();
        s.dispatch(SurfaceEvent::CloseRequested);
        assert!(s.close_requested());
    }

    #[test]
    fn closer_works_from_another_thread() {
        let s = shared();
        let closer = WindowCloser {
            shared: Arc::clone(&s),
        };

        std::thread::spawn(move || closer.close()).join().unwrap();
        assert!(s.close_requested());
    }

    #[test]
    fn events_after_shutdown_are_dropped() {
        let s = shared();
        let draws = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&draws);
        s.on_draw.set(Arc::new(move || {
            d.fetch_add(1, Ordering::SeqCst);
        }));

        let released = AtomicUsize::new(0);
        assert!(s.shutdown(|| {
            released.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!s.shutdown(|| {
            released.fetch_add(1, Ordering::SeqCst);
        }));

        s.dispatch(SurfaceEvent::Redraw);
        s.dispatch(SurfaceEvent::Resized {
            width: 1,
            height: 1,
        });

        assert_eq!(draws.load(Ordering::SeqCst), 0);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(s.extent(), Extent2D::new(800, 600));
        assert!(!s.on_draw.is_set());
        assert_eq!(s.hooks.state(), LifecycleState::Stopped);
    }
}
