use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::window::{Window as WinitWindow, WindowAttributes, WindowId};

use wiggler_core::{
    Component, ComponentHooks, Extent2D, NativeSurfaceHandle, SurfaceLease, WindowConfig,
};

use crate::error::{WindowError, WindowResult};
use crate::events::{translate, SurfaceEvent};
use crate::shared::{WindowCloser, WindowShared, WindowWake};

/// Upper bound on creation pumps; desktop platforms resume on the first one.
const CREATE_PUMPS: u32 = 10;
const CREATE_PUMP_TIMEOUT: Duration = Duration::from_millis(100);

/// Native window component.
///
/// Main-thread only. Cross-thread close requests go through [`WindowCloser`].
///
/// Field order matters for drop: the native window goes before its event loop.
pub struct Window {
    shared: Arc<WindowShared>,
    window: RefCell<Option<WinitWindow>>,
    event_loop: RefCell<Option<EventLoop<WindowWake>>>,
    close_on_escape: bool,
}

impl Window {
    /// Opens the native window. Fatal on failure; nothing is left behind.
    pub fn create(config: &WindowConfig) -> WindowResult<Self> {
        let mut event_loop = EventLoop::<WindowWake>::with_user_event().build()?;

        let attrs = WindowAttributes::default()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(config.width, config.height))
            .with_resizable(config.resizable);

        // winit creates windows inside `resumed()`; pump until it fires.
        let mut creator = Creator {
            attrs: Some(attrs),
            result: None,
        };
        for _ in 0..CREATE_PUMPS {
            if let PumpStatus::Exit(code) =
                event_loop.pump_app_events(Some(CREATE_PUMP_TIMEOUT), &mut creator)
            {
                log::warn!("event loop exited with code {code} during window creation");
                break;
            }
            if creator.result.is_some() {
                break;
            }
        }

        let window = match creator.result {
            Some(Ok(w)) => w,
            Some(Err(e)) => return Err(WindowError::Create(e)),
            None => return Err(WindowError::NotCreated),
        };

        let size = window.inner_size();
        let shared = Arc::new(WindowShared::new(Extent2D::new(size.width, size.height)));
        shared.set_proxy(event_loop.create_proxy());

        log::debug!(
            "window created: \"{}\" {}x{}",
            config.title,
            size.width,
            size.height
        );

        Ok(Self {
            shared,
            window: RefCell::new(Some(window)),
            event_loop: RefCell::new(Some(event_loop)),
            close_on_escape: config.close_on_escape,
        })
    }

    pub fn set_on_draw<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.on_draw.set(Arc::new(f));
    }

    pub fn set_on_resize<F>(&self, f: F)
    where
        F: Fn(u32, u32) + Send + Sync + 'static,
    {
        self.shared.on_resize.set(Arc::new(f));
    }

    pub fn set_on_closing<F>(&self, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shared.on_closing.set(Arc::new(f));
    }

    #[inline]
    pub fn closer(&self) -> WindowCloser {
        WindowCloser {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Requests the pump to stop; `run()` destroys the window and returns.
    #[inline]
    pub fn close(&self) {
        self.shared.request_close();
    }

    /// Borrowed view of the native surface, valid while the window is active.
    pub fn get_native_handle(&self) -> WindowResult<NativeSurfaceHandle<'_>> {
        if !self.is_active() {
            return Err(WindowError::NotActive);
        }
        let guard = self.window.borrow();
        let window = guard.as_ref().ok_or(WindowError::NotActive)?;

        let display = window.display_handle()?.as_raw();
        let raw = window.window_handle()?.as_raw();

        Ok(NativeSurfaceHandle::new(
            display,
            raw,
            self.shared.extent(),
            SurfaceLease::new(self.shared.hooks.observer()),
        ))
    }

    /// Pumps platform events until `close()` or a fatal platform error, then
    /// destroys the window. No-op if the window is not active.
    pub fn run(&self) {
        if !self.is_active() {
            return;
        }
        let Some(mut event_loop) = self.event_loop.borrow_mut().take() else {
            return;
        };

        self.request_redraw();

        let mut pump = Pump { owner: self };
        while self.is_active() && !self.shared.close_requested() {
            match event_loop.pump_app_events(None, &mut pump) {
                PumpStatus::Continue => {}
                PumpStatus::Exit(0) => break,
                PumpStatus::Exit(code) => {
                    self.shared.hooks.log(
                        log::Level::Error,
                        &format!("platform event loop failed with exit code {code}"),
                    );
                    break;
                }
            }
        }

        self.destroy();
        drop(event_loop);
    }

    #[inline]
    fn request_redraw(&self) {
        if let Some(w) = self.window.borrow().as_ref() {
            w.request_redraw();
        }
    }

    #[inline]
    fn owns(&self, id: WindowId) -> bool {
        self.window.borrow().as_ref().map(|w| w.id()) == Some(id)
    }

    #[inline]
    fn physical_extent(&self) -> Option<Extent2D> {
        self.window.borrow().as_ref().map(|w| {
            let s = w.inner_size();
            Extent2D::new(s.width, s.height)
        })
    }
}

impl Component for Window {
    #[inline]
    fn hooks(&self) -> &ComponentHooks {
        &self.shared.hooks
    }

    fn destroy(&self) {
        self.shared.shutdown(|| {
            drop(self.window.borrow_mut().take());
            // While `run()` pumps it owns the event loop and drops it on return.
            if let Ok(mut el) = self.event_loop.try_borrow_mut() {
                drop(el.take());
            }
        });
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// One-shot handler that creates the native window on `resumed`.
struct Creator {
    attrs: Option<WindowAttributes>,
    result: Option<Result<WinitWindow, winit::error::OsError>>,
}

impl ApplicationHandler<WindowWake> for Creator {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(attrs) = self.attrs.take() {
            self.result = Some(event_loop.create_window(attrs));
        }
    }

    fn window_event(&mut self, _: &ActiveEventLoop, _: WindowId, _: WindowEvent) {}
}

/// Run-phase handler: translates platform events for the owning [`Window`].
struct Pump<'a> {
    owner: &'a Window,
}

impl ApplicationHandler<WindowWake> for Pump<'_> {
    fn resumed(&mut self, _: &ActiveEventLoop) {}

    fn user_event(&mut self, _: &ActiveEventLoop, event: WindowWake) {
        match event {
            WindowWake::Close => log::trace!("window close requested"),
        }
    }

    fn window_event(&mut self, _: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let owner = self.owner;
        if !owner.is_active() || !owner.owns(id) {
            return;
        }

        if let WindowEvent::ScaleFactorChanged { .. } = event {
            if let Some(e) = owner.physical_extent() {
                owner.shared.dispatch(SurfaceEvent::Resized {
                    width: e.width,
                    height: e.height,
                });
            }
            return;
        }

        let Some(ev) = translate(&event, owner.close_on_escape) else {
            return;
        };
        owner.shared.dispatch(ev);

        // Continuous frame loop: every presented frame asks for the next one.
        if ev == SurfaceEvent::Redraw && owner.is_active() {
            owner.request_redraw();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
    }
}
