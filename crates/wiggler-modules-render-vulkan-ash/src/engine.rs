use std::sync::atomic::{AtomicBool, Ordering};

use log::Level;
use parking_lot::Mutex;

use wiggler_core::{
    Component, ComponentHooks, DevicePreference, Extent2D, NativeSurfaceHandle, RenderConfig,
    SharedExtent, SurfaceLease,
};

use crate::backend::{Acquire, AdapterInfo, Capabilities, GpuDevice, GpuInstance, Present};
use crate::error::{EngineError, EngineResult, GpuError, GpuResult};
use crate::select::select_adapter;

/// Render settings fixed for the engine's lifetime.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub clear_color: [f32; 4],
    pub required: Capabilities,
    pub preference: DevicePreference,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            required: Capabilities::REQUIRED,
            preference: DevicePreference::default(),
        }
    }
}

impl EngineOptions {
    pub fn from_config(cfg: &RenderConfig) -> Self {
        Self {
            clear_color: cfg.clear_color,
            required: Capabilities::REQUIRED,
            preference: cfg.device.clone(),
        }
    }
}

/// Frame counters, readable at any time including after destroy.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub presented: u64,
    pub skipped: u64,
    /// Every build of presentation resources, the first one included.
    pub presentation_builds: u64,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Frame {
    Presented,
    Skipped,
}

struct RenderState<D> {
    device: D,
    adapter: AdapterInfo,
    surface: SurfaceLease,
    /// Extent of the live presentation resources, if any.
    presentation: Option<Extent2D>,
}

/// GPU rendering component.
///
/// Owns one device bound to a window surface. `render` clears and presents a
/// frame, transparently rebuilding presentation resources when the surface
/// changes. Any unrecoverable GPU error destroys the engine.
pub struct Engine<I: GpuInstance> {
    hooks: ComponentHooks,
    options: EngineOptions,
    extent: SharedExtent,
    dirty: AtomicBool,
    state: Mutex<Option<RenderState<I::Device>>>,
    stats: Mutex<FrameStats>,
}

impl<I: GpuInstance> Engine<I> {
    pub fn new(options: EngineOptions) -> Self {
        Self {
            hooks: ComponentHooks::new("engine"),
            options,
            extent: SharedExtent::default(),
            dirty: AtomicBool::new(false),
            state: Mutex::new(None),
            stats: Mutex::new(FrameStats::default()),
        }
    }

    /// Picks an adapter, opens it and builds the first presentation resources.
    ///
    /// Failure is fatal: the engine logs the cause, destroys itself and
    /// returns the error. Nothing partially built stays reachable.
    pub fn init(&self, mut instance: I, surface: &NativeSurfaceHandle<'_>) -> EngineResult<()> {
        if !self.is_active() {
            return Err(EngineError::NotActive);
        }
        if self.state.lock().is_some() {
            return Err(EngineError::AlreadyInitialized);
        }
        if !surface.is_valid() {
            return Err(self.abort_init(EngineError::SurfaceGone));
        }

        let adapters = match instance.enumerate_adapters() {
            Ok(a) => a,
            Err(e) => return Err(self.abort_init(EngineError::Enumerate(e))),
        };

        let capable: Vec<&AdapterInfo> = adapters
            .iter()
            .filter(|a| a.satisfies(self.options.required))
            .collect();
        if !capable.is_empty() {
            self.hooks.log(Level::Info, "Found supported GPU devices:");
            for a in &capable {
                self.hooks.log(Level::Info, &format!("\"{}\" ({:?})", a.name, a.kind));
            }
        }

        let Some(adapter) =
            select_adapter(&adapters, self.options.required, &self.options.preference).cloned()
        else {
            return Err(self.abort_init(EngineError::NoCapableDevice {
                required: self.options.required,
                candidates: adapters.len(),
            }));
        };
        self.hooks.log(
            Level::Info,
            &format!("Selected \"{}\" for rendering.", adapter.name),
        );

        let device = match instance.create_device(&adapter) {
            Ok(d) => d,
            Err(source) => {
                return Err(self.abort_init(EngineError::Device {
                    adapter: adapter.name,
                    source,
                }))
            }
        };

        self.extent.swap(surface.extent());
        let mut state = RenderState {
            device,
            adapter,
            surface: surface.lease().clone(),
            presentation: None,
        };

        let extent = self.extent.load();
        if !extent.is_zero() {
            if let Err(e) = self.build_presentation(&mut state, extent) {
                state.device.release();
                return Err(self.abort_init(EngineError::Presentation(e)));
            }
        }

        *self.state.lock() = Some(state);
        Ok(())
    }

    pub(crate) fn abort_init(&self, err: EngineError) -> EngineError {
        self.hooks
            .log(Level::Error, &format!("engine initialization failed: {err}"));
        self.destroy();
        err
    }

    /// Records the new drawable extent. Resources are rebuilt before the next frame.
    pub fn resize(&self, width: u32, height: u32) {
        if !self.is_active() {
            return;
        }
        let next = Extent2D::new(width, height);
        if self.extent.swap(next) != next {
            self.dirty.store(true, Ordering::Release);
        }
    }

    /// Renders and presents one frame, or skips it when the surface cannot be drawn to.
    pub fn render(&self) {
        if !self.is_active() {
            return;
        }

        let outcome = {
            let mut guard = self.state.lock();
            let Some(state) = guard.as_mut() else {
                return;
            };
            self.render_frame(state)
        };

        match outcome {
            Ok(Frame::Presented) => self.stats.lock().presented += 1,
            Ok(Frame::Skipped) => self.stats.lock().skipped += 1,
            Err(e) => {
                self.hooks
                    .log(Level::Error, &format!("render failed, stopping engine: {e}"));
                self.destroy();
            }
        }
    }

    fn render_frame(&self, state: &mut RenderState<I::Device>) -> GpuResult<Frame> {
        if !state.surface.is_valid() {
            return Ok(Frame::Skipped);
        }

        let extent = self.extent.load();
        if extent.is_zero() {
            return Ok(Frame::Skipped);
        }

        if self.dirty.swap(false, Ordering::AcqRel) || state.presentation.is_none() {
            self.build_presentation(state, extent)?;
        }

        let image = match state.device.acquire()? {
            Acquire::Ready(image) => image,
            Acquire::Stale => {
                log::debug!(target: "engine", "presentation target stale on acquire");
                self.build_presentation(state, self.extent.load())?;
                return Ok(Frame::Skipped);
            }
        };

        state.device.draw(image, self.options.clear_color)?;

        match state.device.present(image)? {
            Present::Presented => Ok(Frame::Presented),
            Present::Suboptimal => {
                self.dirty.store(true, Ordering::Release);
                Ok(Frame::Presented)
            }
            // Not shown; rebuilt before the next frame.
            Present::Stale => {
                self.dirty.store(true, Ordering::Release);
                Ok(Frame::Skipped)
            }
        }
    }

    fn build_presentation(
        &self,
        state: &mut RenderState<I::Device>,
        extent: Extent2D,
    ) -> GpuResult<()> {
        if extent.is_zero() {
            self.dirty.store(true, Ordering::Release);
            return Ok(());
        }

        let actual = state.device.create_presentation(extent)?;
        if actual.is_zero() {
            return Err(GpuError::Other(format!(
                "surface reported a zero extent for requested {}x{}",
                extent.width, extent.height
            )));
        }
        state.presentation = Some(actual);
        self.stats.lock().presentation_builds += 1;
        log::debug!(
            target: "engine",
            "presentation built at {}x{}",
            actual.width,
            actual.height
        );
        Ok(())
    }

    pub fn stats(&self) -> FrameStats {
        *self.stats.lock()
    }

    /// Adapter in use, `None` before init and after destroy.
    pub fn adapter(&self) -> Option<AdapterInfo> {
        self.state.lock().as_ref().map(|s| s.adapter.clone())
    }

    /// Current drawable extent as last reported by `resize` (or the surface at init).
    pub fn extent(&self) -> Extent2D {
        self.extent.load()
    }
}

impl<I: GpuInstance> Component for Engine<I> {
    fn hooks(&self) -> &ComponentHooks {
        &self.hooks
    }

    fn destroy(&self) {
        self.hooks.shutdown(
            || {},
            || {
                let Some(mut state) = self.state.lock().take() else {
                    return;
                };
                if let Err(e) = state.device.wait_idle() {
                    log::warn!(target: "engine", "wait for idle failed during shutdown: {e}");
                }
                if state.presentation.take().is_some() {
                    state.device.destroy_presentation();
                }
                state.device.release();
            },
        );
    }
}

impl<I: GpuInstance> Drop for Engine<I> {
    fn drop(&mut self) {
        self.destroy();
    }
}
