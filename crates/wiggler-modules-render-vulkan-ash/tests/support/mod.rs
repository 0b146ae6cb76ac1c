#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use wiggler_core::raw_window_handle::{
    RawDisplayHandle, RawWindowHandle, WebDisplayHandle, WebWindowHandle,
};
use wiggler_core::{AdapterKind, Extent2D, Lifecycle, NativeSurfaceHandle, SurfaceLease};
use wiggler_modules_render_vulkan_ash::{
    Acquire, AdapterInfo, Capabilities, GpuDevice, GpuError, GpuInstance, GpuResult, Present,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Enumerate,
    CreateDevice(usize),
    CreatePresentation(Extent2D),
    DestroyPresentation,
    Acquire,
    Draw(u32),
    Present(u32),
    WaitIdle,
    Release,
    Note(&'static str),
}

/// Scripted backend responses. Empty queues fall back to the happy path.
#[derive(Default)]
pub struct Script {
    pub adapters: Vec<AdapterInfo>,
    pub fail_enumerate: bool,
    pub fail_device: bool,
    pub fail_presentation: bool,
    pub acquire: VecDeque<GpuResult<Acquire>>,
    pub present: VecDeque<GpuResult<Present>>,
    pub draw_error: Option<String>,
}

#[derive(Clone, Default)]
pub struct Journal {
    calls: Arc<Mutex<Vec<Call>>>,
    pub script: Arc<Mutex<Script>>,
}

impl Journal {
    pub fn with_adapters(adapters: Vec<AdapterInfo>) -> Self {
        let j = Self::default();
        j.script.lock().adapters = adapters;
        j
    }

    pub fn single_gpu() -> Self {
        Self::with_adapters(vec![gpu(0, "Mock GPU", AdapterKind::Discrete, Capabilities::REQUIRED)])
    }

    pub fn push(&self, call: Call) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn instance(&self) -> MockInstance {
        MockInstance {
            journal: self.clone(),
        }
    }
}

pub fn gpu(index: usize, name: &str, kind: AdapterKind, capabilities: Capabilities) -> AdapterInfo {
    AdapterInfo {
        index,
        name: name.to_string(),
        kind,
        capabilities,
    }
}

pub struct MockInstance {
    journal: Journal,
}

impl GpuInstance for MockInstance {
    type Device = MockDevice;

    fn enumerate_adapters(&mut self) -> GpuResult<Vec<AdapterInfo>> {
        self.journal.push(Call::Enumerate);
        let script = self.journal.script.lock();
        if script.fail_enumerate {
            return Err(GpuError::Other("enumeration failed".into()));
        }
        Ok(script.adapters.clone())
    }

    fn create_device(self, adapter: &AdapterInfo) -> GpuResult<MockDevice> {
        self.journal.push(Call::CreateDevice(adapter.index));
        if self.journal.script.lock().fail_device {
            return Err(GpuError::Other("device creation failed".into()));
        }
        Ok(MockDevice {
            journal: self.journal,
            released: false,
        })
    }
}

pub struct MockDevice {
    journal: Journal,
    released: bool,
}

impl GpuDevice for MockDevice {
    fn create_presentation(&mut self, extent: Extent2D) -> GpuResult<Extent2D> {
        self.journal.push(Call::CreatePresentation(extent));
        if self.journal.script.lock().fail_presentation {
            return Err(GpuError::Other("swapchain creation failed".into()));
        }
        Ok(extent)
    }

    fn destroy_presentation(&mut self) {
        self.journal.push(Call::DestroyPresentation);
    }

    fn acquire(&mut self) -> GpuResult<Acquire> {
        self.journal.push(Call::Acquire);
        self.journal
            .script
            .lock()
            .acquire
            .pop_front()
            .unwrap_or(Ok(Acquire::Ready(0)))
    }

    fn draw(&mut self, image: u32, _clear_color: [f32; 4]) -> GpuResult<()> {
        self.journal.push(Call::Draw(image));
        match self.journal.script.lock().draw_error.take() {
            Some(msg) => Err(GpuError::Other(msg)),
            None => Ok(()),
        }
    }

    fn present(&mut self, image: u32) -> GpuResult<Present> {
        self.journal.push(Call::Present(image));
        self.journal
            .script
            .lock()
            .present
            .pop_front()
            .unwrap_or(Ok(Present::Presented))
    }

    fn wait_idle(&mut self) -> GpuResult<()> {
        self.journal.push(Call::WaitIdle);
        Ok(())
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.journal.push(Call::Release);
        }
    }
}

/// A window stand-in whose lifecycle backs the surface lease.
pub struct FakeWindow {
    pub lifecycle: Lifecycle,
    pub extent: Extent2D,
}

impl FakeWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            extent: Extent2D::new(width, height),
        }
    }

    pub fn handle(&self) -> NativeSurfaceHandle<'_> {
        NativeSurfaceHandle::new(
            RawDisplayHandle::Web(WebDisplayHandle::new()),
            RawWindowHandle::Web(WebWindowHandle::new(1)),
            self.extent,
            SurfaceLease::new(self.lifecycle.observer()),
        )
    }

    /// Simulates the window entering shutdown.
    pub fn close(&self) {
        self.lifecycle.try_begin_shutdown();
        self.lifecycle.mark_stopped();
    }
}
