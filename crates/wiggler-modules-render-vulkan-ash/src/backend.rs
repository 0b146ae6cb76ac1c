use bitflags::bitflags;

use wiggler_core::{AdapterKind, Extent2D};

use crate::error::GpuResult;

bitflags! {
    /// What a physical device can do for this application.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct Capabilities: u32 {
        const GRAPHICS  = 1 << 0;
        const PRESENT   = 1 << 1;
        const SWAPCHAIN = 1 << 2;
    }
}

impl Capabilities {
    /// The set every device must satisfy to render into a window.
    pub const REQUIRED: Self = Self::GRAPHICS.union(Self::PRESENT).union(Self::SWAPCHAIN);
}

/// One enumerated physical device.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AdapterInfo {
    /// Position in enumeration order.
    pub index: usize,
    pub name: String,
    pub kind: AdapterKind,
    pub capabilities: Capabilities,
}

impl AdapterInfo {
    #[inline]
    pub fn satisfies(&self, required: Capabilities) -> bool {
        self.capabilities.contains(required)
    }
}

/// Result of asking for the next presentation target.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Acquire {
    Ready(u32),
    /// Presentation resources no longer match the surface; recreate and skip the frame.
    Stale,
}

/// Result of queueing a frame for presentation.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Present {
    Presented,
    Stale,
    Suboptimal,
}

/// Entry point of a backend: enumerates devices and opens one of them.
pub trait GpuInstance {
    type Device: GpuDevice;

    fn enumerate_adapters(&mut self) -> GpuResult<Vec<AdapterInfo>>;

    /// Consumes the instance; on error everything it owned is released.
    fn create_device(self, adapter: &AdapterInfo) -> GpuResult<Self::Device>;
}

/// A logical device bound to one surface.
///
/// Calls arrive from a single thread at a time; the engine serializes them.
pub trait GpuDevice: Send {
    /// Builds presentation resources for `extent`, replacing any previous ones.
    /// Returns the extent actually used (clamped by the surface).
    fn create_presentation(&mut self, extent: Extent2D) -> GpuResult<Extent2D>;

    fn destroy_presentation(&mut self);

    fn acquire(&mut self) -> GpuResult<Acquire>;

    fn draw(&mut self, image: u32, clear_color: [f32; 4]) -> GpuResult<()>;

    fn present(&mut self, image: u32) -> GpuResult<Present>;

    /// Blocks until the GPU has finished all submitted work.
    fn wait_idle(&mut self) -> GpuResult<()>;

    /// Destroys every handle. Callers wait for idle first. Idempotent.
    fn release(&mut self);
}
