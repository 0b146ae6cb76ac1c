mod debug;
mod device;
mod instance;
mod swapchain;

pub use device::VulkanDevice;
pub use instance::{VulkanInstance, VulkanOptions};

use wiggler_core::{Component, NativeSurfaceHandle};

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};

/// Engine driving the ash backend.
pub type VulkanEngine = Engine<VulkanInstance>;

impl Engine<VulkanInstance> {
    /// Creates the Vulkan instance for `surface` and initializes the engine with it.
    pub fn init_vulkan(
        &self,
        surface: &NativeSurfaceHandle<'_>,
        options: VulkanOptions,
    ) -> EngineResult<()> {
        if !self.is_active() {
            return Err(EngineError::NotActive);
        }
        match VulkanInstance::new(surface, options) {
            Ok(instance) => self.init(instance, surface),
            Err(e) => Err(self.abort_init(EngineError::Instance(e))),
        }
    }
}
