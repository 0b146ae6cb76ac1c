use std::ffi::{c_char, CStr, CString};
use std::sync::Arc;

use ash::vk;
use ash::Entry;

use wiggler_core::{AdapterKind, LogFn, NativeSurfaceHandle, PresentModePreference, RenderConfig};

use crate::backend::{AdapterInfo, Capabilities, GpuInstance};
use crate::error::{GpuError, GpuResult};

use super::debug::DebugMessenger;
use super::device::VulkanDevice;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Instance-level settings for the Vulkan backend.
#[derive(Clone)]
pub struct VulkanOptions {
    pub app_name: String,
    /// Enables `VK_LAYER_KHRONOS_validation` when it is installed.
    pub validation: bool,
    pub present_mode: PresentModePreference,
    /// Receives `[LAYER] ...` lines from the validation messenger.
    pub on_layer_message: Option<Arc<LogFn>>,
}

impl VulkanOptions {
    pub fn from_config(cfg: &RenderConfig) -> Self {
        Self {
            app_name: "StringWiggler".to_string(),
            validation: cfg.validation,
            present_mode: cfg.present_mode,
            on_layer_message: None,
        }
    }

    pub fn with_layer_sink<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_layer_message = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for VulkanOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VulkanOptions")
            .field("app_name", &self.app_name)
            .field("validation", &self.validation)
            .field("present_mode", &self.present_mode)
            .field("on_layer_message", &self.on_layer_message.is_some())
            .finish()
    }
}

pub(super) fn vk_present_mode(p: PresentModePreference) -> vk::PresentModeKHR {
    match p {
        PresentModePreference::Fifo => vk::PresentModeKHR::FIFO,
        PresentModePreference::Mailbox => vk::PresentModeKHR::MAILBOX,
        PresentModePreference::Immediate => vk::PresentModeKHR::IMMEDIATE,
    }
}

fn adapter_kind(t: vk::PhysicalDeviceType) -> AdapterKind {
    match t {
        vk::PhysicalDeviceType::DISCRETE_GPU => AdapterKind::Discrete,
        vk::PhysicalDeviceType::INTEGRATED_GPU => AdapterKind::Integrated,
        vk::PhysicalDeviceType::VIRTUAL_GPU => AdapterKind::Virtual,
        vk::PhysicalDeviceType::CPU => AdapterKind::Cpu,
        _ => AdapterKind::Other,
    }
}

/// Entry, instance, surface and optional messenger. Destroyed exactly once.
pub(super) struct InstanceCore {
    pub entry: Entry,
    pub instance: ash::Instance,
    pub surface_loader: ash::khr::surface::Instance,
    pub surface: vk::SurfaceKHR,
    debug: Option<DebugMessenger>,
    destroyed: bool,
}

impl InstanceCore {
    /// Caller guarantees every child object (device included) is gone.
    pub(super) unsafe fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        if self.surface != vk::SurfaceKHR::null() {
            self.surface_loader.destroy_surface(self.surface, None);
            self.surface = vk::SurfaceKHR::null();
        }
        if let Some(mut debug) = self.debug.take() {
            debug.destroy();
        }
        self.instance.destroy_instance(None);
    }
}

impl Drop for InstanceCore {
    fn drop(&mut self) {
        unsafe { self.destroy() };
    }
}

unsafe fn has_instance_layer(entry: &Entry, name: &CStr) -> bool {
    match entry.enumerate_instance_layer_properties() {
        Ok(layers) => layers
            .iter()
            .any(|l| l.layer_name_as_c_str().is_ok_and(|n| n == name)),
        Err(_) => false,
    }
}

/// Vulkan implementation of [`GpuInstance`] bound to one window surface.
pub struct VulkanInstance {
    core: InstanceCore,
    options: VulkanOptions,
    physical_devices: Vec<vk::PhysicalDevice>,
    queue_families: Vec<Option<u32>>,
}

impl VulkanInstance {
    /// Loads Vulkan, creates the instance and a surface for `surface`.
    pub fn new(surface: &NativeSurfaceHandle<'_>, options: VulkanOptions) -> GpuResult<Self> {
        if !surface.is_valid() {
            return Err(GpuError::Surface("window is no longer active".into()));
        }
        unsafe { Self::create(surface, options) }
    }

    unsafe fn create(surface: &NativeSurfaceHandle<'_>, options: VulkanOptions) -> GpuResult<Self> {
        let entry = Entry::load().map_err(|e| GpuError::Loader(e.to_string()))?;

        let app_name = CString::new(options.app_name.as_str())
            .map_err(|e| GpuError::Other(format!("invalid application name: {e}")))?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 0, 1, 0))
            .engine_name(&app_name)
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_2);

        let display = surface.raw_display();
        let mut extension_names: Vec<*const c_char> =
            ash_window::enumerate_required_extensions(display)
                .map_err(|e| GpuError::Surface(e.to_string()))?
                .to_vec();

        let enable_validation =
            options.validation && has_instance_layer(&entry, VALIDATION_LAYER);
        if options.validation && !enable_validation {
            log::warn!("Vulkan validation layer not found; running without validation.");
        }
        let enable_messenger = enable_validation && options.on_layer_message.is_some();
        if enable_messenger {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let layer_ptrs = [VALIDATION_LAYER.as_ptr()];
        let mut create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extension_names);
        if enable_validation {
            create_info = create_info.enabled_layer_names(&layer_ptrs);
        }

        let instance = entry.create_instance(&create_info, None)?;
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        let mut core = InstanceCore {
            entry,
            instance,
            surface_loader,
            surface: vk::SurfaceKHR::null(),
            debug: None,
            destroyed: false,
        };

        if let (true, Some(sink)) = (enable_messenger, options.on_layer_message.clone()) {
            core.debug = Some(DebugMessenger::new(&core.entry, &core.instance, sink)?);
        }

        core.surface = ash_window::create_surface(
            &core.entry,
            &core.instance,
            display,
            surface.raw_window(),
            None,
        )?;

        Ok(Self {
            core,
            options,
            physical_devices: Vec::new(),
            queue_families: Vec::new(),
        })
    }

    unsafe fn query_capabilities(&self, pd: vk::PhysicalDevice) -> GpuResult<(Capabilities, Option<u32>)> {
        let mut caps = Capabilities::empty();
        let mut family = None;

        let families = self
            .core
            .instance
            .get_physical_device_queue_family_properties(pd);
        for (i, f) in families.iter().enumerate() {
            let i = i as u32;
            let graphics = f.queue_flags.contains(vk::QueueFlags::GRAPHICS);
            let present = self
                .core
                .surface_loader
                .get_physical_device_surface_support(pd, i, self.core.surface)?;
            if graphics {
                caps |= Capabilities::GRAPHICS;
            }
            if present {
                caps |= Capabilities::PRESENT;
            }
            if graphics && present && family.is_none() {
                family = Some(i);
            }
        }
        if family.is_none() {
            // Graphics and present on different families is not supported.
            caps.remove(Capabilities::PRESENT);
        }

        let extensions = self
            .core
            .instance
            .enumerate_device_extension_properties(pd)?;
        if extensions
            .iter()
            .any(|e| e.extension_name_as_c_str().is_ok_and(|n| n == ash::khr::swapchain::NAME))
        {
            caps |= Capabilities::SWAPCHAIN;
        }

        Ok((caps, family))
    }
}

impl GpuInstance for VulkanInstance {
    type Device = VulkanDevice;

    fn enumerate_adapters(&mut self) -> GpuResult<Vec<AdapterInfo>> {
        let physical = unsafe { self.core.instance.enumerate_physical_devices()? };

        let mut adapters = Vec::with_capacity(physical.len());
        let mut families = Vec::with_capacity(physical.len());

        for (index, &pd) in physical.iter().enumerate() {
            let props = unsafe { self.core.instance.get_physical_device_properties(pd) };
            let name = props
                .device_name_as_c_str()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|_| format!("device #{index}"));

            let (capabilities, family) = unsafe { self.query_capabilities(pd)? };
            log::debug!("gpu #{index} \"{name}\": {capabilities:?}");

            adapters.push(AdapterInfo {
                index,
                name,
                kind: adapter_kind(props.device_type),
                capabilities,
            });
            families.push(family);
        }

        self.physical_devices = physical;
        self.queue_families = families;
        Ok(adapters)
    }

    fn create_device(self, adapter: &AdapterInfo) -> GpuResult<VulkanDevice> {
        let physical_device = self
            .physical_devices
            .get(adapter.index)
            .copied()
            .ok_or_else(|| GpuError::Other(format!("unknown adapter index {}", adapter.index)))?;
        let family = self
            .queue_families
            .get(adapter.index)
            .copied()
            .flatten()
            .ok_or_else(|| {
                GpuError::Other(format!("\"{}\" has no graphics+present queue", adapter.name))
            })?;

        unsafe {
            VulkanDevice::new(
                self.core,
                physical_device,
                family,
                vk_present_mode(self.options.present_mode),
            )
        }
    }
}
