//! Rendering component of StringWiggler.
//!
//! [`Engine`] owns the presentation policy (stale targets, zero extents,
//! fatal errors) and drives any [`GpuDevice`]. The [`vulkan`] module is the
//! ash-based backend used by the application.

mod backend;
mod engine;
mod error;
mod select;
pub mod vulkan;

pub use crate::backend::{Acquire, AdapterInfo, Capabilities, GpuDevice, GpuInstance, Present};
pub use crate::engine::{Engine, EngineOptions, FrameStats};
pub use crate::error::{EngineError, EngineResult, GpuError, GpuResult};
pub use crate::select::select_adapter;
pub use crate::vulkan::{VulkanEngine, VulkanInstance, VulkanOptions};
