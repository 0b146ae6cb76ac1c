use thiserror::Error;

use crate::backend::Capabilities;

/// Failure reported by a GPU backend call.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("vulkan loader unavailable: {0}")]
    Loader(String),

    #[error("vulkan call failed: {0}")]
    Vk(#[from] ash::vk::Result),

    #[error("surface creation failed: {0}")]
    Surface(String),

    #[error("required instance layer or extension missing: {0}")]
    Missing(String),

    #[error("gpu error: {0}")]
    Other(String),
}

pub type GpuResult<T> = Result<T, GpuError>;

/// Startup failure of the engine. Runtime faults never surface as this type.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine is not active")]
    NotActive,

    #[error("engine is already initialized")]
    AlreadyInitialized,

    #[error("surface owner is no longer active")]
    SurfaceGone,

    #[error("gpu instance creation failed: {0}")]
    Instance(#[source] GpuError),

    #[error("gpu enumeration failed: {0}")]
    Enumerate(#[source] GpuError),

    #[error("no GPU satisfies the required capabilities {required:?} ({candidates} candidates)")]
    NoCapableDevice {
        required: Capabilities,
        candidates: usize,
    },

    #[error("logical device creation failed on \"{adapter}\": {source}")]
    Device {
        adapter: String,
        #[source]
        source: GpuError,
    },

    #[error("presentation resources creation failed: {0}")]
    Presentation(#[source] GpuError),
}

pub type EngineResult<T> = Result<T, EngineError>;
