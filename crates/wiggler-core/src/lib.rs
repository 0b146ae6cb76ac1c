//! Lifecycle core shared by the StringWiggler components.
//!
//! Every component (logger, window, engine) carries a [`ComponentHooks`]:
//! an atomic [`Lifecycle`] flag plus the `onLog` / `onIsAboutToStop` /
//! `onHasStopped` slots. Teardown always goes through
//! [`ComponentHooks::shutdown`], which runs at most once per component.

pub mod callback;
pub mod component;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod signals;
pub mod surface;

pub use crate::callback::{LogFn, ResizeFn, SignalFn, Slot};
pub use crate::component::{level_tag, Component, ComponentHooks};
pub use crate::config::{
    AdapterKind, AppConfig, DevicePreference, LogConfig, PresentModePreference, RenderConfig,
    WindowConfig,
};
pub use crate::error::{CoreError, CoreResult};
pub use crate::lifecycle::{Lifecycle, LifecycleObserver, LifecycleState};
pub use crate::signals::ShutdownSignal;
pub use crate::surface::{Extent2D, NativeSurfaceHandle, SharedExtent, SurfaceLease};

pub use raw_window_handle;
