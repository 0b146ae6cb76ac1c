//! Native window component over winit.
//!
//! [`Window`] owns the platform window and its event loop, turns platform
//! events into `onDraw` / `onResize` / `onClosing`, and lends its native
//! surface to the renderer through [`wiggler_core::NativeSurfaceHandle`].

mod error;
mod events;
mod shared;
mod window;

pub use crate::error::{WindowError, WindowResult};
pub use crate::events::{translate, SurfaceEvent};
pub use crate::shared::WindowCloser;
pub use crate::window::Window;
