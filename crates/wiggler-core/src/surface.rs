use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::lifecycle::LifecycleObserver;

/// Drawable extent in physical pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Extent2D {
    pub width: u32,
    pub height: u32,
}

impl Extent2D {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Minimized windows report a zero extent in at least one dimension.
    #[inline]
    pub const fn is_zero(self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    const fn pack(self) -> u64 {
        ((self.width as u64) << 32) | self.height as u64
    }

    #[inline]
    const fn unpack(v: u64) -> Self {
        Self {
            width: (v >> 32) as u32,
            height: v as u32,
        }
    }
}

/// Extent written by the window thread and read by the renderer.
#[derive(Debug, Default)]
pub struct SharedExtent(AtomicU64);

impl SharedExtent {
    #[inline]
    pub fn new(extent: Extent2D) -> Self {
        Self(AtomicU64::new(extent.pack()))
    }

    #[inline]
    pub fn load(&self) -> Extent2D {
        Extent2D::unpack(self.0.load(Ordering::Acquire))
    }

    /// Stores `extent`, returning the previous value.
    #[inline]
    pub fn swap(&self, extent: Extent2D) -> Extent2D {
        Extent2D::unpack(self.0.swap(extent.pack(), Ordering::AcqRel))
    }
}

/// Proof that the surface owner is still alive.
///
/// A lease never keeps the surface alive; it only reports whether the owning
/// window is still `Active`. Once it reports `false` the raw handles must not
/// be touched again.
#[derive(Debug, Clone)]
pub struct SurfaceLease {
    owner: LifecycleObserver,
}

impl SurfaceLease {
    #[inline]
    pub fn new(owner: LifecycleObserver) -> Self {
        Self { owner }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.owner.is_active()
    }
}

/// Borrowed view of the window's native surface.
///
/// Owned by the window, borrowed by the renderer for the duration of `'a`.
/// The raw handles are only meaningful while [`SurfaceLease::is_valid`] holds.
#[derive(Debug, Clone)]
pub struct NativeSurfaceHandle<'a> {
    display: RawDisplayHandle,
    window: RawWindowHandle,
    extent: Extent2D,
    lease: SurfaceLease,
    _owner: PhantomData<&'a ()>,
}

impl<'a> NativeSurfaceHandle<'a> {
    #[inline]
    pub fn new(
        display: RawDisplayHandle,
        window: RawWindowHandle,
        extent: Extent2D,
        lease: SurfaceLease,
    ) -> Self {
        Self {
            display,
            window,
            extent,
            lease,
            _owner: PhantomData,
        }
    }

    #[inline]
    pub fn raw_display(&self) -> RawDisplayHandle {
        self.display
    }

    #[inline]
    pub fn raw_window(&self) -> RawWindowHandle {
        self.window
    }

    /// Extent at the time the handle was borrowed.
    #[inline]
    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    #[inline]
    pub fn lease(&self) -> &SurfaceLease {
        &self.lease
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.lease.is_valid()
    }
}
