use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Platform-independent subset of window events the component reacts to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceEvent {
    Redraw,
    Resized { width: u32, height: u32 },
    CloseRequested,
}

/// Maps a winit event onto a [`SurfaceEvent`]. Everything else is ignored.
pub fn translate(event: &WindowEvent, close_on_escape: bool) -> Option<SurfaceEvent> {
    match event {
        WindowEvent::RedrawRequested => Some(SurfaceEvent::Redraw),
        WindowEvent::Resized(size) => Some(SurfaceEvent::Resized {
            width: size.width,
            height: size.height,
        }),
        WindowEvent::CloseRequested | WindowEvent::Destroyed => Some(SurfaceEvent::CloseRequested),
        WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    state: ElementState::Pressed,
                    physical_key: PhysicalKey::Code(KeyCode::Escape),
                    repeat: false,
                    ..
                },
            ..
        } if close_on_escape => Some(SurfaceEvent::CloseRequested),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn resize_carries_physical_extent() {
        let ev = WindowEvent::Resized(PhysicalSize::new(1280, 0));
        assert_eq!(
            translate(&ev, true),
            Some(SurfaceEvent::Resized {
                width: 1280,
                height: 0
            })
        );
    }

    #[test]
    fn close_and_destroy_both_request_close() {
        assert_eq!(
            translate(&WindowEvent::CloseRequested, false),
            Some(SurfaceEvent::CloseRequested)
        );
        assert_eq!(
            translate(&WindowEvent::Destroyed, false),
            Some(SurfaceEvent::CloseRequested)
        );
    }

    #[test]
    fn redraw_and_noise() {
        assert_eq!(
            translate(&WindowEvent::RedrawRequested, true),
            Some(SurfaceEvent::Redraw)
        );
        assert_eq!(translate(&WindowEvent::Focused(true), true), None);
    }
}
