use thiserror::Error;

#[derive(Debug, Error)]
pub enum WindowError {
    #[error("cannot create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("cannot create window: {0}")]
    Create(#[from] winit::error::OsError),

    #[error("platform never resumed; no window was created")]
    NotCreated,

    #[error("native handle unavailable: {0}")]
    Handle(#[from] raw_window_handle::HandleError),

    #[error("window is not active")]
    NotActive,
}

pub type WindowResult<T> = Result<T, WindowError>;
