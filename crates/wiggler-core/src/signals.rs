use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::error::CoreResult;

/// Cooperative shutdown request (Ctrl-C and friends).
#[derive(Clone)]
pub struct ShutdownSignal {
    flag: Arc<AtomicBool>,
}

impl ShutdownSignal {
    #[inline]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline]
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Installs the process-wide Ctrl-C handler. `notify` runs on the signal thread.
    pub fn install_ctrlc<F>(&self, notify: F) -> CoreResult<()>
    where
        F: Fn() + Send + 'static,
    {
        let flag = self.flag.clone();
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::Release);
            notify();
        })?;
        Ok(())
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
