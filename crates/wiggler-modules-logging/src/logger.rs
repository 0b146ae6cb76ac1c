use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use wiggler_core::{Component, ComponentHooks, LogConfig};

use crate::error::{LoggerError, LoggerResult};
use crate::writer::{drain_loop, LogLine};

const WRITER_THREAD_NAME: &str = "stringwiggler-log-writer";

/// Asynchronous append-only logger.
///
/// `write` only enqueues; a dedicated writer thread persists the queue in
/// arrival order. `stop` drains everything still queued before returning.
///
/// Cheap to clone; all clones share one queue and one writer. Dropping the
/// last clone stops the logger.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    hooks: ComponentHooks,
    destination: PathBuf,
    timestamps: bool,
    tx: Mutex<Option<Sender<LogLine>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl Logger {
    /// Opens `config.path` for append and starts the writer thread.
    pub fn start(config: &LogConfig) -> LoggerResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.path)
            .map_err(|source| LoggerError::Open {
                path: config.path.clone(),
                source,
            })?;

        Self::with_sink(file, config.path.clone(), config.timestamps)
    }

    /// Starts a logger over an arbitrary byte sink. `destination` is informational.
    pub fn with_sink<W>(sink: W, destination: PathBuf, timestamps: bool) -> LoggerResult<Self>
    where
        W: Write + Send + 'static,
    {
        let (tx, rx) = unbounded::<LogLine>();

        let inner = Arc::new(LoggerInner {
            hooks: ComponentHooks::new("logger"),
            destination,
            timestamps,
            tx: Mutex::new(Some(tx)),
            writer: Mutex::new(None),
        });

        let weak = Arc::downgrade(&inner);
        let handle = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || {
                match drain_loop(rx, sink) {
                    Ok(n) => log::trace!("log writer drained, {n} lines written"),
                    Err(e) => LoggerInner::writer_failed(&weak, e),
                }
            })
            .map_err(LoggerError::Spawn)?;

        *inner.writer.lock() = Some(handle);

        log::debug!("logger started: {}", inner.destination.display());
        Ok(Self { inner })
    }

    /// Enqueues `message` and returns immediately. No-op once the logger is not active.
    pub fn write(&self, message: impl Into<String>) {
        let tx = self.inner.tx.lock();
        if !self.inner.hooks.is_active() {
            return;
        }
        if let Some(tx) = tx.as_ref() {
            let _ = tx.send(LogLine::new(message.into(), self.inner.timestamps));
        }
    }

    /// Drains the queue, joins the writer and closes the destination. Idempotent.
    #[inline]
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// `true` once the writer thread has exited (or was never started).
    pub fn writer_finished(&self) -> bool {
        self.inner
            .writer
            .lock()
            .as_ref()
            .map_or(true, |h| h.is_finished())
    }
}

impl LoggerInner {
    fn stop(&self) {
        self.hooks.shutdown(
            || {},
            || {
                // Disconnecting the queue lets the writer finish the backlog and exit.
                drop(self.tx.lock().take());

                if let Some(handle) = self.writer.lock().take() {
                    if handle.thread().id() == thread::current().id() {
                        // Fatal write error on the writer itself: it exits on its own.
                        return;
                    }
                    if handle.join().is_err() {
                        log::error!("log writer thread panicked");
                    }
                }
            },
        );
    }

    fn writer_failed(weak: &Weak<LoggerInner>, err: std::io::Error) {
        log::error!("log write failed: {err}");

        let Some(inner) = weak.upgrade() else {
            return;
        };
        inner.hooks.log(
            log::Level::Error,
            &format!(
                "log destination {} failed: {err}",
                inner.destination.display()
            ),
        );
        inner.stop();
    }
}

impl Drop for LoggerInner {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Component for Logger {
    #[inline]
    fn hooks(&self) -> &ComponentHooks {
        &self.inner.hooks
    }

    #[inline]
    fn destroy(&self) {
        self.stop();
    }
}
