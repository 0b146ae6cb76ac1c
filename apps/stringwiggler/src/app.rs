use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;

use wiggler_core::{AppConfig, Component, ShutdownSignal};
use wiggler_modules_logging::Logger;
use wiggler_modules_render_vulkan_ash::{EngineOptions, VulkanEngine, VulkanOptions};
use wiggler_platform_winit::{Window, WindowCloser};

pub const DEFAULT_CONFIG: &str = "stringwiggler.toml";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Outcome {
    Clean,
    /// A component stopped on its own before an orderly shutdown began.
    Fatal,
}

/// Tells orderly shutdown apart from a component dying on its own.
#[derive(Debug, Default)]
struct ShutdownState {
    orderly: AtomicBool,
    fatal: AtomicBool,
}

impl ShutdownState {
    fn request(&self) {
        self.orderly.store(true, Ordering::Release);
    }

    /// Called from every `onIsAboutToStop`. The first stop outside an orderly
    /// shutdown is recorded as fatal and turns the rest into an orderly one.
    fn component_stopping(&self, name: &str) {
        if !self.orderly.swap(true, Ordering::AcqRel) {
            self.fatal.store(true, Ordering::Release);
            log::error!("{name} stopped unexpectedly, shutting down");
        }
    }

    fn outcome(&self) -> Outcome {
        if self.fatal.load(Ordering::Acquire) {
            Outcome::Fatal
        } else {
            Outcome::Clean
        }
    }
}

fn startup_failed(logger: &Logger, what: &str, err: &dyn std::fmt::Display) {
    logger.write(format!("[ERROR] {what}: {err}"));
}

/// Builds Logger, Window and Engine, wires them together and runs until the window closes.
pub fn run(config_path: &Path) -> anyhow::Result<Outcome> {
    let config = AppConfig::load_or_default(config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;

    let logger = Logger::start(&config.log).context("starting logger")?;
    logger.write("[INFO] StringWiggler starting.");

    let shutdown = Arc::new(ShutdownState::default());

    let window = match Window::create(&config.window) {
        Ok(w) => w,
        Err(e) => {
            startup_failed(&logger, "Failed to create window", &e);
            logger.stop();
            return Err(e).context("creating window");
        }
    };
    let closer: WindowCloser = window.closer();

    let engine = Arc::new(VulkanEngine::new(EngineOptions::from_config(&config.render)));

    {
        let sink = logger.clone();
        window.set_on_log(move |m| sink.write(m));
        let sink = logger.clone();
        engine.set_on_log(move |m| sink.write(m));

        let e = engine.clone();
        window.set_on_draw(move || e.render());
        let e = engine.clone();
        window.set_on_resize(move |w, h| e.resize(w, h));

        let (s, c) = (shutdown.clone(), closer.clone());
        window.set_on_closing(move || {
            s.request();
            c.close();
        });

        let (s, e) = (shutdown.clone(), engine.clone());
        window.set_on_is_about_to_stop(move || {
            s.component_stopping("window");
            e.destroy();
        });

        let (s, c) = (shutdown.clone(), closer.clone());
        engine.set_on_is_about_to_stop(move || {
            s.component_stopping("engine");
            c.close();
        });

        let (s, c) = (shutdown.clone(), closer.clone());
        logger.set_on_is_about_to_stop(move || {
            s.component_stopping("logger");
            c.close();
        });
    }

    let signal = ShutdownSignal::new();
    {
        let (s, c) = (shutdown.clone(), closer.clone());
        if let Err(e) = signal.install_ctrlc(move || {
            s.request();
            c.close();
        }) {
            logger.write(format!("[WARNING] Ctrl-C handler unavailable: {e}"));
        }
    }

    let mut options = VulkanOptions::from_config(&config.render);
    if config.render.validation {
        let sink = logger.clone();
        options = options.with_layer_sink(move |m| sink.write(m));
    }

    let init = window
        .get_native_handle()
        .context("borrowing the native surface")
        .and_then(|surface| {
            engine
                .init_vulkan(&surface, options)
                .context("initializing the renderer")
        });
    if let Err(e) = init {
        startup_failed(&logger, "Startup aborted", &format!("{e:#}"));
        shutdown.request();
        engine.destroy();
        window.destroy();
        logger.stop();
        return Err(e);
    }

    logger.write("[INFO] Entering main loop.");
    window.run();

    if signal.is_requested() {
        logger.write("[INFO] Interrupted, shutting down.");
    }
    shutdown.request();
    engine.destroy();
    window.destroy();

    let stats = engine.stats();
    let outcome = shutdown.outcome();
    logger.write(format!(
        "[INFO] Stopped after {} frames ({} skipped, {} presentation builds).",
        stats.presented, stats.skipped, stats.presentation_builds
    ));
    logger.stop();

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orderly_shutdown_is_clean() {
        let s = ShutdownState::default();
        s.request();
        s.component_stopping("window");
        s.component_stopping("engine");
        assert_eq!(s.outcome(), Outcome::Clean);
    }

    #[test]
    fn unexpected_stop_is_fatal() {
        let s = ShutdownState::default();
        s.component_stopping("engine");
        s.component_stopping("window");
        assert_eq!(s.outcome(), Outcome::Fatal);
    }
}
