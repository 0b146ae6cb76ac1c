mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use support::{gpu, Call, FakeWindow, Journal, MockInstance};
use wiggler_core::{AdapterKind, Component, DevicePreference, Extent2D, LifecycleState};
use wiggler_modules_render_vulkan_ash::{
    Acquire, Capabilities, Engine, EngineError, EngineOptions, GpuError, Present,
};

type MockEngine = Engine<MockInstance>;

fn started(window: &FakeWindow) -> (Arc<MockEngine>, Journal) {
    let journal = Journal::single_gpu();
    let engine = Arc::new(MockEngine::new(EngineOptions::default()));
    engine
        .init(journal.instance(), &window.handle())
        .expect("init");
    (engine, journal)
}

fn is_create(c: &Call) -> bool {
    matches!(c, Call::CreatePresentation(_))
}

#[test]
fn init_builds_presentation_at_surface_extent() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);

    assert_eq!(
        journal.calls(),
        vec![
            Call::Enumerate,
            Call::CreateDevice(0),
            Call::CreatePresentation(Extent2D::new(800, 600)),
        ]
    );
    assert_eq!(engine.stats().presentation_builds, 1);
    assert_eq!(engine.adapter().map(|a| a.name), Some("Mock GPU".to_string()));
}

#[test]
fn render_presents_one_frame() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);
    journal.clear();

    engine.render();

    assert_eq!(
        journal.calls(),
        vec![Call::Acquire, Call::Draw(0), Call::Present(0)]
    );
    assert_eq!(engine.stats().presented, 1);
}

#[test]
fn two_stale_acquires_recover_without_fatal() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);
    {
        let mut s = journal.script.lock();
        s.acquire.push_back(Ok(Acquire::Stale));
        s.acquire.push_back(Ok(Acquire::Stale));
    }
    journal.clear();

    engine.render();
    engine.render();
    engine.render();

    assert_eq!(engine.state(), LifecycleState::Active);
    assert_eq!(journal.count(is_create), 2);
    assert_eq!(journal.count(|c| matches!(c, Call::Present(_))), 1);

    let stats = engine.stats();
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.presented, 1);
}

#[test]
fn zero_extent_skips_without_creating_anything() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);
    journal.clear();

    engine.resize(0, 600);
    for _ in 0..5 {
        engine.render();
    }
    assert!(journal.calls().is_empty());
    assert_eq!(engine.stats().skipped, 5);

    engine.resize(1024, 768);
    engine.render();
    assert_eq!(
        journal.calls(),
        vec![
            Call::CreatePresentation(Extent2D::new(1024, 768)),
            Call::Acquire,
            Call::Draw(0),
            Call::Present(0),
        ]
    );
}

#[test]
fn minimized_at_init_defers_presentation() {
    let window = FakeWindow::new(0, 0);
    let (engine, journal) = started(&window);
    assert_eq!(journal.count(is_create), 0);

    engine.render();
    assert_eq!(journal.count(is_create), 0);

    engine.resize(320, 240);
    engine.render();
    assert_eq!(journal.count(is_create), 1);
    assert_eq!(engine.stats().presented, 1);
}

#[test]
fn resize_rebuilds_exactly_once_before_next_frame() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);
    journal.clear();

    engine.resize(640, 480);
    engine.resize(640, 480);
    engine.render();
    engine.render();

    assert_eq!(journal.count(is_create), 1);
    assert_eq!(journal.calls()[0], Call::CreatePresentation(Extent2D::new(640, 480)));
    assert_eq!(engine.extent(), Extent2D::new(640, 480));
}

#[test]
fn stale_or_suboptimal_present_rebuilds_on_next_frame() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);
    {
        let mut s = journal.script.lock();
        s.present.push_back(Ok(Present::Suboptimal));
        s.present.push_back(Ok(Present::Stale));
    }
    journal.clear();

    engine.render();
    assert_eq!(journal.count(is_create), 0);
    engine.render();
    assert_eq!(journal.count(is_create), 1);
    engine.render();
    assert_eq!(journal.count(is_create), 2);
    engine.render();
    assert_eq!(journal.count(is_create), 2);

    assert_eq!(engine.state(), LifecycleState::Active);
    assert_eq!(engine.stats().presented, 3);
    assert_eq!(engine.stats().skipped, 1);
}

#[test]
fn stale_present_counts_as_skipped_frame() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);
    journal.script.lock().present.push_back(Ok(Present::Stale));

    engine.render();

    let stats = engine.stats();
    assert_eq!(stats.presented, 0);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.presentation_builds, 1);
    assert_eq!(engine.state(), LifecycleState::Active);
}

#[test]
fn invalid_surface_lease_makes_render_a_no_op() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);
    journal.clear();

    window.close();
    engine.render();
    engine.resize(10, 10);
    engine.render();

    assert!(journal.calls().is_empty());
    assert_eq!(engine.state(), LifecycleState::Active);
}

#[test]
fn fatal_gpu_error_destroys_engine_and_notifies() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);
    journal
        .script
        .lock()
        .acquire
        .push_back(Err(GpuError::Other("device lost".into())));

    let about = Arc::new(AtomicUsize::new(0));
    let lines = Arc::new(Mutex::new(Vec::<String>::new()));
    {
        let about = about.clone();
        engine.set_on_is_about_to_stop(move || {
            about.fetch_add(1, Ordering::SeqCst);
        });
        let lines = lines.clone();
        engine.set_on_log(move |m| lines.lock().push(m.to_string()));
    }
    journal.clear();

    engine.render();

    assert_eq!(engine.state(), LifecycleState::Stopped);
    assert_eq!(about.load(Ordering::SeqCst), 1);
    assert_eq!(
        journal.calls(),
        vec![
            Call::Acquire,
            Call::WaitIdle,
            Call::DestroyPresentation,
            Call::Release,
        ]
    );
    assert!(lines.lock()[0].starts_with("[ERROR] "));
    assert!(lines.lock()[0].contains("device lost"));

    journal.clear();
    engine.render();
    assert!(journal.calls().is_empty());
}

#[test]
fn draw_failure_is_fatal_too() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);
    journal.script.lock().draw_error = Some("queue submit failed".into());

    engine.render();

    assert_eq!(engine.state(), LifecycleState::Stopped);
    assert_eq!(journal.count(|c| *c == Call::Release), 1);
}

#[test]
fn destroy_twice_releases_once() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);

    let stopped = Arc::new(AtomicUsize::new(0));
    {
        let stopped = stopped.clone();
        engine.set_on_has_stopped(move || {
            stopped.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let j = journal.clone();
        engine.set_on_is_about_to_stop(move || j.push(Call::Note("about to stop")));
    }
    journal.clear();

    engine.destroy();
    engine.destroy();

    assert_eq!(
        journal.calls(),
        vec![
            Call::Note("about to stop"),
            Call::WaitIdle,
            Call::DestroyPresentation,
            Call::Release,
        ]
    );
    assert_eq!(stopped.load(Ordering::SeqCst), 1);
    assert_eq!(engine.state(), LifecycleState::Stopped);
    assert!(engine.adapter().is_none());
}

#[test]
fn concurrent_destroy_releases_once() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);
    journal.clear();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let e = engine.clone();
            std::thread::spawn(move || e.destroy())
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(journal.count(|c| *c == Call::Release), 1);
    assert_eq!(journal.count(|c| *c == Call::WaitIdle), 1);
}

#[test]
fn destroy_from_own_about_to_stop_is_ignored() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);
    {
        let weak = Arc::downgrade(&engine);
        engine.set_on_is_about_to_stop(move || {
            if let Some(e) = weak.upgrade() {
                e.destroy();
                e.render();
            }
        });
    }
    journal.clear();

    engine.destroy();

    assert_eq!(journal.count(|c| *c == Call::Release), 1);
    assert_eq!(journal.count(|c| *c == Call::Acquire), 0);
}

#[test]
fn init_without_capable_device_is_fatal() {
    let window = FakeWindow::new(800, 600);
    let journal = Journal::with_adapters(vec![gpu(
        0,
        "llvmpipe",
        AdapterKind::Cpu,
        Capabilities::GRAPHICS,
    )]);
    let engine = MockEngine::new(EngineOptions::default());

    let err = engine
        .init(journal.instance(), &window.handle())
        .unwrap_err();

    assert!(matches!(err, EngineError::NoCapableDevice { candidates: 1, .. }));
    assert_eq!(engine.state(), LifecycleState::Stopped);
    assert_eq!(journal.calls(), vec![Call::Enumerate]);
}

#[test]
fn init_device_failure_leaves_nothing_behind() {
    let window = FakeWindow::new(800, 600);
    let journal = Journal::single_gpu();
    journal.script.lock().fail_device = true;
    let engine = MockEngine::new(EngineOptions::default());

    let err = engine
        .init(journal.instance(), &window.handle())
        .unwrap_err();

    assert!(matches!(err, EngineError::Device { .. }));
    assert!(err.to_string().contains("Mock GPU"));
    assert!(engine.adapter().is_none());
    assert_eq!(engine.state(), LifecycleState::Stopped);

    journal.clear();
    engine.render();
    engine.destroy();
    assert!(journal.calls().is_empty());
}

#[test]
fn init_presentation_failure_releases_device() {
    let window = FakeWindow::new(800, 600);
    let journal = Journal::single_gpu();
    journal.script.lock().fail_presentation = true;
    let engine = MockEngine::new(EngineOptions::default());

    let err = engine
        .init(journal.instance(), &window.handle())
        .unwrap_err();

    assert!(matches!(err, EngineError::Presentation(_)));
    assert_eq!(journal.count(|c| *c == Call::Release), 1);
    assert_eq!(engine.state(), LifecycleState::Stopped);
}

#[test]
fn init_on_closed_window_fails() {
    let window = FakeWindow::new(800, 600);
    window.close();
    let journal = Journal::single_gpu();
    let engine = MockEngine::new(EngineOptions::default());

    let err = engine
        .init(journal.instance(), &window.handle())
        .unwrap_err();
    assert!(matches!(err, EngineError::SurfaceGone));
    assert!(journal.calls().is_empty());
}

#[test]
fn init_twice_is_rejected() {
    let window = FakeWindow::new(800, 600);
    let (engine, journal) = started(&window);

    let err = engine
        .init(journal.instance(), &window.handle())
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyInitialized));
    assert_eq!(engine.state(), LifecycleState::Active);
}

#[test]
fn init_reports_devices_and_selection() {
    let window = FakeWindow::new(800, 600);
    let journal = Journal::with_adapters(vec![
        gpu(0, "Intel UHD 630", AdapterKind::Integrated, Capabilities::REQUIRED),
        gpu(1, "NVIDIA RTX 3070", AdapterKind::Discrete, Capabilities::REQUIRED),
    ]);
    let engine = MockEngine::new(EngineOptions {
        preference: DevicePreference {
            name: None,
            kind: Some(AdapterKind::Discrete),
        },
        ..EngineOptions::default()
    });

    let lines = Arc::new(Mutex::new(Vec::<String>::new()));
    {
        let lines = lines.clone();
        engine.set_on_log(move |m| lines.lock().push(m.to_string()));
    }

    engine.init(journal.instance(), &window.handle()).unwrap();

    let lines = lines.lock();
    assert_eq!(lines[0], "[INFO] Found supported GPU devices:");
    assert!(lines[1].contains("\"Intel UHD 630\""));
    assert!(lines[2].contains("\"NVIDIA RTX 3070\""));
    assert_eq!(lines[3], "[INFO] Selected \"NVIDIA RTX 3070\" for rendering.");
    assert!(journal.calls().contains(&Call::CreateDevice(1)));
}
