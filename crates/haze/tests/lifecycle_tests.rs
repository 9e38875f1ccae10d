//! Integration tests for application lifecycle, frame updates and shutdown.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use haze::headless::HeadlessBackend;
use haze::{AppState, Application, FrameContext, Layer, WindowProps};

fn app() -> (Application, HeadlessBackend) {
    let backend = HeadlessBackend::new();
    let app = Application::new(backend.clone()).unwrap();
    (app, backend)
}

#[test]
fn test_shutdown_hooks_run_in_reverse_before_windows_close() {
    let (mut app, backend) = app();
    app.add_window(WindowProps::new("main")).unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    for name in ["first", "second", "third"] {
        let log = log.clone();
        let backend = backend.clone();
        app.add_shutdown_hook(move || {
            // Windows are still alive while hooks run.
            assert!(backend.destruction_log().is_empty());
            log.borrow_mut().push(name);
        });
    }

    app.shutdown();

    assert_eq!(*log.borrow(), ["third", "second", "first"]);
    assert_eq!(backend.destruction_log(), ["main"]);
    assert_eq!(app.state(), AppState::Stopped);
    assert_eq!(app.window_count(), 0);
    assert!(app.thread_pool().is_stopped());

    // Shutting down again runs nothing.
    app.shutdown();
    assert_eq!(log.borrow().len(), 3);
}

#[test]
fn test_drop_runs_shutdown() {
    let backend = HeadlessBackend::new();
    let ran = Rc::new(RefCell::new(false));
    {
        let mut app = Application::new(backend.clone()).unwrap();
        let root = app.add_window(WindowProps::new("root")).unwrap();
        app.add_window(WindowProps::new("child").with_parent(root)).unwrap();

        let ran = ran.clone();
        app.add_shutdown_hook(move || *ran.borrow_mut() = true);
    }

    assert!(*ran.borrow());
    assert_eq!(backend.destruction_log(), ["child", "root"]);
}

#[test]
fn test_run_without_windows_returns_immediately() {
    let (mut app, _backend) = app();
    app.run();
    assert_eq!(app.state(), AppState::Uninitialized);
    assert!(!app.tick());
}

#[test]
fn test_run_stops_when_last_window_closes() {
    let (mut app, backend) = app();
    app.add_window(WindowProps::new("main")).unwrap();
    backend.surface("main").unwrap().simulate_close();

    app.run();

    assert_eq!(app.state(), AppState::Stopped);
    assert_eq!(app.window_count(), 0);
}

#[test]
fn test_stop_prevents_further_ticks() {
    let (mut app, backend) = app();
    app.add_window(WindowProps::new("main")).unwrap();
    assert!(app.tick());

    app.stop();
    assert!(!app.tick());
    app.run();

    let surface = backend.surface("main").unwrap();
    assert_eq!(surface.swap_count(), 1);
}

#[test]
fn test_frame_callbacks_and_layers() {
    let (mut app, backend) = app();
    let id = app.add_window(WindowProps::new("main")).unwrap();

    let updates = Rc::new(RefCell::new(Vec::new()));
    let frames = Rc::new(RefCell::new(0));
    let layer_frames = Arc::new(AtomicUsize::new(0));

    struct FrameCounter {
        frames: Arc<AtomicUsize>,
    }

    impl Layer for FrameCounter {
        fn update(&mut self, frame: &mut FrameContext<'_>) {
            assert_eq!((frame.width, frame.height), (320, 200));
            self.frames.fetch_add(1, Ordering::SeqCst);
        }
    }

    {
        let window = app.window_mut(id).unwrap();
        let recorded = updates.clone();
        window.set_update_fn(move |delta| recorded.borrow_mut().push(delta));

        let rendered = frames.clone();
        window.set_render_fn(move |frame| {
            *rendered.borrow_mut() += 1;
            frame.renderer.clear();
            frame.renderer.clear();
        });

        window.layers_mut().push_overlay(FrameCounter {
            frames: layer_frames.clone(),
        });
    }

    let surface = backend.surface("main").unwrap();
    surface.simulate_resize(320, 200);
    for _ in 0..3 {
        assert!(app.tick());
    }

    assert_eq!(updates.borrow().len(), 3);
    assert!(updates.borrow().iter().all(|delta| *delta >= 0.0));
    assert_eq!(*frames.borrow(), 3);
    assert_eq!(layer_frames.load(Ordering::SeqCst), 3);
    assert_eq!(surface.clear_count(), 6);
    assert_eq!(surface.swap_count(), 3);
    assert_eq!(surface.bind_count(), 4);
    assert_eq!(surface.unbound_draws(), 0);
}

#[test]
fn test_default_render_clears() {
    let (mut app, backend) = app();
    app.add_window(WindowProps::new("main").with_vsync(false)).unwrap();
    app.tick();

    let surface = backend.surface("main").unwrap();
    assert_eq!(surface.clear_count(), 1);
    assert!(!surface.is_vsync());
}

#[test]
fn test_find_and_reparent_windows() {
    let (mut app, _backend) = app();
    let left = app.add_window(WindowProps::new("left")).unwrap();
    let right = app.add_window(WindowProps::new("right")).unwrap();
    let child = app.add_window(WindowProps::new("child").with_parent(left)).unwrap();

    assert_eq!(app.find_window("right"), Some(right));
    assert_eq!(app.find_window("missing"), None);
    assert_eq!(app.window_ids().len(), 3);

    app.set_parent(child, Some(right)).unwrap();
    assert_eq!(app.parent(child).unwrap(), Some(right));
    assert!(app.children(left).unwrap().is_empty());

    let mut titles = Vec::new();
    app.for_each_window(|_, window| titles.push(window.title().to_string()));
    titles.sort();
    assert_eq!(titles, ["child", "left", "right"]);
}
