//! Integration tests for the dispatch loop, driven through the headless backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use haze::headless::HeadlessBackend;
use haze::{
    Application, ApplicationConfig, Event, EventDispatcher, EventKind, EventType, Key, KeyAction,
    Layer, ModifierKey, MouseButton, MouseButtonAction, WindowId, WindowProps,
};
use parking_lot::Mutex;

fn app() -> (Application, HeadlessBackend) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let backend = HeadlessBackend::new();
    let app = Application::with_config(ApplicationConfig::with_threads(4), backend.clone()).unwrap();
    (app, backend)
}

/// root -> {a, b}, a -> {a1, a2}
fn window_tree(app: &mut Application) -> [WindowId; 5] {
    let root = app.add_window(WindowProps::new("root")).unwrap();
    let a = app.add_window(WindowProps::new("a").with_parent(root)).unwrap();
    let b = app.add_window(WindowProps::new("b").with_parent(root)).unwrap();
    let a1 = app.add_window(WindowProps::new("a1").with_parent(a)).unwrap();
    let a2 = app.add_window(WindowProps::new("a2").with_parent(a)).unwrap();
    [root, a, b, a1, a2]
}

/// Records the events it sees as strings.
struct EventLog {
    seen: Arc<Mutex<Vec<String>>>,
}

impl Layer for EventLog {
    fn name(&self) -> &str {
        "event-log"
    }

    fn on_event(&mut self, event: &Event) {
        self.seen.lock().push(event.kind().to_string());
    }
}

#[test]
fn test_close_cascade_destroys_children_first() {
    let (mut app, backend) = app();
    let [root, ..] = window_tree(&mut app);
    app.tick();

    backend.surface("root").unwrap().simulate_close();
    app.run();

    assert_eq!(backend.destruction_log(), ["a2", "a1", "b", "a", "root"]);
    assert_eq!(app.window_count(), 0);
    assert!(app.window(root).is_none());
    assert_eq!(app.focused_window(), None);
    assert!(!app.is_running());
}

#[test]
fn test_close_subtree_leaves_rest_alive() {
    let (mut app, backend) = app();
    let [root, a, b, a1, a2] = window_tree(&mut app);
    app.tick();

    app.close_window(a).unwrap();
    assert!(app.tick());

    assert_eq!(backend.destruction_log(), ["a2", "a1", "a"]);
    for gone in [a, a1, a2] {
        assert!(app.window(gone).is_none());
    }
    assert_eq!(app.children(root).unwrap(), [b]);
    assert!(app.is_running());
}

#[test]
fn test_close_leaf_detaches_from_parent() {
    let (mut app, backend) = app();
    let [_root, a, _b, a1, a2] = window_tree(&mut app);
    app.tick();

    backend.surface("a1").unwrap().simulate_close();
    app.tick();

    assert_eq!(backend.destruction_log(), ["a1"]);
    assert_eq!(app.children(a).unwrap(), [a2]);
    assert!(app.window(a1).is_none());
}

#[test]
fn test_child_added_before_close_is_dispatched_joins_cascade() {
    let (mut app, backend) = app();
    let root = app.add_window(WindowProps::new("root")).unwrap();
    app.add_window(WindowProps::new("a").with_parent(root)).unwrap();
    app.tick();

    app.close_window(root).unwrap();
    app.add_window(WindowProps::new("late").with_parent(root)).unwrap();
    app.run();

    assert_eq!(backend.destruction_log(), ["late", "a", "root"]);
}

#[test]
fn test_focus_tracking() {
    let (mut app, backend) = app();
    let first = app.add_window(WindowProps::new("first")).unwrap();
    let second = app.add_window(WindowProps::new("second")).unwrap();
    app.tick();

    // Both windows queued a focus event on creation; the last one wins.
    assert_eq!(app.focused_window(), Some(second));

    backend.surface("first").unwrap().simulate_focus(true);
    app.tick();
    assert_eq!(app.focused_window(), Some(first));

    // Losing focus on a window that does not have it changes nothing.
    backend.surface("second").unwrap().simulate_focus(false);
    app.tick();
    assert_eq!(app.focused_window(), Some(first));

    backend.surface("first").unwrap().simulate_focus(false);
    app.tick();
    assert_eq!(app.focused_window(), None);
}

#[test]
fn test_focus_on_destroyed_window_is_ignored() {
    let (mut app, _backend) = app();
    let gone = app.add_window(WindowProps::new("gone")).unwrap();
    let kept = app.add_window(WindowProps::new("kept")).unwrap();
    app.tick();

    app.close_window(gone).unwrap();
    app.tick();

    app.event_queue().emplace(EventKind::WindowFocus, gone);
    app.tick();
    assert_eq!(app.focused_window(), Some(kept));
}

#[test]
fn test_closing_focused_window_clears_focus() {
    let (mut app, backend) = app();
    app.add_window(WindowProps::new("other")).unwrap();
    let focused = app.add_window(WindowProps::new("focused")).unwrap();
    app.tick();
    assert_eq!(app.focused_window(), Some(focused));

    backend.surface("focused").unwrap().simulate_close();
    app.tick();

    assert_eq!(app.focused_window(), None);
    assert_eq!(app.window_count(), 1);
}

#[test]
fn test_resize_reaches_renderer_inside_bound_context() {
    let (mut app, backend) = app();
    let id = app.add_window(WindowProps::new("main")).unwrap();
    app.tick();

    let surface = backend.surface("main").unwrap();
    surface.simulate_resize(800, 600);
    assert!(surface.resizes().is_empty());

    app.tick();

    let window = app.window(id).unwrap();
    assert_eq!((window.width(), window.height()), (800, 600));
    assert_eq!(window.pending_content_updates(), 0);
    assert_eq!(surface.resizes(), [(800, 600)]);
    assert_eq!(surface.unbound_draws(), 0);
    assert!(!surface.is_bound());
}

#[test]
fn test_events_for_destroyed_windows_skip_window_handling() {
    let (mut app, backend) = app();
    let gone = app.add_window(WindowProps::new("gone")).unwrap();
    app.add_window(WindowProps::new("kept")).unwrap();
    app.tick();

    let gone_surface = backend.surface("gone").unwrap();
    app.close_window(gone).unwrap();
    app.tick();

    let queue = app.event_queue().clone();
    queue.emplace(EventKind::WindowResize { width: 1, height: 1 }, gone);
    queue.emplace(EventKind::WindowClose, gone);
    assert_eq!(app.dispatch_events(), 2);

    assert!(gone_surface.resizes().is_empty());
    assert_eq!(backend.destruction_log(), ["gone"]);
    assert_eq!(app.window_count(), 1);
}

#[test]
fn test_window_moved_updates_position() {
    let (mut app, backend) = app();
    let id = app.add_window(WindowProps::new("main")).unwrap();

    backend.surface("main").unwrap().simulate_move(40, -12);
    app.tick();

    assert_eq!(app.window(id).unwrap().position(), (40, -12));
}

#[test]
fn test_native_input_reaches_layers_in_order() {
    let (mut app, backend) = app();
    let id = app.add_window(WindowProps::new("main")).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    app.window_mut(id)
        .unwrap()
        .layers_mut()
        .push_layer(EventLog { seen: seen.clone() });

    let surface = backend.surface("main").unwrap();
    surface.simulate_key(Key::A, KeyAction::Press, ModifierKey::SHIFT);
    surface.simulate_key(Key::A, KeyAction::Repeat, ModifierKey::SHIFT);
    surface.simulate_key(Key::A, KeyAction::Release, ModifierKey::NONE);
    surface.simulate_click(MouseButton::Left, MouseButtonAction::Press, ModifierKey::NONE);
    surface.simulate_click(MouseButton::Left, MouseButtonAction::Release, ModifierKey::NONE);
    surface.simulate_scroll(0.0, -1.5);
    app.tick();

    assert_eq!(
        *seen.lock(),
        [
            "WindowFocus",
            "KeyPressed: A (repeat 0, mods Shift)",
            "KeyPressed: A (repeat 1, mods Shift)",
            "KeyReleased: A (mods None)",
            "MouseButtonPressed: Left (mods None)",
            "MouseButtonReleased: Left (mods None)",
            "MouseScrolled: (0, -1.5)",
        ]
    );
}

/// Counts mouse moves and consumes them.
struct MoveCounter {
    moves: Arc<AtomicUsize>,
}

impl Layer for MoveCounter {
    fn on_event(&mut self, event: &Event) {
        let mut dispatcher = EventDispatcher::new(event);
        dispatcher.dispatch(EventType::MouseMoved, |_| {
            self.moves.fetch_add(1, Ordering::SeqCst);
            true
        });
    }
}

#[test]
fn test_events_from_pool_dispatched_exactly_once() {
    let (mut app, _backend) = app();
    let id = app.add_window(WindowProps::new("main")).unwrap();
    let moves = Arc::new(AtomicUsize::new(0));
    app.window_mut(id)
        .unwrap()
        .layers_mut()
        .push_layer(MoveCounter {
            moves: moves.clone(),
        });

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let queue = app.event_queue().clone();
            app.spawn(move || {
                (0..250)
                    .map(|i| {
                        queue.emplace(
                            EventKind::MouseMoved {
                                x: worker as f32,
                                y: i as f32,
                            },
                            id,
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap()
        })
        .collect();

    let events: Vec<_> = handles
        .into_iter()
        .flat_map(|handle| handle.wait().unwrap())
        .collect();
    assert_eq!(events.len(), 1000);

    // One focus event plus everything the workers queued.
    assert_eq!(app.dispatch_events(), 1001);
    assert_eq!(moves.load(Ordering::SeqCst), 1000);
    assert!(events.iter().all(|event| event.is_handled()));
    assert!(app.event_queue().is_empty());
}

#[test]
fn test_disabled_layer_misses_events() {
    let (mut app, backend) = app();
    let id = app.add_window(WindowProps::new("main")).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let layer = app
        .window_mut(id)
        .unwrap()
        .layers_mut()
        .push_layer(EventLog { seen: seen.clone() });
    app.tick();

    app.window_mut(id).unwrap().layers_mut().disable(layer);
    backend.surface("main").unwrap().simulate_move(1, 1);
    app.tick();

    assert_eq!(*seen.lock(), ["WindowFocus"]);
}
