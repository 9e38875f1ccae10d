//! Windows and their per-frame update.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use haze_core::{
    Event, EventKind, EventQueue, Key, KeyAction, ModifierKey, MouseButton, MouseButtonAction,
    PerfSpan, WindowId,
};

use crate::context::{ContextBinding, ContextCallbacks, RenderContext};
use crate::layer::{FrameContext, LayerStack};
use crate::renderer::Renderer;

/// Creation parameters for a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowProps {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub vsync: bool,
    /// Window to attach the new window to as a child.
    ///
    /// Only read at creation. Afterwards the registry holds the link and
    /// this is `None`; query [`Application::parent`](crate::Application::parent).
    pub parent: Option<WindowId>,
}

impl Default for WindowProps {
    fn default() -> Self {
        Self {
            title: "Haze".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
            parent: None,
        }
    }
}

impl WindowProps {
    /// Default properties with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the initial size in pixels.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_parent(mut self, parent: WindowId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Runs before the context is bound, with the frame delta in seconds.
pub type UpdateFn = Box<dyn FnMut(f32)>;
/// Runs inside the bound context.
pub type RenderFn = Box<dyn FnMut(&mut FrameContext<'_>)>;
/// Deferred work that needs the bound context.
pub type ContentUpdate = Box<dyn FnOnce(&mut dyn Renderer)>;

/// A native window with its render context, renderer and layers.
///
/// Windows are owned by the application's registry and addressed by
/// [`WindowId`]. Parent/child links live in the registry, not here.
pub struct Window {
    id: WindowId,
    props: WindowProps,
    position: (i32, i32),
    layers: LayerStack,
    update_fn: Option<UpdateFn>,
    render_fn: RenderFn,
    content_updates: VecDeque<ContentUpdate>,
    last_frame: Instant,
    delta: f32,
    renderer: Box<dyn Renderer>,
    // Dropped last so resources tied to it go first.
    context: Box<dyn RenderContext>,
}

impl Window {
    pub(crate) fn new(
        id: WindowId,
        props: WindowProps,
        mut context: Box<dyn RenderContext>,
        renderer: Box<dyn Renderer>,
    ) -> Self {
        context.set_vsync(props.vsync);
        Self {
            id,
            props,
            position: (0, 0),
            layers: LayerStack::new(),
            update_fn: None,
            render_fn: Box::new(clear_frame),
            content_updates: VecDeque::new(),
            last_frame: Instant::now(),
            delta: 0.0,
            renderer,
            context,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    /// Current properties. `parent` is always `None` here.
    pub fn props(&self) -> &WindowProps {
        &self.props
    }

    pub fn title(&self) -> &str {
        &self.props.title
    }

    /// Width in pixels as of the last applied resize.
    pub fn width(&self) -> u32 {
        self.props.width
    }

    /// Height in pixels as of the last applied resize.
    pub fn height(&self) -> u32 {
        self.props.height
    }

    /// Position reported by the last `WindowMoved` event.
    pub fn position(&self) -> (i32, i32) {
        self.position
    }

    /// Seconds between the last two frames.
    pub fn delta_time(&self) -> f32 {
        self.delta
    }

    pub fn is_vsync(&self) -> bool {
        self.context.is_vsync()
    }

    /// Toggle vsync on the window's context.
    pub fn set_vsync(&mut self, enabled: bool) {
        self.props.vsync = enabled;
        self.context.set_vsync(enabled);
    }

    pub fn layers(&self) -> &LayerStack {
        &self.layers
    }

    /// Layers and overlays, for pushing, popping and toggling.
    pub fn layers_mut(&mut self) -> &mut LayerStack {
        &mut self.layers
    }

    pub fn context(&self) -> &dyn RenderContext {
        self.context.as_ref()
    }

    /// Set what to do every frame before the context is bound.
    pub fn set_update_fn(&mut self, update: impl FnMut(f32) + 'static) {
        self.update_fn = Some(Box::new(update));
    }

    /// Set how the window draws. Replaces the default clear.
    pub fn set_render_fn(&mut self, render: impl FnMut(&mut FrameContext<'_>) + 'static) {
        self.render_fn = Box::new(render);
    }

    /// Schedule work to run inside the bound context on the next update.
    pub fn push_content_update(&mut self, update: impl FnOnce(&mut dyn Renderer) + 'static) {
        self.content_updates.push_back(Box::new(update));
    }

    /// Number of content updates waiting for the next frame.
    pub fn pending_content_updates(&self) -> usize {
        self.content_updates.len()
    }

    /// Key state through this window's context.
    pub fn key_state(&self, key: Key) -> KeyAction {
        self.context.key_state(key)
    }

    /// Mouse button state through this window's context.
    pub fn mouse_button_state(&self, button: MouseButton) -> MouseButtonAction {
        self.context.mouse_button_state(button)
    }

    /// Handle an event addressed to this window.
    ///
    /// Layers see the event first, then the window records size and position
    /// changes. A resize also schedules `Renderer::resize` for the next frame.
    pub fn on_event(&mut self, event: &Event) {
        self.layers.on_event(event);

        match *event.kind() {
            EventKind::WindowResize { width, height } => {
                self.props.width = width;
                self.props.height = height;
                self.push_content_update(move |renderer| renderer.resize(width, height));
            }
            EventKind::WindowMoved { x, y } => {
                self.position = (x, y);
            }
            _ => {}
        }
    }

    /// Run one frame.
    ///
    /// The update callback runs without a context. Everything after it runs
    /// inside a scoped binding that is released on every exit path.
    pub fn update(&mut self) {
        let _perf = PerfSpan::new("window_update");

        let now = Instant::now();
        self.delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if let Some(update) = self.update_fn.as_mut() {
            update(self.delta);
        }

        let mut binding = ContextBinding::new(self.context.as_mut());

        while let Some(content_update) = self.content_updates.pop_front() {
            content_update(self.renderer.as_mut());
        }

        let mut frame = FrameContext {
            delta: self.delta,
            renderer: self.renderer.as_mut(),
            width: self.props.width,
            height: self.props.height,
        };
        (self.render_fn)(&mut frame);
        self.layers.update(&mut frame);

        binding.swap_buffers();
    }

    /// Route this window's native notifications onto `queue`.
    pub(crate) fn register_event_callbacks(&mut self, queue: Arc<EventQueue>) {
        let id = self.id;

        let callbacks = ContextCallbacks {
            window_closed: {
                let queue = queue.clone();
                Arc::new(move || {
                    queue.emplace(EventKind::WindowClose, id);
                })
            },
            window_resized: {
                let queue = queue.clone();
                Arc::new(move |width: u32, height: u32| {
                    queue.emplace(EventKind::WindowResize { width, height }, id);
                })
            },
            window_moved: {
                let queue = queue.clone();
                Arc::new(move |x: i32, y: i32| {
                    queue.emplace(EventKind::WindowMoved { x, y }, id);
                })
            },
            window_focus_changed: {
                let queue = queue.clone();
                Arc::new(move |focused: bool| {
                    let kind = if focused {
                        EventKind::WindowFocus
                    } else {
                        EventKind::WindowLostFocus
                    };
                    queue.emplace(kind, id);
                })
            },
            key_triggered: {
                let queue = queue.clone();
                Arc::new(move |key: Key, _scancode: i32, action: KeyAction, modifiers: ModifierKey| {
                    let kind = match action {
                        KeyAction::Press => EventKind::KeyPressed {
                            key,
                            repeat_count: 0,
                            modifiers,
                        },
                        KeyAction::Repeat => EventKind::KeyPressed {
                            key,
                            repeat_count: 1,
                            modifiers,
                        },
                        KeyAction::Release => EventKind::KeyReleased { key, modifiers },
                    };
                    queue.emplace(kind, id);
                })
            },
            mouse_moved: {
                let queue = queue.clone();
                Arc::new(move |x: f32, y: f32| {
                    queue.emplace(EventKind::MouseMoved { x, y }, id);
                })
            },
            mouse_clicked: {
                let queue = queue.clone();
                Arc::new(move |button: MouseButton, action: MouseButtonAction, modifiers: ModifierKey| {
                    let kind = match action {
                        MouseButtonAction::Press => {
                            EventKind::MouseButtonPressed { button, modifiers }
                        }
                        MouseButtonAction::Release => {
                            EventKind::MouseButtonReleased { button, modifiers }
                        }
                    };
                    queue.emplace(kind, id);
                })
            },
            mouse_scrolled: Arc::new(move |x_offset: f32, y_offset: f32| {
                queue.emplace(EventKind::MouseScrolled { x_offset, y_offset }, id);
            }),
        };

        self.context.set_callbacks(callbacks);
    }
}

fn clear_frame(frame: &mut FrameContext<'_>) {
    frame.renderer.clear();
}

impl Drop for Window {
    fn drop(&mut self) {
        tracing::trace!(target: "haze::window", id = ?self.id, title = %self.props.title, "window destroyed");
    }
}

impl fmt::Debug for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("props", &self.props)
            .field("position", &self.position)
            .field("layers", &self.layers)
            .finish_non_exhaustive()
    }
}
