//! Per-window layers.
//!
//! A window owns a [`LayerStack`]: ordinary layers at the bottom, overlays on
//! top. Events walk the stack bottom to top, and so do per-frame updates, so
//! overlays always draw last.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use haze_core::Event;

use crate::renderer::Renderer;

/// Counter for unique layer IDs.
static NEXT_LAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a layer pushed onto a [`LayerStack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(u64);

impl LayerId {
    fn next() -> Self {
        Self(NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// What a layer sees during a frame.
///
/// Built inside the window's bound render context.
pub struct FrameContext<'a> {
    /// Seconds since the window's previous frame.
    pub delta: f32,
    pub renderer: &'a mut dyn Renderer,
    /// Framebuffer width in pixels.
    pub width: u32,
    /// Framebuffer height in pixels.
    pub height: u32,
}

/// A unit of per-window behavior.
pub trait Layer {
    /// Name used in logs.
    fn name(&self) -> &str {
        "layer"
    }

    /// Called once per frame with the window's context bound.
    fn update(&mut self, _frame: &mut FrameContext<'_>) {}

    /// Called for every event addressed to the owning window.
    fn on_event(&mut self, _event: &Event) {}
}

struct LayerEntry {
    id: LayerId,
    enabled: bool,
    layer: Box<dyn Layer>,
}

/// Ordered layers and overlays of one window.
#[derive(Default)]
pub struct LayerStack {
    entries: Vec<LayerEntry>,
    /// Boundary between layers and overlays.
    insert: usize,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a layer above the existing layers but below every overlay.
    pub fn push_layer(&mut self, layer: impl Layer + 'static) -> LayerId {
        let id = LayerId::next();
        self.entries.insert(
            self.insert,
            LayerEntry {
                id,
                enabled: true,
                layer: Box::new(layer),
            },
        );
        self.insert += 1;
        id
    }

    /// Push an overlay on top of the stack.
    pub fn push_overlay(&mut self, overlay: impl Layer + 'static) -> LayerId {
        let id = LayerId::next();
        self.entries.push(LayerEntry {
            id,
            enabled: true,
            layer: Box::new(overlay),
        });
        id
    }

    /// Remove a layer (not an overlay) and hand it back.
    pub fn pop_layer(&mut self, id: LayerId) -> Option<Box<dyn Layer>> {
        let index = self.entries[..self.insert].iter().position(|e| e.id == id)?;
        self.insert -= 1;
        Some(self.entries.remove(index).layer)
    }

    /// Remove an overlay and hand it back.
    pub fn pop_overlay(&mut self, id: LayerId) -> Option<Box<dyn Layer>> {
        let index = self.insert + self.entries[self.insert..].iter().position(|e| e.id == id)?;
        Some(self.entries.remove(index).layer)
    }

    /// Re-enable a layer. Returns `false` if the ID is unknown.
    pub fn enable(&mut self, id: LayerId) -> bool {
        self.set_enabled(id, true)
    }

    /// Disable a layer so it receives neither events nor updates.
    pub fn disable(&mut self, id: LayerId) -> bool {
        self.set_enabled(id, false)
    }

    fn set_enabled(&mut self, id: LayerId, enabled: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Check if a layer is present and enabled.
    pub fn is_enabled(&self, id: LayerId) -> bool {
        self.entries.iter().any(|e| e.id == id && e.enabled)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Total number of layers and overlays.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of overlays.
    pub fn overlay_count(&self) -> usize {
        self.entries.len() - self.insert
    }

    /// Iterate bottom to top, enabled or not.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Layer> {
        self.entries.iter().map(|e| e.layer.as_ref())
    }

    /// Layer names bottom to top.
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|layer| layer.name()).collect()
    }

    /// Offer an event to every enabled layer, bottom to top.
    pub fn on_event(&mut self, event: &Event) {
        for entry in self.entries.iter_mut().filter(|e| e.enabled) {
            entry.layer.on_event(event);
        }
    }

    /// Update every enabled layer, bottom to top.
    pub fn update(&mut self, frame: &mut FrameContext<'_>) {
        for entry in self.entries.iter_mut().filter(|e| e.enabled) {
            entry.layer.update(frame);
        }
    }
}

impl fmt::Debug for LayerStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerStack")
            .field("layers", &self.names())
            .field("overlays", &self.overlay_count())
            .finish()
    }
}
