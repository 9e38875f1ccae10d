//! The seam between the engine and a native graphics/windowing backend.

use crate::context::RenderContext;
use crate::error::Result;
use crate::renderer::Renderer;
use crate::window::WindowProps;

/// Creates the per-window resources the engine drives.
///
/// The application calls [`create_context`](Self::create_context) and then
/// [`create_renderer`](Self::create_renderer) with the new context bound, once
/// per window.
pub trait Backend {
    /// Open a native window and its render context.
    fn create_context(&self, props: &WindowProps) -> Result<Box<dyn RenderContext>>;

    /// Create a renderer for a context that is currently bound.
    fn create_renderer(&self, context: &mut dyn RenderContext) -> Result<Box<dyn Renderer>>;
}
