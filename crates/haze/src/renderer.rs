//! The renderer capability a backend provides for each window.

/// Draw-level operations the engine needs from a backend renderer.
///
/// Renderers are only used on the thread that owns the application, inside a
/// bound context.
pub trait Renderer {
    /// Clear the current framebuffer.
    fn clear(&mut self);

    /// Adapt the viewport to a new framebuffer size.
    fn resize(&mut self, width: u32, height: u32);
}
