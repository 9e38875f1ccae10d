//! The window registry: sole owner of every window and of the window forest.
//!
//! Windows live in a generational arena keyed by [`WindowId`], so a handle to a
//! destroyed window fails lookups instead of dangling. Parent/child links are
//! stored next to each window and kept mutually consistent: a window's parent
//! link names a window whose child list contains it, and vice versa.

use std::collections::VecDeque;

use haze_core::WindowId;
use slotmap::SlotMap;

use crate::error::{HazeError, Result};
use crate::window::Window;

struct WindowEntry {
    window: Window,
    parent: Option<WindowId>,
    children: Vec<WindowId>,
}

/// Arena of windows with parent/child links.
#[derive(Default)]
pub struct WindowRegistry {
    windows: SlotMap<WindowId, WindowEntry>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a window built for the freshly allocated ID.
    ///
    /// `build` receives the ID the window will live under. With a `parent`,
    /// the new window is appended to that window's children.
    pub fn insert(
        &mut self,
        parent: Option<WindowId>,
        build: impl FnOnce(WindowId) -> Window,
    ) -> Result<WindowId> {
        if let Some(parent_id) = parent {
            if !self.windows.contains_key(parent_id) {
                return Err(HazeError::WindowNotFound(parent_id));
            }
        }

        let id = self.windows.insert_with_key(|id| WindowEntry {
            window: build(id),
            parent,
            children: Vec::new(),
        });

        if let Some(parent_entry) = parent.and_then(|p| self.windows.get_mut(p)) {
            parent_entry.children.push(id);
        }

        Ok(id)
    }

    /// Remove a window and hand it back.
    ///
    /// The window is detached from its parent's child list and its children
    /// become roots.
    pub fn remove(&mut self, id: WindowId) -> Option<Window> {
        let entry = self.windows.remove(id)?;

        if let Some(parent_entry) = entry.parent.and_then(|p| self.windows.get_mut(p)) {
            parent_entry.children.retain(|&child| child != id);
        }
        for child in &entry.children {
            if let Some(child_entry) = self.windows.get_mut(*child) {
                child_entry.parent = None;
            }
        }

        Some(entry.window)
    }

    /// Look up a live window.
    pub fn get(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(id).map(|entry| &entry.window)
    }

    /// Look up a live window mutably.
    pub fn get_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.get_mut(id).map(|entry| &mut entry.window)
    }

    /// Check whether `id` names a live window.
    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.contains_key(id)
    }

    /// Number of live windows.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Check whether no windows are alive.
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// IDs of every live window, in arena order.
    pub fn ids(&self) -> Vec<WindowId> {
        self.windows.keys().collect()
    }

    /// Iterate over live windows in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (WindowId, &Window)> {
        self.windows.iter().map(|(id, entry)| (id, &entry.window))
    }

    /// Iterate mutably over live windows in arena order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (WindowId, &mut Window)> {
        self.windows
            .iter_mut()
            .map(|(id, entry)| (id, &mut entry.window))
    }

    /// First window with the given title.
    pub fn find_by_title(&self, title: &str) -> Option<WindowId> {
        self.windows
            .iter()
            .find(|(_, entry)| entry.window.title() == title)
            .map(|(id, _)| id)
    }

    /// Parent of a window, `None` for roots.
    pub fn parent(&self, id: WindowId) -> Result<Option<WindowId>> {
        self.windows
            .get(id)
            .map(|entry| entry.parent)
            .ok_or(HazeError::WindowNotFound(id))
    }

    /// Direct children of a window, oldest first.
    pub fn children(&self, id: WindowId) -> Result<&[WindowId]> {
        self.windows
            .get(id)
            .map(|entry| entry.children.as_slice())
            .ok_or(HazeError::WindowNotFound(id))
    }

    /// `false` for stale handles.
    pub fn has_children(&self, id: WindowId) -> bool {
        self.windows
            .get(id)
            .is_some_and(|entry| !entry.children.is_empty())
    }

    /// Re-parent a window, or make it a root with `None`.
    ///
    /// # Errors
    ///
    /// Fails with [`HazeError::WindowNotFound`] for stale handles and with
    /// [`HazeError::CircularParentage`] if the new parent is the window itself
    /// or one of its descendants.
    pub fn set_parent(&mut self, id: WindowId, new_parent: Option<WindowId>) -> Result<()> {
        if !self.windows.contains_key(id) {
            return Err(HazeError::WindowNotFound(id));
        }

        if let Some(parent_id) = new_parent {
            if !self.windows.contains_key(parent_id) {
                return Err(HazeError::WindowNotFound(parent_id));
            }
            if self.is_ancestor_of(id, parent_id) {
                return Err(HazeError::CircularParentage);
            }
        }

        let old_parent = self.windows.get(id).and_then(|entry| entry.parent);
        if old_parent == new_parent {
            return Ok(());
        }

        if let Some(old_entry) = old_parent.and_then(|p| self.windows.get_mut(p)) {
            old_entry.children.retain(|&child| child != id);
        }
        if let Some(entry) = self.windows.get_mut(id) {
            entry.parent = new_parent;
        }
        if let Some(new_entry) = new_parent.and_then(|p| self.windows.get_mut(p)) {
            new_entry.children.push(id);
        }

        Ok(())
    }

    /// Check if `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor_of(&self, ancestor: WindowId, id: WindowId) -> bool {
        let mut current = Some(id);
        while let Some(current_id) = current {
            if current_id == ancestor {
                return true;
            }
            current = self.windows.get(current_id).and_then(|entry| entry.parent);
        }
        false
    }

    /// Breadth-first walk of the subtree rooted at `root`, root included.
    ///
    /// Empty for a stale root.
    pub fn collect_subtree(&self, root: WindowId) -> Vec<WindowId> {
        let mut order = Vec::new();
        if !self.windows.contains_key(root) {
            return order;
        }

        let mut pending = VecDeque::from([root]);
        while let Some(id) = pending.pop_front() {
            order.push(id);
            if let Some(entry) = self.windows.get(id) {
                pending.extend(entry.children.iter().copied());
            }
        }
        order
    }

    /// Drop every window.
    ///
    /// Children go before their parents, so no window outlives an ancestor.
    pub fn clear(&mut self) {
        let roots: Vec<WindowId> = self
            .windows
            .iter()
            .filter(|(_, entry)| entry.parent.is_none())
            .map(|(id, _)| id)
            .collect();

        for root in roots {
            for id in self.collect_subtree(root).into_iter().rev() {
                self.remove(id);
            }
        }
        // Anything left is unreachable from a root.
        self.windows.clear();
    }
}

impl std::fmt::Debug for WindowRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.windows
                    .iter()
                    .map(|(id, entry)| (id, (entry.window.title(), entry.parent, &entry.children))),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Backend;
    use crate::headless::HeadlessBackend;
    use crate::window::WindowProps;

    fn add(
        registry: &mut WindowRegistry,
        backend: &HeadlessBackend,
        title: &str,
        parent: Option<WindowId>,
    ) -> Result<WindowId> {
        let props = WindowProps::new(title);
        let mut context = backend.create_context(&props)?;
        let renderer = backend.create_renderer(context.as_mut())?;
        registry.insert(parent, |id| Window::new(id, props, context, renderer))
    }

    /// root -> {a, b}, a -> {a1, a2}
    fn tree(registry: &mut WindowRegistry, backend: &HeadlessBackend) -> [WindowId; 5] {
        let root = add(registry, backend, "root", None).unwrap();
        let a = add(registry, backend, "a", Some(root)).unwrap();
        let b = add(registry, backend, "b", Some(root)).unwrap();
        let a1 = add(registry, backend, "a1", Some(a)).unwrap();
        let a2 = add(registry, backend, "a2", Some(a)).unwrap();
        [root, a, b, a1, a2]
    }

    #[test]
    fn test_insert_links_parent_and_child() {
        let backend = HeadlessBackend::new();
        let mut registry = WindowRegistry::new();
        let [root, a, b, a1, a2] = tree(&mut registry, &backend);

        assert_eq!(registry.len(), 5);
        assert_eq!(registry.children(root).unwrap(), [a, b]);
        assert_eq!(registry.children(a).unwrap(), [a1, a2]);
        assert_eq!(registry.parent(a2).unwrap(), Some(a));
        assert_eq!(registry.parent(root).unwrap(), None);
        assert!(registry.has_children(a));
        assert!(!registry.has_children(b));
        assert_eq!(registry.find_by_title("a1"), Some(a1));
        assert_eq!(registry.get(b).unwrap().title(), "b");
    }

    #[test]
    fn test_collect_subtree_is_breadth_first() {
        let backend = HeadlessBackend::new();
        let mut registry = WindowRegistry::new();
        let [root, a, b, a1, a2] = tree(&mut registry, &backend);

        assert_eq!(registry.collect_subtree(root), [root, a, b, a1, a2]);
        assert_eq!(registry.collect_subtree(a), [a, a1, a2]);
        assert_eq!(registry.collect_subtree(b), [b]);
    }

    #[test]
    fn test_remove_detaches_links() {
        let backend = HeadlessBackend::new();
        let mut registry = WindowRegistry::new();
        let [root, a, b, a1, a2] = tree(&mut registry, &backend);

        let removed = registry.remove(a).unwrap();
        assert_eq!(removed.title(), "a");
        drop(removed);

        assert!(!registry.contains(a));
        assert_eq!(registry.children(root).unwrap(), [b]);
        assert_eq!(registry.parent(a1).unwrap(), None);
        assert_eq!(registry.parent(a2).unwrap(), None);
        assert_eq!(backend.destruction_log(), ["a"]);

        // The stale handle fails cleanly.
        assert!(registry.get(a).is_none());
        assert_eq!(registry.children(a).unwrap_err(), HazeError::WindowNotFound(a));
        assert!(registry.collect_subtree(a).is_empty());
        assert!(registry.remove(a).is_none());
    }

    #[test]
    fn test_stale_parent_rejected() {
        let backend = HeadlessBackend::new();
        let mut registry = WindowRegistry::new();
        let gone = add(&mut registry, &backend, "gone", None).unwrap();
        registry.remove(gone);

        let result = add(&mut registry, &backend, "child", Some(gone));
        assert_eq!(result.unwrap_err(), HazeError::WindowNotFound(gone));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_set_parent_relinks_and_rejects_cycles() {
        let backend = HeadlessBackend::new();
        let mut registry = WindowRegistry::new();
        let [root, a, b, a1, _a2] = tree(&mut registry, &backend);

        registry.set_parent(a1, Some(b)).unwrap();
        assert_eq!(registry.children(b).unwrap(), [a1]);
        assert_eq!(registry.parent(a1).unwrap(), Some(b));
        assert!(!registry.children(a).unwrap().contains(&a1));

        assert_eq!(registry.set_parent(root, Some(a1)), Err(HazeError::CircularParentage));
        assert_eq!(registry.set_parent(a, Some(a)), Err(HazeError::CircularParentage));
        assert!(registry.is_ancestor_of(root, a1));
        assert!(!registry.is_ancestor_of(a, a1));

        registry.set_parent(b, None).unwrap();
        assert_eq!(registry.parent(b).unwrap(), None);
        assert_eq!(registry.children(root).unwrap(), [a]);
    }

    #[test]
    fn test_clear_destroys_children_first() {
        let backend = HeadlessBackend::new();
        let mut registry = WindowRegistry::new();
        tree(&mut registry, &backend);

        registry.clear();

        assert!(registry.is_empty());
        assert_eq!(backend.destruction_log(), ["a2", "a1", "b", "a", "root"]);
    }
}
