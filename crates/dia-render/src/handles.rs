//! Render-handle side table.
//!
//! Presentation handles (the page element, its tooltip, the number shown on
//! it) are runtime-only and never serialized. They live here keyed by the
//! stable [`AnnotationId`], not on the annotation itself, so the store stays
//! plain data and handles go away with their annotation.

use dia_core::AnnotationId;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderHandle<E> {
    pub element: E,
    pub tooltip: Option<E>,
    pub display_index: u32,
}

impl<E> RenderHandle<E> {
    pub fn new(element: E, display_index: u32) -> Self {
        Self {
            element,
            tooltip: None,
            display_index,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderHandles<E> {
    handles: HashMap<AnnotationId, RenderHandle<E>>,
}

impl<E> Default for RenderHandles<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> RenderHandles<E> {
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Attach a handle, returning the one it replaces.
    pub fn mount(&mut self, id: AnnotationId, handle: RenderHandle<E>) -> Option<RenderHandle<E>> {
        self.handles.insert(id, handle)
    }

    pub fn unmount(&mut self, id: AnnotationId) -> Option<RenderHandle<E>> {
        self.handles.remove(&id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut RenderHandle<E>> {
        self.handles.get_mut(&id)
    }

    /// Unmount every handle whose id is not in `live`, returning them.
    pub fn retain_live(&mut self, live: &[AnnotationId]) -> Vec<(AnnotationId, RenderHandle<E>)> {
        let stale: Vec<AnnotationId> = self
            .handles
            .keys()
            .filter(|id| !live.contains(id))
            .copied()
            .collect();
        stale
            .into_iter()
            .filter_map(|id| self.handles.remove(&id).map(|h| (id, h)))
            .collect()
    }
}
