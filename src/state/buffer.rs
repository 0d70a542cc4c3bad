//! In-memory, unsaved annotations for the selected image.

use crate::model::Annotation;

/// The authoritative unsaved copy of the current image's annotations.
///
/// Entries keep insertion order. Ids are expected to be unique because the
/// widget issues them, but duplicates are stored as received.
#[derive(Debug, Clone, Default)]
pub struct AnnotationBuffer {
    entries: Vec<Annotation>,
}

impl AnnotationBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an annotation created by the widget.
    pub fn on_widget_create(&mut self, annotation: Annotation) {
        log::debug!("Buffer: added annotation {}", annotation.id);
        self.entries.push(annotation);
    }

    /// Remove the first annotation with a matching id.
    ///
    /// Returns the removed annotation, or `None` if no entry matched.
    pub fn on_widget_delete(&mut self, id: &str) -> Option<Annotation> {
        let index = self.entries.iter().position(|a| a.id == id)?;
        log::debug!("Buffer: removed annotation {}", id);
        Some(self.entries.remove(index))
    }

    /// Drop all buffered annotations.
    pub fn reset(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("Buffer: discarded {} unsaved annotations", self.entries.len());
        }
        self.entries.clear();
    }

    /// Copy of the current annotations, in insertion order.
    pub fn snapshot(&self) -> Vec<Annotation> {
        self.entries.clone()
    }

    /// Borrow the current annotations.
    pub fn as_slice(&self) -> &[Annotation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
