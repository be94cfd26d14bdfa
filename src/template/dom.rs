//! Element lookup used by redraws

use indexmap::IndexMap;

/// A document holding rendered elements addressed by id
pub trait Document {
    /// Current markup of the element with `id`
    fn element(&self, id: &str) -> Option<&str>;

    /// Replace the element with new markup in one step; false if it is absent
    fn replace_element(&mut self, id: &str, markup: String) -> bool;

    fn contains_element(&self, id: &str) -> bool {
        self.element(id).is_some()
    }
}

/// In-memory document: element id to markup
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    elements: IndexMap<String, String>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite an element
    pub fn mount(&mut self, id: impl Into<String>, markup: impl Into<String>) {
        self.elements.insert(id.into(), markup.into());
    }

    pub fn unmount(&mut self, id: &str) -> Option<String> {
        self.elements.shift_remove(id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Document for MemoryDocument {
    fn element(&self, id: &str) -> Option<&str> {
        self.elements.get(id).map(|s| s.as_str())
    }

    fn replace_element(&mut self, id: &str, markup: String) -> bool {
        match self.elements.get_mut(id) {
            Some(slot) => {
                *slot = markup;
                true
            }
            None => false,
        }
    }
}
