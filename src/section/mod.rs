//! Section model and placeholder resolution
//!
//! A section is a named fragment referenced from a layout or from another
//! section with `@NAME@`. Names are case-insensitive and stored upper-case.
//!
//! # Example
//!
//! ```text
//! layout:  <main>@HEADER@@BODY@</main>
//! HEADER:  <h1>@TITLE@</h1>
//! TITLE:   Welcome
//! BODY:    <p>...</p>
//! ```

mod resolver;
pub mod scanner;

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::template::{DataSource, RenderContext, Template};

pub use resolver::{resolve, Resolved};

/// Function producing section text at render time
pub type Generator = Rc<dyn Fn(&Template, Option<&dyn DataSource>, &RenderContext) -> String>;

/// Content of a section or layout
#[derive(Clone)]
pub enum SectionContent {
    /// Fixed text
    Literal(String),
    /// Text computed from the instance, its data source and the render context
    Generator(Generator),
}

/// A layout has the same shape as a section
pub type Layout = SectionContent;

impl SectionContent {
    /// Wrap a closure as generated content
    pub fn generator<F>(f: F) -> Self
    where
        F: Fn(&Template, Option<&dyn DataSource>, &RenderContext) -> String + 'static,
    {
        SectionContent::Generator(Rc::new(f))
    }

    pub fn is_generator(&self) -> bool {
        matches!(self, SectionContent::Generator(_))
    }

    /// The literal text, if this is not a generator
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            SectionContent::Literal(text) => Some(text),
            SectionContent::Generator(_) => None,
        }
    }

    /// Produce the text of this content for one render
    pub fn materialize(&self, instance: &Template, context: &RenderContext) -> String {
        match self {
            SectionContent::Literal(text) => text.clone(),
            SectionContent::Generator(generate) => {
                generate(instance, instance.data_source().map(|source| &**source), context)
            }
        }
    }
}

impl Default for SectionContent {
    fn default() -> Self {
        SectionContent::Literal(String::new())
    }
}

impl fmt::Debug for SectionContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionContent::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            SectionContent::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

impl From<&str> for SectionContent {
    fn from(text: &str) -> Self {
        SectionContent::Literal(text.to_string())
    }
}

impl From<String> for SectionContent {
    fn from(text: String) -> Self {
        SectionContent::Literal(text)
    }
}

impl From<&String> for SectionContent {
    fn from(text: &String) -> Self {
        SectionContent::Literal(text.clone())
    }
}

/// Sections keyed by canonical (upper-case) name, in insertion order
#[derive(Debug, Clone, Default)]
pub struct SectionTable {
    entries: IndexMap<String, SectionContent>,
}

impl SectionTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a section, replacing any previous entry with the same name
    pub fn insert(
        &mut self,
        name: &str,
        content: impl Into<SectionContent>,
    ) -> Option<SectionContent> {
        self.entries.insert(scanner::canonical(name), content.into())
    }

    /// Look up a section by name, ignoring case
    pub fn get(&self, name: &str) -> Option<&SectionContent> {
        self.entries.get(&scanner::canonical(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&scanner::canonical(name))
    }

    /// Canonical names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> Extend<(K, V)> for SectionTable
where
    K: AsRef<str>,
    V: Into<SectionContent>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, content) in iter {
            self.insert(name.as_ref(), content);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for SectionTable
where
    K: AsRef<str>,
    V: Into<SectionContent>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = SectionTable::new();
        table.extend(iter);
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_canonicalized() {
        let mut table = SectionTable::new();
        table.insert("header", "Hi");

        assert!(table.contains("HEADER"));
        assert!(table.contains("Header"));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["HEADER"]);
    }

    #[test]
    fn test_later_insert_overwrites() {
        let mut table = SectionTable::new();
        table.insert("title", "first");
        let previous = table.insert("TITLE", "second");

        assert_eq!(previous.and_then(|c| c.as_literal().map(String::from)), Some("first".to_string()));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("title").and_then(|c| c.as_literal()), Some("second"));
    }

    #[test]
    fn test_collect_from_pairs() {
        let table: SectionTable = [("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_generator_debug_is_opaque() {
        let content = SectionContent::generator(|_, _, _| String::new());
        assert!(content.is_generator());
        assert_eq!(format!("{:?}", content), "Generator(..)");
    }
}
