//! Sectional - hierarchical section templates
//!
//! A template is a layout plus a table of named sections. Rendering replaces
//! `@NAME@` placeholders with their sections, recursively, then fills
//! `<%= path %>` tags from a render context.
//!
//! # Example
//!
//! ```rust
//! use sectional::render;
//!
//! let html = render(
//!     "<article>@HEADER@@BODY@</article>",
//!     [("header", "<h1><%= title %></h1>"), ("body", "<p>@LEAD@</p>"), ("lead", "Hi")],
//!     &serde_json::json!({"title": "News"}),
//! )
//! .unwrap();
//!
//! assert_eq!(html, "<article><h1>News</h1><p>Hi</p></article>");
//! ```

pub mod catalog;
pub mod error;
pub mod interpolate;
pub mod registry;
pub mod section;
pub mod template;

pub use catalog::{Catalog, CatalogError};
pub use error::{InterpolateError, TemplateError};
pub use interpolate::{interpolate, Interpolator, TagInterpolator};
pub use registry::{Compiler, Constructor, RegistryError, TemplateRegistry};
pub use section::{Layout, SectionContent, SectionTable};
pub use template::{DataSource, Document, MemoryDocument, RenderContext, Store, Template};

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while rendering a template
#[derive(Debug, Error)]
pub enum RenderError {
    /// Error while expanding sections
    #[error("section error: {0}")]
    Section(#[from] TemplateError),

    /// Error while interpolating the expanded text
    #[error("interpolation error: {source}")]
    Interpolate {
        #[source]
        source: InterpolateError,
        /// Section-expanded text the error spans point into
        text: String,
    },
}

impl RenderError {
    /// Human-readable report, with source context for interpolation errors
    pub fn report(&self, filename: &str) -> String {
        match self {
            RenderError::Interpolate { source, text } => source.format(text, filename),
            RenderError::Section(_) => self.to_string(),
        }
    }
}

/// Render a layout with the given sections and data in one call
///
/// # Example
///
/// ```rust
/// use sectional::render;
///
/// let out = render("<div>@HEADER@</div>", [("HEADER", "Hi")], &serde_json::json!({})).unwrap();
/// assert_eq!(out, "<div>Hi</div>");
/// ```
pub fn render<I, K, V>(layout: &str, sections: I, data: &Value) -> Result<String, RenderError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<SectionContent>,
{
    Template::with_parts(sections, layout).render(Some(data))
}
