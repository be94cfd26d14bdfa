//! Template instances and their runtime collaborators
//!
//! A [`Template`] owns a layout, a [`SectionTable`](crate::SectionTable) and
//! options. Rendering expands the section placeholders of the layout and
//! passes the result through an [`Interpolator`](crate::Interpolator) fed by
//! a [`RenderContext`].
//!
//! # Example
//!
//! ```rust
//! use sectional::Template;
//!
//! let mut page = Template::with_parts(
//!     [("header", "<h1><%= title %></h1>")],
//!     "<main>@HEADER@</main>",
//! );
//! let html = page.render(Some(&serde_json::json!({"title": "Hello"}))).unwrap();
//! assert_eq!(html, "<main><h1>Hello</h1></main>");
//! ```

mod context;
mod dom;
pub mod events;
mod instance;
mod source;

pub use context::{RenderContext, DATA_SOURCE_KEY, DOM_ID_KEY, DRAW_KEY, OPTION_KEY};
pub use dom::{Document, MemoryDocument};
pub use events::{Event, EventEmitter, Handler, ListenerId, Observable};
pub use instance::{PrepareData, RenderedHook, Template, DEFAULT_PREFIX};
pub use source::{DataSource, Store, CHANGE};
