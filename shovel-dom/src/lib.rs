//! Immutable HTML documents and CSS-selector queries over them.
//!
//! - [`Document`] / [`Element`]: the value types a fetch or a parse produces
//! - [`Query`]: selector navigation shared by documents and element subtrees
//! - [`HtmlParser`]: the parsing collaborator, [`ScraperParser`] by default
//! - [`meta`]: page-level facts (title, Open Graph, favicon, language, ...)
//! - [`Transform`]: apply a caller function to a query result
//!
//! ```rust
//! use shovel_dom::{Document, Query, meta};
//!
//! let doc = Document::new(
//!     "https://example.com",
//!     r#"<html lang="en"><head><title> Hello </title></head>
//!        <body><p class="x">one</p><p class="x">two</p></body></html>"#,
//! );
//!
//! assert_eq!(meta::title(&doc).as_deref(), Some("Hello"));
//! assert_eq!(meta::language(&doc).as_deref(), Some("en"));
//! let texts: Vec<String> = doc
//!     .get_elements_by_class_name("x")
//!     .iter()
//!     .map(|p| p.text_content().to_string())
//!     .collect();
//! assert_eq!(texts, ["one", "two"]);
//! ```

pub mod meta;
mod model;
mod parser;
mod query;
mod transform;

pub use model::{Document, Element, ElementParts, NodePath};
pub use parser::{HtmlParser, ScraperParser};
pub use query::Query;
pub use shovel_common::{Result, ShovelError};
pub use transform::Transform;
