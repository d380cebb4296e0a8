//! Display text for targets and references.

pub mod fallback;
pub mod markup;
pub mod resolver;

pub use markup::{text_for, to_xml, DialectText, Markup, MarkupWriter};
pub use resolver::LinkTextResolver;
