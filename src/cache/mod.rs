//! File-backed indices of XML fragments and the commands that read them.

pub mod copy;
pub mod indexed;
pub mod xpath;

pub use copy::CopyCommand;
pub use indexed::{IndexedDocument, IndexedDocumentCache};
pub use xpath::XmlPath;
