//! # quirepdf
//!
//! A pure Rust PDF document object model built around two ideas: an
//! indirect-object store (objects addressed by id and generation, shared
//! by reference) and a page tree exposed as an ordinary mutable sequence.
//!
//! ## Features
//!
//! - **Page sequence**: random access with negative and one-based
//!   indexing, insertion, deletion, slices with step, append/extend,
//!   in-place reverse
//! - **Cross-document copying**: assign a page from one document into
//!   another; the object subgraph is copied lazily, with the source
//!   document kept alive until the copy materializes
//! - **Page tree**: inheritable attributes resolved on traversal,
//!   structure regenerated on every mutation
//! - **Lifecycle**: open, create, save; metadata round-tripped through
//!   the Info dictionary
//!
//! ## Quick Start
//!
//! ```rust
//! use quirepdf::{Document, Result};
//!
//! # fn main() -> Result<()> {
//! let doc = Document::new();
//! doc.add_blank_page(612.0, 792.0)?;
//! doc.add_blank_page(612.0, 792.0)?;
//!
//! let pages = doc.pages();
//! assert_eq!(pages.len(), 2);
//! assert_eq!(pages.get(-1)?, pages.get_one_based(2)?);
//!
//! pages.reverse()?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Copying pages between documents
//!
//! ```rust
//! use quirepdf::{Document, Result};
//!
//! # fn main() -> Result<()> {
//! let source = Document::new();
//! source.add_blank_page(612.0, 792.0)?;
//!
//! let dest = Document::new();
//! dest.pages().append(&source.pages().get(0)?)?;
//!
//! // The copy is deferred; `source` stays pinned until `dest` saves or
//! // the page's content is read.
//! assert_eq!(dest.pages().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod geometry;
pub mod objects;
pub mod store;
pub mod tree;

mod document;
mod import;
mod pages;
mod reader;
mod writer;

pub use document::{Document, DocumentMetadata, ObjectHandle};
pub use error::{PdfError, Result};
pub use geometry::Matrix;
pub use objects::{Dictionary, Object, ObjectId, Stream};
pub use pages::{PageIter, PageList};
pub use store::ObjectStore;
