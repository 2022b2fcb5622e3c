//! Book model and the document collaborators the pipeline talks to.
//!
//! The container format and the markup layer are not implemented here.
//! [`DocumentStore`] loads and saves a [`Book`], and [`TextStructure`] pulls
//! prose segments out of a content unit and writes translations back.

mod book;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod store;
mod structure;
mod toc;

pub use crate::book::{Book, ContentUnit, ImageAsset, Metadata, MetadataChanges, MetadataField, Stylesheet};
pub use crate::store::DocumentStore;
pub use crate::structure::{Extracted, StructureHandle, TextStructure};
pub use crate::toc::TocNode;
use std::sync::Arc;

pub type StoreHandle = Arc<dyn DocumentStore>;
pub type TextStructureHandle = Arc<dyn TextStructure>;
