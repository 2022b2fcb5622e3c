use crate::book::Book;
use crate::error::Result;
use std::path::Path;

/// Reads and writes the document container format.
pub trait DocumentStore: Send + Sync {
    /// Fails with [`Load`](crate::error::ErrorKind::Load) if the file cannot
    /// be opened or parsed.
    fn load(&self, path: &Path) -> Result<Book>;

    /// Fails with [`Save`](crate::error::ErrorKind::Save).
    fn save(&self, book: &Book, path: &Path) -> Result<()>;

    /// Whether a document already exists at `path`.
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
