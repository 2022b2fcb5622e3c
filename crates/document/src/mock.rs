//! In-memory collaborators for tests.

use crate::book::Book;
use crate::error::{ErrorKind, Result};
use crate::store::DocumentStore;
use crate::structure::{Extracted, StructureHandle, TextStructure};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Document store that keeps books in a map keyed by path.
#[derive(Default)]
pub struct MemoryStore {
    books: Mutex<HashMap<PathBuf, Book>>,
    fail_saves: bool,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn with_books(books: impl IntoIterator<Item = (impl Into<PathBuf>, Book)>) -> Self {
        let books = books.into_iter().map(|(path, book)| (path.into(), book)).collect();
        Self {
            books: Mutex::new(books),
            ..Self::default()
        }
    }

    /// Every `save` fails.
    pub fn failing_saves(self) -> Self {
        Self { fail_saves: true, ..self }
    }

    pub fn insert(&self, path: impl Into<PathBuf>, book: Book) {
        self.books.lock().unwrap_or_else(PoisonError::into_inner).insert(path.into(), book);
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<Book> {
        self.books.lock().unwrap_or_else(PoisonError::into_inner).get(path.as_ref()).cloned()
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, path: &Path) -> Result<Book> {
        match self.get(path) {
            Some(book) => Ok(book),
            None => exn::bail!(ErrorKind::Load(path.to_path_buf())),
        }
    }

    fn save(&self, book: &Book, path: &Path) -> Result<()> {
        if self.fail_saves {
            exn::bail!(ErrorKind::Save(path.to_path_buf()));
        }
        self.insert(path, book.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.get(path).is_some()
    }
}

enum Piece {
    Literal(String),
    Segment { prefix: String, suffix: String },
}

/// Plain-text structure: every non-blank line is one segment.
///
/// Lines starting with `#!` (after indentation) are never extracted, which
/// stands in for elements marked as not translatable. Content that is not
/// UTF-8 is malformed.
#[derive(Debug, Default, Clone, Copy)]
pub struct LineStructure;

pub const NO_TRANSLATE_MARKER: &str = "#!";

impl TextStructure for LineStructure {
    fn extract(&self, content: &[u8]) -> Result<Extracted> {
        let Ok(text) = std::str::from_utf8(content) else {
            exn::bail!(ErrorKind::Malformed("content is not UTF-8".to_string()));
        };
        let mut texts = Vec::new();
        let mut pieces = Vec::new();
        for line in text.split('\n') {
            let body = line.trim();
            if body.is_empty() || body.starts_with(NO_TRANSLATE_MARKER) {
                pieces.push(Piece::Literal(line.to_string()));
                continue;
            }
            let start = line.len() - line.trim_start().len();
            let end = start + body.len();
            pieces.push(Piece::Segment {
                prefix: line[..start].to_string(),
                suffix: line[end..].to_string(),
            });
            texts.push(body.to_string());
        }
        Ok(Extracted {
            texts,
            handle: StructureHandle::new(pieces),
        })
    }

    fn replace(&self, handle: StructureHandle, translations: &[String]) -> Result<Vec<u8>> {
        let pieces = handle.downcast::<Vec<Piece>>()?;
        let expected = pieces.iter().filter(|p| matches!(p, Piece::Segment { .. })).count();
        if expected != translations.len() {
            exn::bail!(ErrorKind::CountMismatch {
                expected,
                actual: translations.len(),
            });
        }
        let mut translations = translations.iter();
        let lines: Vec<String> = pieces
            .into_iter()
            .map(|piece| match piece {
                Piece::Literal(line) => line,
                Piece::Segment { prefix, suffix } => {
                    let body = translations.next().map(String::as_str).unwrap_or_default();
                    format!("{prefix}{body}{suffix}")
                },
            })
            .collect();
        Ok(lines.join("\n").into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("一\n二", vec!["一", "二"])]
    #[case("  一  \n\n\t二", vec!["一", "二"])]
    #[case("#! skip\n一", vec!["一"])]
    #[case("", vec![])]
    fn test_extract(#[case] content: &str, #[case] expected: Vec<&str>) {
        let extracted = LineStructure.extract(content.as_bytes()).unwrap();
        assert_eq!(extracted.texts, expected);
    }

    #[test]
    fn test_replace_preserves_whitespace_and_order() {
        let extracted = LineStructure.extract("  一  \n#! keep\n\t二\n".as_bytes()).unwrap();
        let out = LineStructure
            .replace(extracted.handle, &["one".to_string(), "two".to_string()])
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "  one  \n#! keep\n\ttwo\n");
    }

    #[test]
    fn test_replace_rejects_wrong_count() {
        let extracted = LineStructure.extract("一\n二".as_bytes()).unwrap();
        let err = LineStructure.replace(extracted.handle, &["one".to_string()]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::CountMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_non_utf8_is_malformed() {
        let err = LineStructure.extract(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Malformed(_)));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::default();
        assert!(!store.exists(Path::new("out.epub")));
        store.save(&Book::default(), Path::new("out.epub")).unwrap();
        assert!(store.exists(Path::new("out.epub")));
        assert_eq!(store.saves(), 1);
        let err = store.load(Path::new("missing.epub")).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load(_)));
    }
}
