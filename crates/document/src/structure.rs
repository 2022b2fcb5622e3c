use crate::error::{ErrorKind, Result};
use std::any::Any;

/// Opaque state returned by [`TextStructure::extract`] and consumed by
/// [`TextStructure::replace`].
pub struct StructureHandle(Box<dyn Any + Send>);

impl StructureHandle {
    pub fn new<T: Any + Send>(inner: T) -> Self {
        Self(Box::new(inner))
    }

    /// Recover the implementation's own state.
    pub fn downcast<T: Any>(self) -> Result<T> {
        match self.0.downcast::<T>() {
            Ok(inner) => Ok(*inner),
            Err(_) => exn::bail!(ErrorKind::ForeignHandle),
        }
    }
}

impl std::fmt::Debug for StructureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StructureHandle(..)")
    }
}

/// Text segments pulled out of one content unit, in document order.
#[derive(Debug)]
pub struct Extracted {
    pub texts: Vec<String>,
    pub handle: StructureHandle,
}

/// Extracts prose from a content unit and puts translations back.
///
/// Implementations must:
/// - return segments in document order and accept translations in the same
///   order, one per segment;
/// - keep the whitespace around each segment verbatim;
/// - never extract elements marked as not translatable.
pub trait TextStructure: Send + Sync {
    fn extract(&self, content: &[u8]) -> Result<Extracted>;

    /// Rebuild the unit with `translations` in place of the extracted
    /// segments. Fails with [`ErrorKind::CountMismatch`] unless there is
    /// exactly one translation per segment.
    fn replace(&self, handle: StructureHandle, translations: &[String]) -> Result<Vec<u8>>;
}
