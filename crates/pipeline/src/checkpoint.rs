use facet_json::{from_str as from_json, to_string as to_json};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Which stages of a run against one output path have committed.
///
/// Advisory only: a missing or unreadable record just means a full run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, facet::Facet)]
pub struct Checkpoint {
    #[facet(default)]
    pub chapters_done: bool,
    #[facet(default)]
    pub images_done: bool,
    #[facet(default)]
    pub metadata_done: bool,
    #[facet(default)]
    pub saved_done: bool,
}

impl Checkpoint {
    /// `<output>.resume.json`, next to the output.
    pub fn path_for(output: &Path) -> PathBuf {
        let mut path = OsString::from(output.as_os_str());
        path.push(".resume.json");
        PathBuf::from(path)
    }

    /// The record stored for `output`, or `None` if there is no readable one.
    pub fn load(output: &Path) -> Option<Self> {
        let path = Self::path_for(output);
        let json = std::fs::read_to_string(&path).ok()?;
        match from_json::<Self>(&json) {
            Ok(checkpoint) => Some(checkpoint),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = ?err, "Ignoring unreadable checkpoint");
                None
            },
        }
    }

    /// Persist the record. Failures are logged and otherwise ignored.
    pub fn save(&self, output: &Path) {
        let path = Self::path_for(output);
        let json = match to_json(self) {
            Ok(json) => json,
            Err(err) => {
                tracing::warn!(error = ?err, "Could not encode checkpoint");
                return;
            },
        };
        match std::fs::write(&path, json) {
            Ok(()) => tracing::debug!(path = %path.display(), checkpoint = ?self, "Saved checkpoint"),
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "Could not save checkpoint"),
        }
    }
}
