use crate::domain::Version;
use std::path::PathBuf;

/// Where release notes text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesSource {
    Reasoning,
    Template,
}

/// Release notes for one target version, immutable once composed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseNotes {
    version: Version,
    body: String,
    source: NotesSource,
}

impl ReleaseNotes {
    pub fn new(version: Version, body: impl Into<String>, source: NotesSource) -> Self {
        ReleaseNotes {
            version,
            body: body.into(),
            source,
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn source(&self) -> NotesSource {
        self.source
    }
}

/// A release as known to the hosting system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRecord {
    /// Host-side identifier
    pub id: u64,
    pub tag_name: String,
    pub title: String,
    pub notes: String,
    pub assets: Vec<String>,
    pub latest: bool,
}

/// Request to create a release for an existing remote tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelease {
    pub tag_name: String,
    pub title: String,
    pub notes: String,
    pub latest: bool,
}

/// A build artifact to attach to a release
///
/// Uploads replace any existing asset with the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedAsset {
    pub name: String,
    pub path: PathBuf,
}

impl PublishedAsset {
    /// Build an asset named after the file name of `path`
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let name = path.file_name()?.to_str()?.to_string();
        Some(PublishedAsset { name, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_name_from_path() {
        let asset = PublishedAsset::from_path("dist/tool-x86_64-linux.tar.gz").unwrap();
        assert_eq!(asset.name, "tool-x86_64-linux.tar.gz");
        assert_eq!(asset.path, PathBuf::from("dist/tool-x86_64-linux.tar.gz"));
    }

    #[test]
    fn test_asset_without_file_name() {
        assert!(PublishedAsset::from_path("..").is_none());
    }

    #[test]
    fn test_notes_accessors() {
        let notes = ReleaseNotes::new(Version::new(2, 0, 0), "## 2.0.0", NotesSource::Template);
        assert_eq!(notes.version(), Version::new(2, 0, 0));
        assert_eq!(notes.body(), "## 2.0.0");
        assert_eq!(notes.source(), NotesSource::Template);
    }
}
