//! Domain logic - pure release rules independent of git and hosting operations

pub mod branch;
pub mod changeset;
pub mod commit;
pub mod decision;
pub mod release;
pub mod tag;
pub mod version;

pub use branch::BranchContext;
pub use changeset::{ChangeSet, CommitRecord, DiffStats};
pub use commit::ParsedCommit;
pub use decision::{DecisionSource, VersionDecision};
pub use release::{NewRelease, NotesSource, PublishedAsset, ReleaseNotes, ReleaseRecord};
pub use tag::{TagPattern, TagRecord, TagState};
pub use version::{BumpKind, Version};
