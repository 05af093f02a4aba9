// Git integration for Changescan
// This crate reads repository snapshots and reports which files changed between them

mod changes;
mod repository;

pub use changes::{FileChange, FileChangeKind};
pub use repository::{Commit, Repository};
