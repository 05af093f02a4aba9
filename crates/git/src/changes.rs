use derive_more::Display;
use git2::{Delta, DiffDelta};

/// How a file differs between the two compared snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FileChangeKind {
    /// The file exists only in the new snapshot
    #[display(fmt = "Added")]
    Added,
    /// The file exists in both snapshots with different content
    #[display(fmt = "Modified")]
    Modified,
    /// The file exists only in the old snapshot
    #[display(fmt = "Deleted")]
    Deleted,
    /// The file moved to a new path
    #[display(fmt = "Renamed")]
    Renamed,
    /// The file was copied from another path
    #[display(fmt = "Copied")]
    Copied,
    /// The file is present in the working directory but not tracked
    #[display(fmt = "Untracked")]
    Untracked,
}

impl FileChangeKind {
    fn from_delta_status(status: Delta) -> Option<Self> {
        match status {
            Delta::Added => Some(FileChangeKind::Added),
            Delta::Modified | Delta::Typechange => Some(FileChangeKind::Modified),
            Delta::Deleted => Some(FileChangeKind::Deleted),
            Delta::Renamed => Some(FileChangeKind::Renamed),
            Delta::Copied => Some(FileChangeKind::Copied),
            Delta::Untracked => Some(FileChangeKind::Untracked),
            _ => None,
        }
    }
}

/// One changed file reported by a snapshot comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Path in the new snapshot, relative to the repository root
    pub path: String,
    /// The previous path, for renames and copies
    pub old_path: Option<String>,
    /// How the file changed
    pub kind: FileChangeKind,
}

impl FileChange {
    pub(crate) fn from_delta(delta: &DiffDelta) -> Option<Self> {
        let kind = FileChangeKind::from_delta_status(delta.status())?;
        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())?
            .to_string_lossy()
            .to_string();
        let old_path = match kind {
            FileChangeKind::Renamed | FileChangeKind::Copied => delta
                .old_file()
                .path()
                .map(|p| p.to_string_lossy().to_string()),
            _ => None,
        };

        Some(Self {
            path,
            old_path,
            kind,
        })
    }

    /// The path the old content lives under, accounting for renames
    pub fn source_path(&self) -> &str {
        self.old_path.as_deref().unwrap_or(&self.path)
    }
}
