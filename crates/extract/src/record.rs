use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Classification of a single edit between two file versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    /// Content exists only in the new version
    #[display(fmt = "insert")]
    Insert,

    /// Content exists in both versions but differs
    #[display(fmt = "replace")]
    Replace,

    /// Content exists only in the old version
    #[display(fmt = "delete")]
    Delete,

    /// The whole file is gone in the new version
    #[display(fmt = "file-deleted")]
    FileDeleted,
}

/// The extraction strategy that produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeContext {
    /// Plain line-diff over unstructured text
    #[display(fmt = "block")]
    Block,

    /// Key-value diff over a generic structured format
    #[display(fmt = "kv")]
    Kv,

    /// Key-value diff over plist-style XML
    #[display(fmt = "plist-kv")]
    PlistKv,
}

/// Payload of a change record, tagged by extraction context
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "context", rename_all = "kebab-case")]
pub enum ChangeContent {
    /// Contiguous removed/added line runs from a line diff
    Block {
        old_lines: Vec<String>,
        new_lines: Vec<String>,
    },

    /// One affected key in a generic key-value format
    Kv {
        property: String,
        old: Option<String>,
        new: Option<String>,
    },

    /// One affected key in plist-style XML
    PlistKv {
        property: String,
        old: Option<String>,
        new: Option<String>,
    },
}

impl ChangeContent {
    /// The context tag for this payload
    pub fn context(&self) -> ChangeContext {
        match self {
            ChangeContent::Block { .. } => ChangeContext::Block,
            ChangeContent::Kv { .. } => ChangeContext::Kv,
            ChangeContent::PlistKv { .. } => ChangeContext::PlistKv,
        }
    }
}

/// Commit metadata attached to records extracted from a repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitAttribution {
    #[serde(rename = "commit_hash")]
    pub hash: String,

    #[serde(rename = "commit_author")]
    pub author: String,

    #[serde(rename = "commit_date")]
    pub date: String,

    #[serde(rename = "commit_message")]
    pub message: String,
}

/// One structured entry describing a localized edit between two file versions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Path of the changed file, relative to the repository root
    pub file: String,

    /// What changed, tagged by the extraction context that produced it
    #[serde(flatten)]
    pub content: ChangeContent,

    /// Classification of the edit
    pub change_type: ChangeKind,

    /// First affected 1-based line in the old version, if any
    pub line_old: Option<usize>,

    /// First affected 1-based line in the new version, if any
    pub line_new: Option<usize>,

    /// Commit that last touched the file, when known
    #[serde(flatten)]
    pub commit: Option<CommitAttribution>,
}

impl ChangeRecord {
    /// Create a block-context record from contiguous line runs
    pub fn block(
        file: &str,
        change_type: ChangeKind,
        old_lines: Vec<String>,
        new_lines: Vec<String>,
        line_old: Option<usize>,
        line_new: Option<usize>,
    ) -> Self {
        Self {
            file: file.to_string(),
            content: ChangeContent::Block {
                old_lines,
                new_lines,
            },
            change_type,
            line_old,
            line_new,
            commit: None,
        }
    }

    /// Create a kv-context record for one affected key
    pub fn kv(
        file: &str,
        change_type: ChangeKind,
        property: &str,
        old: Option<String>,
        new: Option<String>,
        line_old: Option<usize>,
        line_new: Option<usize>,
    ) -> Self {
        Self {
            file: file.to_string(),
            content: ChangeContent::Kv {
                property: property.to_string(),
                old,
                new,
            },
            change_type,
            line_old,
            line_new,
            commit: None,
        }
    }

    /// Create a plist-kv-context record for one affected key
    pub fn plist_kv(
        file: &str,
        change_type: ChangeKind,
        property: &str,
        old: Option<String>,
        new: Option<String>,
        line_old: Option<usize>,
        line_new: Option<usize>,
    ) -> Self {
        Self {
            file: file.to_string(),
            content: ChangeContent::PlistKv {
                property: property.to_string(),
                old,
                new,
            },
            change_type,
            line_old,
            line_new,
            commit: None,
        }
    }

    /// Create the single record describing a removed file
    pub fn file_deleted(file: &str, line_old: Option<usize>) -> Self {
        Self {
            file: file.to_string(),
            content: ChangeContent::Block {
                old_lines: Vec::new(),
                new_lines: Vec::new(),
            },
            change_type: ChangeKind::FileDeleted,
            line_old,
            line_new: None,
            commit: None,
        }
    }

    /// The context tag of this record
    pub fn context(&self) -> ChangeContext {
        self.content.context()
    }

    /// The affected key name, for kv-style records
    pub fn property(&self) -> Option<&str> {
        match &self.content {
            ChangeContent::Block { .. } => None,
            ChangeContent::Kv { property, .. } | ChangeContent::PlistKv { property, .. } => {
                Some(property)
            }
        }
    }
}
