use rayon::prelude::*;

use crate::extractor::extract_changes;
use crate::pipeline::{apply_passes, ExtractOptions};
use crate::record::ChangeRecord;

/// One file's worth of extraction input
#[derive(Debug, Clone)]
pub struct FileInput {
    /// Logical path, relative to the repository root
    pub path: String,
    /// Old version content, absent when the file is newly created
    pub old: Option<String>,
    /// New version content, absent when the file was deleted
    pub new: Option<String>,
}

/// Extract records for many files in parallel.
///
/// Each file is processed independently and the per-file results are
/// concatenated in input order, so the output is deterministic regardless
/// of scheduling.
pub fn extract_all(inputs: &[FileInput], options: &ExtractOptions) -> Vec<ChangeRecord> {
    let per_file: Vec<Vec<ChangeRecord>> = inputs
        .par_iter()
        .map(|input| {
            let records = extract_changes(&input.path, input.old.as_deref(), input.new.as_deref());
            apply_passes(records, options)
        })
        .collect();

    per_file.into_iter().flatten().collect()
}
