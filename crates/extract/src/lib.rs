// Core change extraction library for Changescan
// Turns pairs of file versions into structured change records

mod batch;
mod extractor;
mod format;
mod kv;
mod line_diff;
mod pipeline;
mod plist;
mod record;

pub use batch::{extract_all, FileInput};
pub use extractor::extract_changes;
pub use format::FileFormat;
pub use kv::{kv_changes, scan_flat, scan_json, KeyValue};
pub use line_diff::block_changes;
pub use pipeline::{
    apply_passes, deduplicate, promote_single_line_kv, strip_structural_lines, ExtractOptions,
};
pub use plist::scan_plist;
pub use record::{ChangeContent, ChangeContext, ChangeKind, ChangeRecord, CommitAttribution};
