use crate::format::FileFormat;
use crate::kv;
use crate::line_diff;
use crate::plist;
use crate::record::{ChangeContext, ChangeRecord};

/// Extract structured change records for one file pair.
///
/// `old_text` is `None` when the file is newly created, `new_text` is `None`
/// when it was deleted. Structured formats are parsed and diffed key by key;
/// anything else (including structured input that fails to parse) goes
/// through the plain line diff. Identical content yields no records.
pub fn extract_changes(
    file: &str,
    old_text: Option<&str>,
    new_text: Option<&str>,
) -> Vec<ChangeRecord> {
    let Some(new_text) = new_text else {
        if old_text.is_none() {
            return Vec::new();
        }
        return vec![ChangeRecord::file_deleted(file, deleted_anchor(old_text))];
    };
    let old_text = old_text.unwrap_or("");
    if old_text == new_text {
        return Vec::new();
    }

    match FileFormat::detect(file, old_text, new_text) {
        FileFormat::Json => json_changes(file, old_text, new_text),
        FileFormat::Plist => plist_changes(file, old_text, new_text),
        FileFormat::Properties => {
            let old_pairs = kv::scan_flat(old_text);
            let new_pairs = kv::scan_flat(new_text);
            kv::kv_changes(file, ChangeContext::Kv, &old_pairs, &new_pairs)
        }
        FileFormat::PlainText => line_diff::block_changes(file, old_text, new_text),
    }
}

/// The deleted file's former position, when the old content shows it had one
fn deleted_anchor(old_text: Option<&str>) -> Option<usize> {
    match old_text {
        Some(text) if !text.is_empty() => Some(1),
        _ => None,
    }
}

fn json_changes(file: &str, old_text: &str, new_text: &str) -> Vec<ChangeRecord> {
    match (kv::scan_json(old_text), kv::scan_json(new_text)) {
        (Ok(old_pairs), Ok(new_pairs)) => {
            kv::kv_changes(file, ChangeContext::Kv, &old_pairs, &new_pairs)
        }
        _ => line_diff::block_changes(file, old_text, new_text),
    }
}

fn plist_changes(file: &str, old_text: &str, new_text: &str) -> Vec<ChangeRecord> {
    match (plist::scan_plist(old_text), plist::scan_plist(new_text)) {
        (Ok(old_pairs), Ok(new_pairs)) => {
            kv::kv_changes(file, ChangeContext::PlistKv, &old_pairs, &new_pairs)
        }
        _ => {
            let records = line_diff::block_changes(file, old_text, new_text);
            plist::annotate_block_records(records, old_text, new_text)
        }
    }
}
