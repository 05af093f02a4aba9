use std::collections::HashSet;

use crate::kv;
use crate::record::{ChangeContent, ChangeKind, ChangeRecord};

/// Options controlling the cleanup passes applied after extraction
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Drop blank and closing-bracket-only lines from block records
    pub strip_structural_lines: bool,
    /// Rewrite single-line block edits that look like `key = value` pairs
    /// into kv records
    pub promote_single_line_kv: bool,
}

/// Run the cleanup passes over freshly extracted records.
///
/// Duplicates are always removed; the remaining passes are opt-in because
/// they trade round-trip fidelity for a tighter change list.
pub fn apply_passes(records: Vec<ChangeRecord>, options: &ExtractOptions) -> Vec<ChangeRecord> {
    let mut records = deduplicate(records);
    if options.strip_structural_lines {
        records = strip_structural_lines(records);
    }
    if options.promote_single_line_kv {
        records = promote_single_line_kv(records);
    }
    records
}

/// Drop records that repeat an earlier record exactly, keeping first
/// occurrences in order
pub fn deduplicate(records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.clone()))
        .collect()
}

/// Remove lines that carry no content of their own (blank lines and lines
/// of closing brackets) from block records.
///
/// A record whose sides both become empty is dropped; otherwise its change
/// type is recomputed from what is left. Line numbers keep pointing at the
/// start of the original run.
pub fn strip_structural_lines(records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
    let mut cleaned = Vec::with_capacity(records.len());
    for mut record in records {
        if !matches!(
            record.change_type,
            ChangeKind::Insert | ChangeKind::Delete | ChangeKind::Replace
        ) {
            cleaned.push(record);
            continue;
        }
        let ChangeContent::Block {
            old_lines,
            new_lines,
        } = &record.content
        else {
            cleaned.push(record);
            continue;
        };

        let old_kept: Vec<String> = old_lines
            .iter()
            .filter(|line| !is_structural_line(line))
            .cloned()
            .collect();
        let new_kept: Vec<String> = new_lines
            .iter()
            .filter(|line| !is_structural_line(line))
            .cloned()
            .collect();

        if old_kept == *old_lines && new_kept == *new_lines {
            cleaned.push(record);
            continue;
        }
        if old_kept.is_empty() && new_kept.is_empty() {
            continue;
        }

        record.change_type = if !old_kept.is_empty() && !new_kept.is_empty() {
            ChangeKind::Replace
        } else if !old_kept.is_empty() {
            ChangeKind::Delete
        } else {
            ChangeKind::Insert
        };
        record.content = ChangeContent::Block {
            old_lines: old_kept,
            new_lines: new_kept,
        };
        cleaned.push(record);
    }
    cleaned
}

/// True for lines that are blank or contain only closing brackets,
/// optionally ending in a semicolon
fn is_structural_line(line: &str) -> bool {
    let s = line.trim();
    if s.is_empty() {
        return true;
    }
    let s = s.strip_suffix(';').unwrap_or(s);
    !s.is_empty() && s.chars().all(|ch| matches!(ch, ')' | ']' | '}'))
}

/// Rewrite block records whose single changed line parses as a key-value
/// pair into kv records.
///
/// Both sides must be at most one line, every present side must parse, and
/// on a replace the keys must agree. Values keep their source form minus any
/// trailing comma. A replace whose parsed values come out identical is left
/// as a block record, since only its surrounding text changed.
pub fn promote_single_line_kv(records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
    records.into_iter().map(promote_record).collect()
}

fn promote_record(record: ChangeRecord) -> ChangeRecord {
    if !matches!(
        record.change_type,
        ChangeKind::Insert | ChangeKind::Delete | ChangeKind::Replace
    ) {
        return record;
    }
    let ChangeContent::Block {
        old_lines,
        new_lines,
    } = &record.content
    else {
        return record;
    };
    if old_lines.len() > 1 || new_lines.len() > 1 {
        return record;
    }
    if old_lines.is_empty() && new_lines.is_empty() {
        return record;
    }

    let old_pair = match old_lines.first() {
        Some(line) => match kv::match_kv_line(line) {
            Some(pair) => Some(pair),
            None => return record,
        },
        None => None,
    };
    let new_pair = match new_lines.first() {
        Some(line) => match kv::match_kv_line(line) {
            Some(pair) => Some(pair),
            None => return record,
        },
        None => None,
    };

    if let (Some((old_key, old_value)), Some((new_key, new_value))) = (&old_pair, &new_pair) {
        if old_key != new_key || old_value == new_value {
            return record;
        }
    }

    let Some(property) = old_pair
        .as_ref()
        .or(new_pair.as_ref())
        .map(|(key, _)| key.clone())
    else {
        return record;
    };

    ChangeRecord {
        content: ChangeContent::Kv {
            property,
            old: old_pair.map(|(_, value)| value),
            new: new_pair.map(|(_, value)| value),
        },
        ..record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ChangeRecord;

    fn block(change_type: ChangeKind, old: &[&str], new: &[&str]) -> ChangeRecord {
        ChangeRecord::block(
            "a.txt",
            change_type,
            old.iter().map(|s| s.to_string()).collect(),
            new.iter().map(|s| s.to_string()).collect(),
            Some(1),
            Some(1),
        )
    }

    #[test]
    fn test_structural_line_detection() {
        assert!(is_structural_line(""));
        assert!(is_structural_line("   "));
        assert!(is_structural_line("  });  "));
        assert!(is_structural_line(")]}"));
        assert!(!is_structural_line(";"));
        assert!(!is_structural_line("} else {"));
        assert!(!is_structural_line("value)"));
    }

    #[test]
    fn test_strip_recomputes_change_type() {
        let records = strip_structural_lines(vec![block(
            ChangeKind::Replace,
            &["let x = 1;", ")]"],
            &[")]"],
        )]);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].change_type, ChangeKind::Delete);
        assert_eq!(
            records[0].content,
            ChangeContent::Block {
                old_lines: vec!["let x = 1;".to_string()],
                new_lines: vec![],
            }
        );
    }

    #[test]
    fn test_strip_drops_fully_structural_records() {
        let records = strip_structural_lines(vec![block(ChangeKind::Replace, &["})"], &["})  "])]);
        assert!(records.is_empty());
    }

    #[test]
    fn test_promote_replaces_matching_keys() {
        let records = promote_single_line_kv(vec![block(
            ChangeKind::Replace,
            &["\"timeout\": 30,"],
            &["\"timeout\": 60,"],
        )]);

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].content,
            ChangeContent::Kv {
                property: "timeout".to_string(),
                old: Some("30".to_string()),
                new: Some("60".to_string()),
            }
        );
        assert_eq!(records[0].change_type, ChangeKind::Replace);
    }

    #[test]
    fn test_promote_keeps_mismatched_keys_as_block() {
        let input = block(ChangeKind::Replace, &["a = 1"], &["b = 2"]);
        let records = promote_single_line_kv(vec![input.clone()]);
        assert_eq!(records, vec![input]);
    }

    #[test]
    fn test_promote_keeps_equal_values_as_block() {
        let input = block(ChangeKind::Replace, &["a=1"], &["a = 1"]);
        let records = promote_single_line_kv(vec![input.clone()]);
        assert_eq!(records, vec![input]);
    }

    #[test]
    fn test_promote_handles_single_sided_records() {
        let records =
            promote_single_line_kv(vec![block(ChangeKind::Insert, &[], &["retries = 3"])]);

        assert_eq!(records[0].change_type, ChangeKind::Insert);
        assert_eq!(
            records[0].content,
            ChangeContent::Kv {
                property: "retries".to_string(),
                old: None,
                new: Some("3".to_string()),
            }
        );
    }

    #[test]
    fn test_deduplicate_keeps_first_occurrence() {
        let a = block(ChangeKind::Insert, &[], &["x"]);
        let b = block(ChangeKind::Insert, &[], &["y"]);
        let records = deduplicate(vec![a.clone(), b.clone(), a.clone()]);
        assert_eq!(records, vec![a, b]);
    }
}
