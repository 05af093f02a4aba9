use similar::{Algorithm, ChangeTag, TextDiff};

use crate::record::{ChangeKind, ChangeRecord};

/// A run of removed/added lines being collected while walking the diff
#[derive(Default)]
struct PendingRun {
    old_lines: Vec<String>,
    new_lines: Vec<String>,
    old_start: Option<usize>,
    new_start: Option<usize>,
}

impl PendingRun {
    fn push_old(&mut self, index: Option<usize>, line: &str) {
        if self.old_start.is_none() {
            self.old_start = index.map(|i| i + 1);
        }
        self.old_lines.push(strip_line_ending(line).to_string());
    }

    fn push_new(&mut self, index: Option<usize>, line: &str) {
        if self.new_start.is_none() {
            self.new_start = index.map(|i| i + 1);
        }
        self.new_lines.push(strip_line_ending(line).to_string());
    }

    /// Emit the collected run as a single record and reset
    fn flush(&mut self, file: &str, records: &mut Vec<ChangeRecord>) {
        if self.old_lines.is_empty() && self.new_lines.is_empty() {
            return;
        }

        let change_type = if !self.old_lines.is_empty() && !self.new_lines.is_empty() {
            ChangeKind::Replace
        } else if !self.old_lines.is_empty() {
            ChangeKind::Delete
        } else {
            ChangeKind::Insert
        };

        records.push(ChangeRecord::block(
            file,
            change_type,
            std::mem::take(&mut self.old_lines),
            std::mem::take(&mut self.new_lines),
            self.old_start.take(),
            self.new_start.take(),
        ));
    }
}

/// Compute block-context records for a plain text file pair.
///
/// Maximal contiguous runs of removed/added lines collapse into one record
/// each: removals only become a delete, additions only an insert, and a mixed
/// run becomes a replace carrying both sides. Line numbers are the first
/// affected 1-based line in each version.
pub fn block_changes(file: &str, old_text: &str, new_text: &str) -> Vec<ChangeRecord> {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_lines(old_text, new_text);

    let mut records = Vec::new();
    let mut run = PendingRun::default();

    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Equal => {
                run.flush(file, &mut records);
            }
            ChangeTag::Delete => {
                run.push_old(change.old_index(), change.value());
            }
            ChangeTag::Insert => {
                run.push_new(change.new_index(), change.value());
            }
        }
    }
    run.flush(file, &mut records);

    records
}

fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
