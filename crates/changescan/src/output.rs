use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use change_extract::{ChangeContent, ChangeRecord};

/// Serialize the records to `path` as a pretty-printed JSON array.
pub fn write_json(path: &Path, records: &[ChangeRecord]) -> Result<()> {
    let json =
        serde_json::to_string_pretty(records).context("Failed to serialize change records")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Print the records to stdout as a compact listing, one entry per record.
pub fn print_records(records: &[ChangeRecord]) {
    for record in records {
        print_record(record);
    }
}

fn print_record(record: &ChangeRecord) {
    println!(
        "\n--- {} [{}] old@{} new@{} ---",
        record.file,
        record.context(),
        anchor(record.line_old),
        anchor(record.line_new),
    );
    println!("Property: {}", record.property().unwrap_or(""));

    let (old_block, new_block) = match &record.content {
        ChangeContent::Block {
            old_lines,
            new_lines,
        } => (old_lines.join("\n"), new_lines.join("\n")),
        ChangeContent::Kv { old, new, .. } | ChangeContent::PlistKv { old, new, .. } => (
            old.clone().unwrap_or_default(),
            new.clone().unwrap_or_default(),
        ),
    };
    if !old_block.is_empty() {
        println!("OLD: {old_block}");
    }
    if !new_block.is_empty() {
        println!("NEW: {new_block}");
    }
    println!("{}", "-".repeat(60));
}

fn anchor(line: Option<usize>) -> String {
    match line {
        Some(line) => line.to_string(),
        None => "-".to_string(),
    }
}
