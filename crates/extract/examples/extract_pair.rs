use anyhow::{Context, Result};
use change_extract::{apply_passes, extract_changes, ExtractOptions};
use std::env;
use std::fs;

fn main() -> Result<()> {
    println!("=== Change Extraction Example ===\n");

    let old_path = env::args()
        .nth(1)
        .expect("Usage: cargo run --example extract_pair <old_file> <new_file>");
    let new_path = env::args()
        .nth(2)
        .expect("Usage: cargo run --example extract_pair <old_file> <new_file>");

    let old_text = fs::read_to_string(&old_path)
        .with_context(|| format!("failed to read {}", old_path))?;
    let new_text = fs::read_to_string(&new_path)
        .with_context(|| format!("failed to read {}", new_path))?;

    // Extract records for the pair, using the new file's name for detection
    let records = extract_changes(&new_path, Some(&old_text), Some(&new_text));
    let records = apply_passes(records, &ExtractOptions::default());

    println!("Found {} change record(s):\n", records.len());
    for record in &records {
        println!(
            "[{}] {} at old@{:?} new@{:?}",
            record.context(),
            record.change_type,
            record.line_old,
            record.line_new
        );
        if let Some(property) = record.property() {
            println!("  property: {}", property);
        }
    }

    println!("\nAs JSON:");
    println!("{}", serde_json::to_string_pretty(&records)?);

    Ok(())
}
