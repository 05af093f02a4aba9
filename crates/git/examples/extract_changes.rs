use anyhow::Result;
use change_extract::{extract_all, ExtractOptions, FileInput};
use git::Repository;
use std::env;

fn main() -> Result<()> {
    // Use current directory if no path provided
    let path = env::args().nth(1).unwrap_or_else(|| ".".to_string());

    // Open the repository
    let repo = Repository::open(&path)?;
    println!("Opened repository at: {}", repo.work_dir().display());

    // Compare HEAD against the working directory
    let changes = repo.changed_files(None, None, true)?;
    println!("\nChanged files: {}", changes.len());
    for change in &changes {
        match &change.old_path {
            Some(old_path) => println!("  {}: {} (from {})", change.kind, change.path, old_path),
            None => println!("  {}: {}", change.kind, change.path),
        }
    }

    // Load both versions of every changed file
    let mut inputs = Vec::new();
    for change in &changes {
        let old = repo.get_head_content(change.source_path())?;
        let new = repo.get_working_content(&change.path)?;
        inputs.push(FileInput {
            path: change.path.clone(),
            old,
            new,
        });
    }

    // Turn the pairs into structured change records
    let records = extract_all(&inputs, &ExtractOptions::default());
    println!("\nExtracted {} change records:", records.len());
    for record in &records {
        match record.property() {
            Some(property) => println!(
                "  {} [{}] {} {}",
                record.file,
                record.context(),
                record.change_type,
                property
            ),
            None => println!(
                "  {} [{}] {}",
                record.file,
                record.context(),
                record.change_type
            ),
        }
    }

    Ok(())
}
