use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use change_extract::{extract_all, ChangeRecord, CommitAttribution, ExtractOptions, FileInput};
use chrono::{TimeZone, Utc};
use git::{FileChange, FileChangeKind, Repository};
use log::{debug, info, warn};
use path_clean::PathClean;

use crate::cli::{Cli, Mode};
use crate::output;

/// Resolve the requested comparison, extract its records, and emit them.
pub fn run(cli: &Cli) -> Result<()> {
    let options = ExtractOptions {
        strip_structural_lines: cli.strip_structural_lines,
        promote_single_line_kv: cli.promote_single_line_kv,
    };

    let records = match cli.mode()? {
        Mode::Repository(path) => scan_repository(cli, &path, &options)?,
        Mode::FilePair(old, new) => compare_files(&old, &new, &options)?,
    };
    info!("Extracted {} change records", records.len());

    match &cli.output_json {
        Some(path) => output::write_json(path, &records)?,
        None => output::print_records(&records),
    }

    Ok(())
}

fn scan_repository(cli: &Cli, path: &Path, options: &ExtractOptions) -> Result<Vec<ChangeRecord>> {
    let repo = Repository::open(path)?;
    let changes = repo.changed_files(
        cli.from_rev.as_deref(),
        cli.to_rev.as_deref(),
        cli.include_untracked,
    )?;
    info!(
        "Found {} changed files in {}",
        changes.len(),
        repo.work_dir().display()
    );

    let baseline = cli.from_rev.as_deref().unwrap_or("HEAD");
    let mut inputs = Vec::new();
    let mut skipped = 0usize;
    for change in &changes {
        match load_sides(&repo, baseline, cli.to_rev.as_deref(), change) {
            Ok((old, new)) => inputs.push(FileInput {
                path: change.path.clone(),
                old,
                new,
            }),
            Err(err) => {
                warn!("Skipping {}: {:#}", change.path, err);
                skipped += 1;
            }
        }
    }
    if inputs.is_empty() && !changes.is_empty() {
        bail!(
            "none of the {} changed files could be read",
            changes.len()
        );
    }
    if skipped > 0 {
        info!("Skipped {} of {} changed files", skipped, changes.len());
    }

    let mut records = extract_all(&inputs, options);
    if log::log_enabled!(log::Level::Debug) {
        for input in &inputs {
            let count = records.iter().filter(|record| record.file == input.path).count();
            debug!("{}: {} change records", input.path, count);
        }
    }

    if !cli.no_commit_info {
        annotate_commits(&repo, &mut records);
    }
    Ok(records)
}

// Repository reads stay sequential; extraction fans out per file afterwards.
fn load_sides(
    repo: &Repository,
    baseline: &str,
    to_rev: Option<&str>,
    change: &FileChange,
) -> Result<(Option<String>, Option<String>)> {
    let old = match change.kind {
        // An untracked file has no committed counterpart to fetch
        FileChangeKind::Untracked => None,
        _ => repo.get_content_at_revision(baseline, change.source_path())?,
    };
    let new = match to_rev {
        Some(rev) => repo.get_content_at_revision(rev, &change.path)?,
        None => repo.get_working_content(&change.path)?,
    };
    Ok((old, new))
}

fn annotate_commits(repo: &Repository, records: &mut [ChangeRecord]) {
    let mut cache: HashMap<String, Option<CommitAttribution>> = HashMap::new();
    for record in records.iter_mut() {
        let attribution = cache.entry(record.file.clone()).or_insert_with(|| {
            match repo.last_commit_for_path(&record.file) {
                Ok(commit) => commit.map(attribution_from),
                Err(err) => {
                    warn!("No commit information for {}: {:#}", record.file, err);
                    None
                }
            }
        });
        record.commit = attribution.clone();
    }
}

fn attribution_from(commit: git::Commit) -> CommitAttribution {
    let date = Utc
        .timestamp_opt(commit.time, 0)
        .single()
        .map(|date| date.to_rfc3339())
        .unwrap_or_default();
    CommitAttribution {
        hash: commit.id,
        author: format!("{} <{}>", commit.author_name, commit.author_email),
        date,
        message: commit.message,
    }
}

fn compare_files(
    old_path: &Path,
    new_path: &Path,
    options: &ExtractOptions,
) -> Result<Vec<ChangeRecord>> {
    let old = fs::read_to_string(old_path)
        .with_context(|| format!("Failed to read {}", old_path.display()))?;
    let new = fs::read_to_string(new_path)
        .with_context(|| format!("Failed to read {}", new_path.display()))?;

    let inputs = vec![FileInput {
        path: display_path(new_path),
        old: Some(old),
        new: Some(new),
    }];
    Ok(extract_all(&inputs, options))
}

// Records carry the new side of the pair, cleaned and shown relative to the
// current directory where possible.
fn display_path(path: &Path) -> String {
    let cleaned = path.clean();
    let relative = env::current_dir()
        .ok()
        .and_then(|cwd| pathdiff::diff_paths(&cleaned, cwd));
    relative.unwrap_or(cleaned).to_string_lossy().into_owned()
}
