use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

/// How the two comparison endpoints are chosen.
pub enum Mode {
    /// Walk a repository for changed files.
    Repository(PathBuf),
    /// Compare two files on disk directly.
    FilePair(PathBuf, PathBuf),
}

#[derive(Parser)]
#[command(name = "changescan")]
#[command(about = "Extract structured change records from a repository or a pair of files")]
pub struct Cli {
    /// Repository to scan for changed files (the root is discovered from any path inside it)
    #[arg(long)]
    pub repo_path: Option<PathBuf>,

    /// Baseline revision for the comparison (defaults to HEAD)
    #[arg(long, requires = "repo_path")]
    pub from_rev: Option<String>,

    /// Compare the baseline against this revision instead of the working tree
    #[arg(long, requires = "repo_path")]
    pub to_rev: Option<String>,

    /// Also report files the repository does not track yet
    #[arg(long, requires = "repo_path")]
    pub include_untracked: bool,

    /// Old side of a standalone file comparison
    #[arg(long, requires = "compare_file_2", conflicts_with = "repo_path")]
    pub compare_file_1: Option<PathBuf>,

    /// New side of a standalone file comparison
    #[arg(long, requires = "compare_file_1")]
    pub compare_file_2: Option<PathBuf>,

    /// Write the records to this file as a JSON array instead of printing them
    #[arg(long)]
    pub output_json: Option<PathBuf>,

    /// Drop diff lines that only open or close a block
    #[arg(long)]
    pub strip_structural_lines: bool,

    /// Rewrite single-line block edits that look like key = value into kv records
    #[arg(long)]
    pub promote_single_line_kv: bool,

    /// Skip the last-commit lookup for each changed file
    #[arg(long, requires = "repo_path")]
    pub no_commit_info: bool,
}

impl Cli {
    pub fn mode(&self) -> Result<Mode> {
        match (&self.repo_path, &self.compare_file_1, &self.compare_file_2) {
            (Some(repo), None, None) => Ok(Mode::Repository(repo.clone())),
            (None, Some(old), Some(new)) => Ok(Mode::FilePair(old.clone(), new.clone())),
            (None, None, None) => {
                bail!("nothing to compare: pass --repo-path or --compare-file-1/--compare-file-2")
            }
            _ => bail!("--repo-path cannot be combined with --compare-file-1/--compare-file-2"),
        }
    }
}
