use anyhow::{anyhow, bail, Context, Result};
use git2::{DiffFindOptions, DiffOptions, Repository as Git2Repository, Sort};
use std::path::{Path, PathBuf};

use crate::changes::FileChange;

/// Represents a git commit
#[derive(Debug, Clone)]
pub struct Commit {
    /// The commit's SHA-1 hash
    pub id: String,
    /// The commit's short hash (first 7 characters)
    pub short_id: String,
    /// The first line of the commit message
    pub message: String,
    /// The commit author name
    pub author_name: String,
    /// The commit author email
    pub author_email: String,
    /// The commit timestamp (seconds since epoch)
    pub time: i64,
}

impl Commit {
    fn from_git2(commit: &git2::Commit) -> Self {
        let message = commit
            .message()
            .unwrap_or("")
            .lines()
            .next()
            .unwrap_or("")
            .to_string();

        let author = commit.author();

        Self {
            id: commit.id().to_string(),
            short_id: format!("{:.7}", commit.id()),
            message,
            author_name: author.name().unwrap_or("Unknown").to_string(),
            author_email: author.email().unwrap_or("").to_string(),
            time: commit.time().seconds(),
        }
    }
}

/// A wrapper around git2::Repository with additional functionality
pub struct Repository {
    /// The underlying git2 repository
    inner: Git2Repository,
    /// The repository's working directory
    work_dir: PathBuf,
}

impl Repository {
    /// Open a git repository at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let repo = Git2Repository::discover(path)
            .with_context(|| format!("Failed to discover git repository at {}", path.display()))?;

        let work_dir = repo
            .workdir()
            .ok_or_else(|| anyhow!("Repository has no working directory"))?
            .to_path_buf();

        Ok(Self {
            inner: repo,
            work_dir,
        })
    }

    /// Get the repository's working directory
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// List the files that differ between two repository snapshots.
    ///
    /// The baseline is `from_rev`, defaulting to HEAD. With `to_rev` set the
    /// comparison runs between the two revision trees; without it the baseline
    /// tree is compared against the working directory through the index, so
    /// staged changes are visible too. Renames are detected and reported under
    /// the new path. Untracked files only appear when `include_untracked` is
    /// set and the new side is the working directory.
    pub fn changed_files(
        &self,
        from_rev: Option<&str>,
        to_rev: Option<&str>,
        include_untracked: bool,
    ) -> Result<Vec<FileChange>> {
        let old_tree = match from_rev {
            Some(rev) => Some(self.revision_tree(rev)?),
            None => match self.revision_tree("HEAD") {
                Ok(tree) => Some(tree),
                // an unborn branch has no baseline tree
                Err(_) if self.inner.head().is_err() => None,
                Err(err) => return Err(err),
            },
        };

        let mut diff_opts = DiffOptions::new();
        if include_untracked {
            diff_opts.include_untracked(true).recurse_untracked_dirs(true);
        }

        let mut diff = match to_rev {
            Some(rev) => {
                let new_tree = self.revision_tree(rev)?;
                self.inner.diff_tree_to_tree(
                    old_tree.as_ref(),
                    Some(&new_tree),
                    Some(&mut diff_opts),
                )?
            }
            None => self
                .inner
                .diff_tree_to_workdir_with_index(old_tree.as_ref(), Some(&mut diff_opts))?,
        };

        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))?;

        let mut changes = Vec::new();
        diff.foreach(
            &mut |delta, _| {
                if let Some(change) = FileChange::from_delta(&delta) {
                    changes.push(change);
                }
                true
            },
            None,
            None,
            None,
        )?;

        Ok(changes)
    }

    /// Get the content of a file from the repository HEAD
    pub fn get_head_content(&self, path: &str) -> Result<Option<String>> {
        self.get_content_at_revision("HEAD", path)
    }

    /// Get the content of a file at a specific commit/revision.
    ///
    /// Returns `None` when the file does not exist at that revision. Binary
    /// or non-UTF-8 content is an error so the caller can skip the file.
    pub fn get_content_at_revision(&self, revision: &str, path: &str) -> Result<Option<String>> {
        let obj = self
            .inner
            .revparse_single(revision)
            .with_context(|| format!("Failed to resolve revision '{}'", revision))?;

        let commit = obj.peel_to_commit()?;
        let tree = commit.tree()?;

        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(_) => return Ok(None),
        };

        let blob = entry.to_object(&self.inner)?.peel_to_blob()?;
        if blob.is_binary() {
            bail!("{} is binary at {}", path, revision);
        }
        let content = String::from_utf8(blob.content().to_vec())
            .with_context(|| format!("{} is not valid UTF-8 at {}", path, revision))?;

        Ok(Some(content))
    }

    /// Get the content of a file from the working directory
    pub fn get_working_content(&self, path: &str) -> Result<Option<String>> {
        let full_path = self.work_dir.join(path);
        if !full_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&full_path)
            .with_context(|| format!("Failed to read file {}", full_path.display()))?;

        Ok(Some(content))
    }

    /// Get the content of a file from the index (staging area)
    pub fn get_index_content(&self, path: &str) -> Result<Option<String>> {
        let index = self.inner.index()?;

        let id = match index.get_path(Path::new(path), 0) {
            Some(entry) => entry.id,
            None => return Ok(None),
        };

        let blob = self.inner.find_blob(id)?;
        if blob.is_binary() {
            bail!("{} is binary in the index", path);
        }
        let content = String::from_utf8(blob.content().to_vec())
            .with_context(|| format!("{} is not valid UTF-8 in the index", path))?;

        Ok(Some(content))
    }

    /// Find the newest commit that changed the given path.
    ///
    /// A commit counts as changing the path when the tree entry differs from
    /// its first parent's, including creations and deletions.
    pub fn last_commit_for_path(&self, path: &str) -> Result<Option<Commit>> {
        if self.inner.head().is_err() {
            return Ok(None);
        }

        let mut revwalk = self.inner.revwalk()?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
        revwalk.push_head()?;

        let target = Path::new(path);
        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = self.inner.find_commit(oid)?;

            let entry_id = commit.tree()?.get_path(target).ok().map(|entry| entry.id());
            let parent_entry_id = match commit.parent(0) {
                Ok(parent) => parent.tree()?.get_path(target).ok().map(|entry| entry.id()),
                Err(_) => None,
            };

            if entry_id != parent_entry_id {
                return Ok(Some(Commit::from_git2(&commit)));
            }
        }

        Ok(None)
    }

    fn revision_tree(&self, revision: &str) -> Result<git2::Tree<'_>> {
        let obj = self
            .inner
            .revparse_single(revision)
            .with_context(|| format!("Failed to resolve revision '{}'", revision))?;
        let commit = obj
            .peel_to_commit()
            .with_context(|| format!("Revision '{}' does not point to a commit", revision))?;
        Ok(commit.tree()?)
    }
}
