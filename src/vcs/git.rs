use super::{Vcs, VcsKind};
use anyhow::{Context, Result};
use git2::{DescribeFormatOptions, DescribeOptions, Repository, build::CheckoutBuilder};
use std::path::Path;

/// Git backend driven through libgit2.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitVcs;

fn open(dir: &Path) -> Result<Repository> {
    Repository::discover(dir).with_context(|| format!("Failed to open git repository at {}", dir.display()))
}

fn find_commit<'r>(repo: &'r Repository, rev: &str) -> Result<git2::Commit<'r>> {
    let commit = repo
        .revparse_single(rev)
        .and_then(|obj| obj.peel_to_commit())
        .with_context(|| format!("unknown revision {}", rev))?;
    Ok(commit)
}

impl Vcs for GitVcs {
    fn kind(&self) -> VcsKind {
        VcsKind::Git
    }

    fn identify(&self, dir: &Path) -> Result<String> {
        let repo = open(dir)?;
        let head = repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .with_context(|| format!("{}: no HEAD commit", dir.display()))?;
        Ok(head.id().to_string())
    }

    fn exists(&self, dir: &Path, rev: &str) -> bool {
        open(dir).is_ok_and(|repo| find_commit(&repo, rev).is_ok())
    }

    fn is_dirty(&self, dir: &Path, rev: &str) -> bool {
        let check = || -> Result<bool> {
            let repo = open(dir)?;
            let tree = find_commit(&repo, rev)?.tree()?;
            let diff = repo.diff_tree_to_workdir_with_index(Some(&tree), None)?;
            Ok(diff.deltas().len() > 0)
        };
        check().unwrap_or(true)
    }

    fn describe(&self, dir: &Path, rev: &str) -> String {
        let describe = || -> Result<String> {
            let repo = open(dir)?;
            let obj = repo.revparse_single(rev)?;
            let mut opts = DescribeOptions::new();
            opts.describe_tags().show_commit_oid_as_fallback(true);
            let text = obj.describe(&opts)?.format(Some(&DescribeFormatOptions::new()))?;
            Ok(text)
        };
        describe().unwrap_or_else(|e| {
            log::debug!("{}: describe {} failed: {:#}", dir.display(), rev, e);
            String::new()
        })
    }

    fn download(&self, dir: &Path) -> Result<()> {
        let repo = open(dir)?;
        let mut remote = repo
            .find_remote("origin")
            .with_context(|| format!("{}: no 'origin' remote", dir.display()))?;
        remote
            .fetch(&[] as &[&str], None, None)
            .with_context(|| format!("Failed to fetch {}", dir.display()))?;
        Ok(())
    }

    fn rev_sync(&self, dir: &Path, rev: &str) -> Result<()> {
        let repo = open(dir)?;
        let commit = find_commit(&repo, rev)?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_tree(commit.as_object(), Some(&mut checkout))
            .with_context(|| format!("Failed to checkout {}", rev))?;
        repo.set_head_detached(commit.id())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{commit_all, init_repo, tag};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_identify_exists_and_describe() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(tmp.path());
        fs::write(tmp.path().join("a.go"), "package a\n").unwrap();
        let first = commit_all(&repo, "first");
        tag(&repo, "v1.0.0", first);

        let vcs = GitVcs;
        let head = vcs.identify(tmp.path()).unwrap();
        assert_eq!(head, first.to_string());
        assert!(vcs.exists(tmp.path(), &head));
        assert!(!vcs.exists(tmp.path(), "0000000000000000000000000000000000000000"));
        assert_eq!(vcs.describe(tmp.path(), &head), "v1.0.0");

        fs::write(tmp.path().join("b.go"), "package a\n").unwrap();
        let second = commit_all(&repo, "second");
        assert!(vcs.describe(tmp.path(), &second.to_string()).starts_with("v1.0.0-1-g"));
    }

    #[test]
    fn test_dirty_and_rev_sync() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(tmp.path());
        let file = tmp.path().join("a.go");
        fs::write(&file, "package a\n").unwrap();
        let first = commit_all(&repo, "first").to_string();
        fs::write(&file, "package a\n\nvar X = 1\n").unwrap();
        let second = commit_all(&repo, "second").to_string();

        let vcs = GitVcs;
        assert!(!vcs.is_dirty(tmp.path(), &second));
        assert!(vcs.is_dirty(tmp.path(), &first));
        assert!(vcs.is_dirty(tmp.path(), "not-a-revision"));

        vcs.rev_sync(tmp.path(), &first).unwrap();
        assert_eq!(fs::read_to_string(&file).unwrap(), "package a\n");
        assert_eq!(vcs.identify(tmp.path()).unwrap(), first);
        assert!(!vcs.is_dirty(tmp.path(), &first));

        fs::write(&file, "edited\n").unwrap();
        assert!(vcs.is_dirty(tmp.path(), &first));
    }

    #[test]
    fn test_download_without_origin_fails() {
        let tmp = TempDir::new().unwrap();
        let repo = init_repo(tmp.path());
        fs::write(tmp.path().join("a.go"), "package a\n").unwrap();
        commit_all(&repo, "first");
        assert!(GitVcs.download(tmp.path()).is_err());
    }

    #[test]
    fn test_download_fetches_from_origin() {
        let upstream = TempDir::new().unwrap();
        let up = init_repo(upstream.path());
        fs::write(upstream.path().join("a.go"), "package a\n").unwrap();
        commit_all(&up, "first");

        let clone = TempDir::new().unwrap();
        let url = upstream.path().to_str().unwrap();
        Repository::clone(url, clone.path()).unwrap();

        fs::write(upstream.path().join("b.go"), "package a\n").unwrap();
        let newer = commit_all(&up, "second").to_string();

        let vcs = GitVcs;
        assert!(!vcs.exists(clone.path(), &newer));
        vcs.download(clone.path()).unwrap();
        assert!(vcs.exists(clone.path(), &newer));
        vcs.rev_sync(clone.path(), &newer).unwrap();
        assert!(clone.path().join("b.go").exists());
    }
}
