//! Version-control adapters.
//!
//! Each backend implements [`Vcs`]. The [`VcsRegistry`] finds the backend for
//! a package directory by walking upward until a repository marker such as
//! `.git` appears, and caches the adapter by repository root so a repository
//! is only detected once per run.

mod command;
mod git;

pub use command::CommandVcs;
pub use git::GitVcs;

use crate::error::Error;
use anyhow::Result;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Capabilities the workflows need from a repository.
pub trait Vcs: Send + Sync + fmt::Debug {
    fn kind(&self) -> VcsKind;

    /// Revision currently checked out in `dir`.
    fn identify(&self, dir: &Path) -> Result<String>;

    /// Whether `rev` is available locally.
    fn exists(&self, dir: &Path, rev: &str) -> bool;

    /// Whether the working tree differs from `rev`. Failures count as dirty.
    fn is_dirty(&self, dir: &Path, rev: &str) -> bool;

    /// Human-readable tag or description of `rev`; empty when unknown.
    fn describe(&self, dir: &Path, rev: &str) -> String;

    /// Fetch new history from the repository's default remote.
    fn download(&self, dir: &Path) -> Result<()>;

    /// Force the working tree to exactly `rev`.
    fn rev_sync(&self, dir: &Path, rev: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsKind {
    Git,
    Mercurial,
    Bazaar,
    Subversion,
}

impl VcsKind {
    pub const ALL: [VcsKind; 4] = [
        VcsKind::Git,
        VcsKind::Mercurial,
        VcsKind::Bazaar,
        VcsKind::Subversion,
    ];

    /// Directory entry that marks a repository root.
    pub fn marker(self) -> &'static str {
        match self {
            VcsKind::Git => ".git",
            VcsKind::Mercurial => ".hg",
            VcsKind::Bazaar => ".bzr",
            VcsKind::Subversion => ".svn",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VcsKind::Git => "git",
            VcsKind::Mercurial => "hg",
            VcsKind::Bazaar => "bzr",
            VcsKind::Subversion => "svn",
        }
    }

    pub fn adapter(self) -> Arc<dyn Vcs> {
        match self {
            VcsKind::Git => Arc::new(GitVcs),
            other => Arc::new(CommandVcs::new(other)),
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

type Detector = Box<dyn Fn(&Path) -> Option<Arc<dyn Vcs>> + Send + Sync>;

/// Repository-root → adapter table plus the detectors used to fill it.
pub struct VcsRegistry {
    detectors: Vec<Detector>,
    roots: HashMap<PathBuf, Arc<dyn Vcs>>,
}

impl Default for VcsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl VcsRegistry {
    /// Registry recognizing git, mercurial, bazaar and subversion.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for kind in VcsKind::ALL {
            registry.register(move |dir| {
                dir.join(kind.marker()).exists().then(|| kind.adapter())
            });
        }
        registry
    }

    pub fn empty() -> Self {
        Self {
            detectors: Vec::new(),
            roots: HashMap::new(),
        }
    }

    /// Add a detector; it is tried after those already registered.
    pub fn register(
        &mut self,
        detector: impl Fn(&Path) -> Option<Arc<dyn Vcs>> + Send + Sync + 'static,
    ) {
        self.detectors.push(Box::new(detector));
    }

    /// Find the repository containing `dir`, searching no higher than just
    /// below `stop` (the workspace `src/` directory).
    pub fn lookup(&mut self, dir: &Path, stop: &Path) -> Result<(Arc<dyn Vcs>, PathBuf), Error> {
        for candidate in dir.ancestors() {
            if candidate == stop || !candidate.starts_with(stop) {
                break;
            }
            if let Some(vcs) = self.roots.get(candidate) {
                return Ok((Arc::clone(vcs), candidate.to_path_buf()));
            }
            if let Some(vcs) = self.detectors.iter().find_map(|detect| detect(candidate)) {
                log::debug!("{}: {} repository", candidate.display(), vcs.kind());
                self.roots.insert(candidate.to_path_buf(), Arc::clone(&vcs));
                return Ok((vcs, candidate.to_path_buf()));
            }
        }
        Err(Error::UnrecognizedRepository(dir.to_path_buf()))
    }

    pub fn cached_roots(&self) -> usize {
        self.roots.len()
    }
}

/// `root` relative to `base` as a slash-separated import path.
pub fn import_path_of(root: &Path, base: &Path) -> Option<String> {
    let rel = root.strip_prefix(base).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}
