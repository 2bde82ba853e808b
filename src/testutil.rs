//! Fixtures shared by unit tests: throwaway git repositories laid out in a
//! workspace, and an in-memory [`PackageLoader`].

use crate::loader::{Package, PackageLoader};
use anyhow::{Result, anyhow};
use git2::{Oid, Repository, Signature};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn init_repo(dir: &Path) -> Repository {
    fs::create_dir_all(dir).unwrap();
    Repository::init(dir).unwrap()
}

/// Stage everything in the working tree and commit it on HEAD.
pub fn commit_all(repo: &Repository, message: &str) -> Oid {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::now("gopin", "gopin@example.com").unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

pub fn tag(repo: &Repository, name: &str, oid: Oid) {
    let obj = repo.find_object(oid, None).unwrap();
    repo.tag_lightweight(name, &obj, false).unwrap();
}

/// A GOPATH-style workspace (`<root>/src/<import path>`) in a temp dir.
pub struct Workspace {
    tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> PathBuf {
        self.tmp.path().to_path_buf()
    }

    pub fn src(&self) -> PathBuf {
        self.tmp.path().join("src")
    }

    pub fn dir(&self, import_path: &str) -> PathBuf {
        import_path
            .split('/')
            .fold(self.src(), |dir, part| dir.join(part))
    }

    pub fn repo(&self, import_path: &str) -> TestRepo {
        let dir = self.dir(import_path);
        TestRepo {
            repo: init_repo(&dir),
            dir,
        }
    }

    /// Metadata for the package at `import_path`, as `go list` would report
    /// it. The directory is created if missing.
    pub fn package(&self, import_path: &str, deps: &[&str]) -> Package {
        let dir = self.dir(import_path);
        fs::create_dir_all(&dir).unwrap();
        Package {
            dir,
            root: self.root(),
            import_path: import_path.to_string(),
            deps: deps.iter().map(|d| d.to_string()).collect(),
            ..Package::default()
        }
    }
}

pub struct TestRepo {
    repo: Repository,
    dir: PathBuf,
}

impl TestRepo {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn commit_file(&self, name: &str, contents: &str) -> Oid {
        let path = self.dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
        commit_all(&self.repo, name)
    }

    /// Tag HEAD.
    pub fn tag(&self, name: &str) {
        let head = self.repo.head().unwrap().peel_to_commit().unwrap().id();
        tag(&self.repo, name, head);
    }

    /// Force the working tree to `oid`, detaching HEAD.
    pub fn checkout(&self, oid: Oid) {
        let obj = self.repo.find_object(oid, None).unwrap();
        let mut opts = git2::build::CheckoutBuilder::new();
        opts.force();
        self.repo.checkout_tree(&obj, Some(&mut opts)).unwrap();
        self.repo.set_head_detached(oid).unwrap();
    }
}

/// In-memory toolchain. Unknown packages come back with an error record,
/// like `go list -e` does.
#[derive(Default)]
pub struct FakeLoader {
    packages: RefCell<HashMap<String, Package>>,
    remote: RefCell<HashMap<String, Package>>,
    aliases: RefCell<HashMap<String, String>>,
    pub fetched: RefCell<Vec<String>>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard(import_path: &str) -> Package {
        Package {
            import_path: import_path.to_string(),
            dir: PathBuf::from("/goroot/src").join(import_path),
            root: PathBuf::from("/goroot"),
            standard: true,
            ..Package::default()
        }
    }

    pub fn add(&self, pkg: Package) {
        self.packages
            .borrow_mut()
            .insert(pkg.import_path.clone(), pkg);
    }

    /// Make `pkg` loadable only after it has been fetched.
    pub fn add_remote(&self, pkg: Package) {
        self.remote.borrow_mut().insert(pkg.import_path.clone(), pkg);
    }

    /// Resolve `name` (e.g. `.`) to `import_path`.
    pub fn alias(&self, name: &str, import_path: &str) {
        self.aliases
            .borrow_mut()
            .insert(name.to_string(), import_path.to_string());
    }
}

impl PackageLoader for FakeLoader {
    fn load(&self, names: &[String]) -> Result<Vec<Package>> {
        let packages = self.packages.borrow();
        let aliases = self.aliases.borrow();
        Ok(names
            .iter()
            .map(|name| {
                let path = aliases.get(name).unwrap_or(name);
                packages.get(path).cloned().unwrap_or_else(|| {
                    let mut missing = Package {
                        import_path: path.clone(),
                        ..Package::default()
                    };
                    missing.set_error(format!("cannot find package \"{}\"", path));
                    missing
                })
            })
            .collect())
    }

    fn toolchain_version(&self) -> Result<String> {
        Ok("go1.5.1".to_string())
    }

    fn fetch(&self, import_path: &str) -> Result<()> {
        self.fetched.borrow_mut().push(import_path.to_string());
        let pkg = self
            .remote
            .borrow_mut()
            .remove(import_path)
            .ok_or_else(|| anyhow!("unrecognized import path \"{}\"", import_path))?;
        self.add(pkg);
        Ok(())
    }
}
