//! Turning loaded packages into pinned dependencies.

use crate::error::Error;
use crate::loader::{Package, PackageLoader};
use crate::manifest::Dependency;
use crate::vcs::{VcsRegistry, import_path_of};
use anyhow::Result;
use std::collections::BTreeSet;

/// Resolve every third-party package that `pkgs` (the project's own
/// packages) depend on, including test-only imports.
///
/// Packages inside `project` or inside an already-recorded dependency are
/// skipped; the repository copy of the parent covers them. Per-package
/// failures are logged and reported together as [`Error::Batch`].
pub fn resolve_dependencies(
    loader: &dyn PackageLoader,
    registry: &mut VcsRegistry,
    project: &str,
    pkgs: &[Package],
) -> Result<Vec<Dependency>> {
    let mut failed = 0;
    let mut seen: Vec<String> = vec![project.to_string()];
    let mut paths = BTreeSet::new();
    let mut test_imports = BTreeSet::new();

    for pkg in pkgs {
        if let Some(err) = pkg.error_message() {
            log::error!("{}: {}", pkg.import_path, err);
            failed += 1;
            continue;
        }
        seen.push(pkg.import_path.clone());
        paths.extend(pkg.deps.iter().cloned());
        test_imports.extend(pkg.test_imports.iter().cloned());
        test_imports.extend(pkg.x_test_imports.iter().cloned());
    }

    let test_imports: Vec<String> = test_imports
        .into_iter()
        .filter(|p| !is_within(&seen, p))
        .collect();
    for pkg in loader.load(&test_imports)? {
        if pkg.standard {
            continue;
        }
        if let Some(err) = pkg.error_message() {
            log::error!("{}: {}", pkg.import_path, err);
            failed += 1;
            continue;
        }
        paths.insert(pkg.import_path.clone());
        paths.extend(pkg.deps);
    }

    paths.remove("C");
    let paths: Vec<String> = paths.into_iter().filter(|p| !is_within(&seen, p)).collect();
    let mut loaded = loader.load(&paths)?;
    loaded.sort_by(|a, b| a.import_path.cmp(&b.import_path));

    let mut deps = Vec::new();
    for pkg in &loaded {
        if let Some(err) = pkg.error_message() {
            log::error!("{}: {}", pkg.import_path, err);
            failed += 1;
            continue;
        }
        if pkg.standard || is_within(&seen, &pkg.import_path) {
            continue;
        }
        match dependency_for(registry, pkg) {
            Ok(dep) => {
                log::debug!("{} at {}", dep.import_path, dep.rev);
                seen.push(dep.import_path.clone());
                deps.push(dep);
            }
            Err(e) => {
                log::error!("{}: {:#}", pkg.import_path, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(Error::Batch {
            operation: "resolving dependencies",
            count: failed,
        }
        .into());
    }
    Ok(deps)
}

/// `path` equals or is nested under one of `roots`.
pub fn is_within(roots: &[String], path: &str) -> bool {
    roots.iter().any(|root| {
        path.strip_prefix(root.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// Pin `pkg` at whatever revision its workspace checkout is on.
pub fn dependency_for(registry: &mut VcsRegistry, pkg: &Package) -> Result<Dependency> {
    if pkg.standard {
        return Err(Error::StandardPackage(pkg.import_path.clone()).into());
    }
    let src = pkg.root.join("src");
    let (vcs, repo_root) = registry.lookup(&pkg.dir, &src)?;
    let rev = vcs.identify(&pkg.dir)?;
    if vcs.is_dirty(&pkg.dir, &rev) {
        return Err(Error::DirtyWorkingTree(pkg.dir.display().to_string()).into());
    }
    let comment = vcs.describe(&pkg.dir, &rev);
    Ok(Dependency {
        import_path: pkg.import_path.clone(),
        comment,
        rev,
        dir: pkg.dir.clone(),
        ws: pkg.root.clone(),
        root: import_path_of(&repo_root, &src).unwrap_or_default(),
        vcs: Some(vcs),
        matched: false,
    })
}
