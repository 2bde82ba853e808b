//! Pin carrying and manifest diffing.

use crate::error::Error;
use crate::manifest::{Dependency, Manifest};

/// Copy revisions from `old` into `new` for every dependency already pinned.
///
/// A dependency with no exact entry in `old` must agree with every old entry
/// from the same repository, whether that entry is a parent package or lives
/// under the new dependency's repository root. Any disagreement is a
/// [`Error::RevisionConflict`].
pub fn carry_versions(old: &Manifest, new: &mut Manifest) -> Result<(), Error> {
    for dep in &mut new.deps {
        carry_version(old, dep)?;
    }
    Ok(())
}

pub fn carry_version(old: &Manifest, dep: &mut Dependency) -> Result<(), Error> {
    if let Some(pinned) = old.get(&dep.import_path) {
        // Legacy list entries have no revision and pin nothing.
        if !pinned.rev.is_empty() {
            dep.rev = pinned.rev.clone();
            dep.comment = pinned.comment.clone();
        }
        return Ok(());
    }

    let related = old.deps.iter().filter(|o| !o.rev.is_empty()).find(|o| {
        let nested = is_under(&dep.import_path, &o.import_path);
        let same_repo = !dep.root.is_empty() && is_under(&o.import_path, &dep.root);
        (nested || same_repo) && o.rev != dep.rev
    });
    match related {
        Some(o) => Err(Error::RevisionConflict {
            import_path: dep.import_path.clone(),
            have: dep.rev.clone(),
            conflicts_with: o.import_path.clone(),
            want: o.rev.clone(),
        }),
        None => Ok(()),
    }
}

fn is_under(path: &str, parent: &str) -> bool {
    path.strip_prefix(parent).is_some_and(|rest| rest.starts_with('/'))
}

/// Entries of `a` whose import path does not appear in `b`, in `a`'s order.
pub fn sub_deps(a: &[Dependency], b: &[Dependency]) -> Vec<Dependency> {
    a.iter()
        .filter(|da| !b.iter().any(|db| db.import_path == da.import_path))
        .cloned()
        .collect()
}

/// Same import paths at the same revisions, in the same order.
pub fn eq_deps(a: &[Dependency], b: &[Dependency]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.import_path == y.import_path && x.rev == y.rev)
}
