//! `gopin outdated`: list dependencies whose workspace checkout is not at
//! the pinned revision.

use super::update::match_pattern;
use crate::config::Config;
use crate::error::Error;
use crate::loader::{Package, PackageLoader};
use crate::manifest::{Manifest, ManifestLocation};
use crate::ui::{self, Table};
use crate::vcs::VcsRegistry;
use anyhow::Result;
use std::collections::HashMap;

/// A dependency that does not match its pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stale {
    pub import_path: String,
    pub pinned: String,
    /// Checked-out revision, or why it could not be determined.
    pub current: String,
}

pub fn run(
    config: &Config,
    loader: &dyn PackageLoader,
    registry: &mut VcsRegistry,
    patterns: &[String],
) -> Result<()> {
    let Some(location) = ManifestLocation::find(&config.project_dir) else {
        ui::success("No dependencies pinned");
        return Ok(());
    };
    let mut manifest = Manifest::read(&location)?;
    if !patterns.is_empty() {
        let matchers: Vec<_> = patterns.iter().map(|p| match_pattern(p)).collect();
        manifest
            .deps
            .retain(|d| matchers.iter().any(|m| m(&d.import_path)));
    }

    let stale = check_outdated(loader, registry, &manifest)?;
    if stale.is_empty() {
        ui::success(format!(
            "All {} dependencies match their pinned revisions",
            manifest.deps.len()
        ));
        return Ok(());
    }

    let mut table = Table::new(&["Package", "Pinned", "Checked out"]);
    for s in &stale {
        table.add_row(vec![s.import_path.clone(), s.pinned.clone(), s.current.clone()]);
    }
    table.print();
    Err(Error::Outdated(stale.len()).into())
}

/// Compare each pin against the workspace. A pin counts as current only if
/// the revision exists locally and is the one checked out.
pub fn check_outdated(
    loader: &dyn PackageLoader,
    registry: &mut VcsRegistry,
    manifest: &Manifest,
) -> Result<Vec<Stale>> {
    let paths: Vec<String> = manifest.deps.iter().map(|d| d.import_path.clone()).collect();
    let pkgs: HashMap<String, Package> = loader
        .load(&paths)?
        .into_iter()
        .map(|p| (p.import_path.clone(), p))
        .collect();

    let mut stale = Vec::new();
    for dep in &manifest.deps {
        let current = match pkgs.get(&dep.import_path) {
            Some(pkg) if pkg.error.is_none() => checked_out(registry, pkg, &dep.rev),
            _ => Some("not in workspace".to_string()),
        };
        if let Some(current) = current {
            stale.push(Stale {
                import_path: dep.import_path.clone(),
                pinned: dep.rev.clone(),
                current,
            });
        }
    }
    Ok(stale)
}

/// `None` when `pkg` is at `rev`, otherwise a description of what it is at.
fn checked_out(registry: &mut VcsRegistry, pkg: &Package, rev: &str) -> Option<String> {
    let vcs = match registry.lookup(&pkg.dir, &pkg.root.join("src")) {
        Ok((vcs, _)) => vcs,
        Err(e) => return Some(e.to_string()),
    };
    if !vcs.exists(&pkg.dir, rev) {
        return Some("pinned revision missing".to_string());
    }
    match vcs.identify(&pkg.dir) {
        Ok(id) if id == rev => None,
        Ok(id) => Some(id),
        Err(e) => Some(format!("{:#}", e)),
    }
}
