//! `gopin restore`: check out every pinned revision in the workspace.

use crate::config::Config;
use crate::error::Error;
use crate::loader::{Package, PackageLoader};
use crate::manifest::{Dependency, Manifest, ManifestLocation};
use crate::ui;
use crate::vcs::VcsRegistry;
use anyhow::{Result, bail};
use indicatif::{ProgressBar, ProgressStyle};

pub fn run(config: &Config, loader: &dyn PackageLoader, registry: &mut VcsRegistry) -> Result<()> {
    let location = ManifestLocation::find(&config.project_dir).ok_or(Error::ManifestNotFound)?;
    let manifest = Manifest::read(&location)?;
    let total = manifest.deps.len();

    let pb = if config.verbose {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb
    };

    let mut failed = 0;
    for (i, dep) in manifest.deps.iter().enumerate() {
        log::info!("restore: processing {}/{} '{}'...", i + 1, total, dep.import_path);
        pb.set_message(dep.import_path.clone());
        if let Err(e) = restore(loader, registry, dep) {
            // A transport failure aborts the whole run.
            if matches!(e.downcast_ref::<Error>(), Some(Error::Transport { .. })) {
                pb.abandon();
                return Err(e);
            }
            pb.suspend(|| ui::failure(format!("restore: {}: {:#}", dep.import_path, e)));
            failed += 1;
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    if failed > 0 {
        return Err(Error::Batch {
            operation: "restore",
            count: failed,
        }
        .into());
    }
    ui::success(format!("Restored {} dependencies", total));
    Ok(())
}

/// Make the workspace copy of `dep` match its pinned revision, fetching the
/// package first if the workspace does not have it.
pub fn restore(loader: &dyn PackageLoader, registry: &mut VcsRegistry, dep: &Dependency) -> Result<()> {
    if dep.rev.is_empty() {
        log::warn!("{}: no revision pinned, skipping", dep.import_path);
        return Ok(());
    }
    let pkg = match load_one(loader, &dep.import_path)? {
        pkg if pkg.error.is_none() => pkg,
        _ => {
            loader.fetch(&dep.import_path)?;
            let pkg = load_one(loader, &dep.import_path)?;
            if let Some(err) = pkg.error_message() {
                bail!("{}", err);
            }
            pkg
        }
    };
    if pkg.standard {
        return Err(Error::StandardPackage(dep.import_path.clone()).into());
    }

    let (vcs, _) = registry.lookup(&pkg.dir, &pkg.root.join("src"))?;
    if !vcs.exists(&pkg.dir, &dep.rev) {
        log::debug!("{}: downloading to find {}", dep.import_path, dep.rev);
        vcs.download(&pkg.dir)?;
        if !vcs.exists(&pkg.dir, &dep.rev) {
            return Err(Error::MissingRevision {
                import_path: dep.import_path.clone(),
                rev: dep.rev.clone(),
            }
            .into());
        }
    }
    vcs.rev_sync(&pkg.dir, &dep.rev)
}

fn load_one(loader: &dyn PackageLoader, import_path: &str) -> Result<Package> {
    match loader.load(&[import_path.to_string()])?.into_iter().next() {
        Some(pkg) => Ok(pkg),
        None => bail!("{}: no package metadata", import_path),
    }
}
