//! `gopin save`: pin and vendor the project's dependencies.

use crate::config::Config;
use crate::deps::{carry_versions, copy_src, eq_deps, remove_src, resolve_dependencies, sub_deps};
use crate::error::Error;
use crate::loader::{PackageLoader, load_packages_all};
use crate::manifest::{MANIFEST_FILE, Manifest, ManifestFormat, read_app_vendor};
use crate::ui;
use crate::vcs::VcsRegistry;
use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

const README: &str = "This directory tree is generated automatically by gopin.

Please do not edit.
";

/// Keeps build output of the scratch workspace out of version control.
const WORKSPACE_GITIGNORE: &str = "/pkg\n/bin\n";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub total: usize,
    pub added: usize,
    pub removed: usize,
}

pub fn run(
    config: &Config,
    loader: &dyn PackageLoader,
    registry: &mut VcsRegistry,
    packages: &[String],
) -> Result<SaveSummary> {
    let dot = loader.load(&[".".to_string()])?;
    let Some(project) = dot.into_iter().next() else {
        bail!("no package found in {}", config.project_dir.display());
    };
    if let Some(err) = project.error_message() {
        bail!("{}", err);
    }
    let go_version = loader.toolchain_version()?;
    let (mut old, format) = Manifest::load(&config.project_dir)?;

    let mut new = Manifest {
        import_path: project.import_path.clone(),
        go_version,
        packages: packages.to_vec(),
        deps: Vec::new(),
    };
    let names = if !packages.is_empty() {
        packages.to_vec()
    } else {
        let listed = read_app_vendor(&config.project_dir)?;
        if listed.is_empty() { vec![".".to_string()] } else { listed }
    };

    let pkgs = load_packages_all(loader, &config.build_context(), &names)?;
    new.deps = resolve_dependencies(loader, registry, &project.import_path, &pkgs)?;
    let on_disk = new.deps.clone();
    carry_versions(&old, &mut new)?;

    let godeps_dir = config.godeps_dir();
    if format == Some(ManifestFormat::Legacy) {
        // The old format holds no source, so every pin must already be
        // checked out in the workspace for the copy to be faithful.
        if !eq_deps(&new.deps, &on_disk) {
            return Err(Error::NeedRestore.into());
        }
        old = Manifest::default();
        fs::remove_file(&godeps_dir)
            .with_context(|| format!("Failed to remove {}", godeps_dir.display()))?;
        log::info!("migrated legacy manifest");
    }

    write_file(&godeps_dir.join("Readme"), README);
    new.save(&godeps_dir.join(MANIFEST_FILE))?;

    let vendor_dir = config.vendor_dir();
    let removed = sub_deps(&old.deps, &new.deps);
    let added = sub_deps(&new.deps, &old.deps);
    remove_src(&vendor_dir, &removed)?;
    copy_src(&vendor_dir, &added)?;
    if !config.vendor
        && let Some(workspace) = vendor_dir.parent()
    {
        write_file(&workspace.join(".gitignore"), WORKSPACE_GITIGNORE);
    }

    let summary = SaveSummary {
        total: new.deps.len(),
        added: added.len(),
        removed: removed.len(),
    };
    ui::success(format!(
        "Saved {} dependencies ({} added, {} removed)",
        summary.total, summary.added, summary.removed
    ));
    Ok(summary)
}

/// Write `contents`, creating parent directories. Failures are only logged.
fn write_file(path: &Path, contents: &str) {
    let written = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|_| fs::write(path, contents));
    if let Err(e) = written {
        log::warn!("{}: {}", path.display(), e);
    }
}
