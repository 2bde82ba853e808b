//! `gopin update`: re-pin selected dependencies at the revision currently
//! checked out in the workspace.

use crate::config::Config;
use crate::deps::{copy_src, dependency_for};
use crate::error::Error;
use crate::loader::PackageLoader;
use crate::manifest::{Dependency, Manifest, ManifestFormat, ManifestLocation};
use crate::ui;
use crate::vcs::VcsRegistry;
use anyhow::Result;
use regex::Regex;

pub fn run(
    config: &Config,
    loader: &dyn PackageLoader,
    registry: &mut VcsRegistry,
    patterns: &[String],
) -> Result<()> {
    let location = ManifestLocation::find(&config.project_dir).ok_or(Error::ManifestNotFound)?;
    if location.format == ManifestFormat::Legacy {
        return Err(Error::LegacyManifest(location.path).into());
    }
    let config = Config {
        project_dir: location.project_dir().to_path_buf(),
        ..config.clone()
    };
    let mut manifest = Manifest::read(&location)?;

    for pattern in patterns {
        if !mark_matches(pattern, &mut manifest.deps) {
            ui::warning(Error::NotInManifest(pattern.clone()));
        }
    }
    let (updated, failed) = update_matched(loader, registry, &mut manifest.deps)?;

    manifest.save(&location.path)?;
    copy_src(&config.vendor_dir(), &updated)?;

    if failed > 0 {
        return Err(Error::Batch {
            operation: "update",
            count: failed,
        }
        .into());
    }
    for dep in &updated {
        ui::success(format!("{} at {}", dep.import_path, short_rev(&dep.rev)));
    }
    Ok(())
}

fn short_rev(rev: &str) -> &str {
    rev.get(..12).unwrap_or(rev)
}

/// Flag every dependency matching `pattern`. Returns whether any matched.
pub fn mark_matches(pattern: &str, deps: &mut [Dependency]) -> bool {
    let matches = match_pattern(pattern);
    let mut any = false;
    for dep in deps.iter_mut().filter(|d| matches(&d.import_path)) {
        dep.matched = true;
        any = true;
    }
    any
}

/// Package pattern matcher: `...` matches any string, and `foo/...` also
/// matches `foo` itself. There is no other special syntax.
pub fn match_pattern(pattern: &str) -> impl Fn(&str) -> bool + use<> {
    let mut re = regex::escape(pattern).replace(r"\.\.\.", ".*");
    if let Some(prefix) = re.strip_suffix("/.*") {
        re = format!("{}(/.*)?", prefix);
    }
    let compiled = Regex::new(&format!("^{}$", re)).ok();
    let literal = pattern.to_string();
    move |name: &str| match &compiled {
        Some(re) => re.is_match(name),
        None => name == literal,
    }
}

/// Re-identify each matched dependency. Returns the refreshed entries and
/// how many matched entries could not be refreshed.
fn update_matched(
    loader: &dyn PackageLoader,
    registry: &mut VcsRegistry,
    deps: &mut [Dependency],
) -> Result<(Vec<Dependency>, usize)> {
    let paths: Vec<String> = deps
        .iter()
        .filter(|d| d.matched)
        .map(|d| d.import_path.clone())
        .collect();
    if paths.is_empty() {
        return Err(Error::NoPackagesToUpdate.into());
    }

    let mut failed = 0;
    let mut updated = Vec::new();
    for pkg in loader.load(&paths)? {
        if let Some(err) = pkg.error_message() {
            ui::failure(format!("{}: {}", pkg.import_path, err));
            failed += 1;
            continue;
        }
        let fresh = match dependency_for(registry, &pkg) {
            Ok(fresh) => fresh,
            Err(e) => {
                ui::failure(format!("{}: {:#}", pkg.import_path, e));
                failed += 1;
                continue;
            }
        };
        let Some(dep) = deps.iter_mut().find(|d| d.import_path == fresh.import_path) else {
            ui::failure(Error::NotInManifest(fresh.import_path));
            failed += 1;
            continue;
        };
        *dep = fresh;
        updated.push(dep.clone());
    }
    Ok((updated, failed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::MANIFEST_FILE;
    use crate::testutil::{FakeLoader, Workspace};
    use std::fs;

    #[test]
    fn test_match_pattern() {
        let m = match_pattern("pkg/...");
        assert!(m("pkg"));
        assert!(m("pkg/a"));
        assert!(m("pkg/a/b"));
        assert!(!m("pkgx"));
        assert!(!m("other/pkg"));

        let m = match_pattern("github.com/x/y");
        assert!(m("github.com/x/y"));
        assert!(!m("github.com/x/y/z"));

        let m = match_pattern("net/.../http");
        assert!(m("net/x/http"));
        assert!(!m("net/http2"));

        let m = match_pattern("a.b/(c)");
        assert!(m("a.b/(c)"));
        assert!(!m("axb/(c)"));
    }

    #[test]
    fn test_mark_matches() {
        let mut deps = vec![
            Dependency::new("pkg/a", "1"),
            Dependency::new("pkg/b", "1"),
            Dependency::new("other/c", "1"),
        ];
        assert!(mark_matches("pkg/...", &mut deps));
        assert!(!mark_matches("nomatch/...", &mut deps));
        let matched: Vec<_> = deps.iter().map(|d| d.matched).collect();
        assert_eq!(matched, vec![true, true, false]);
    }

    struct Fixture {
        ws: Workspace,
        loader: FakeLoader,
        config: Config,
    }

    /// Manifest pinning pkg/a, pkg/b and other/c at their first commits,
    /// with the workspace copies of all three moved one commit ahead.
    fn fixture() -> (Fixture, Vec<String>, Vec<String>) {
        let ws = Workspace::new();
        let loader = FakeLoader::new();
        let mut pinned = Vec::new();
        let mut current = Vec::new();
        for path in ["pkg/a", "pkg/b", "other/c"] {
            let repo = ws.repo(path);
            pinned.push(repo.commit_file("x.go", "package x\n").to_string());
            current.push(repo.commit_file("y.go", "package x\n").to_string());
            loader.add(ws.package(path, &[]));
        }

        let app = ws.package("example.com/app", &[]);
        let config = Config::new(&app.dir);
        let manifest = Manifest {
            import_path: "example.com/app".to_string(),
            go_version: "go1.5.1".to_string(),
            packages: Vec::new(),
            deps: ["pkg/a", "pkg/b", "other/c"]
                .iter()
                .zip(&pinned)
                .map(|(p, r)| Dependency::new(*p, r.clone()))
                .collect(),
        };
        manifest.save(&config.godeps_dir().join(MANIFEST_FILE)).unwrap();
        (Fixture { ws, loader, config }, pinned, current)
    }

    fn saved(config: &Config) -> Manifest {
        Manifest::load(&config.project_dir).unwrap().0
    }

    #[test]
    fn test_update_only_touches_matching_entries() {
        let (fx, pinned, current) = fixture();
        let mut registry = VcsRegistry::new();

        run(&fx.config, &fx.loader, &mut registry, &["pkg/...".to_string()]).unwrap();

        let manifest = saved(&fx.config);
        let revs: Vec<_> = manifest.deps.iter().map(|d| d.rev.as_str()).collect();
        assert_eq!(revs, vec![current[0].as_str(), current[1].as_str(), pinned[2].as_str()]);

        let vendor = fx.config.vendor_dir();
        assert!(vendor.join("pkg").join("a").join("y.go").exists());
        assert!(vendor.join("pkg").join("b").join("y.go").exists());
        assert!(!vendor.join("other").exists());
    }

    #[test]
    fn test_update_without_matches_fails() {
        let (fx, pinned, _) = fixture();
        let mut registry = VcsRegistry::new();

        let err = run(&fx.config, &fx.loader, &mut registry, &["nomatch/...".to_string()]).unwrap_err();
        assert_eq!(err.to_string(), "no packages can be updated");

        let manifest = saved(&fx.config);
        assert_eq!(manifest.deps[0].rev, pinned[0]);
    }

    #[test]
    fn test_dirty_dependency_is_reported_but_others_persist() {
        let (fx, pinned, current) = fixture();
        fs::write(fx.ws.dir("pkg/b").join("y.go"), "package x\n\nvar Dirty = 1\n").unwrap();
        let mut registry = VcsRegistry::new();

        let err = run(&fx.config, &fx.loader, &mut registry, &["pkg/...".to_string()]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Batch { operation: "update", count: 1 })
        ));

        let manifest = saved(&fx.config);
        assert_eq!(manifest.deps[0].rev, current[0]);
        assert_eq!(manifest.deps[1].rev, pinned[1]);
        assert!(fx.config.vendor_dir().join("pkg").join("a").exists());
        assert!(!fx.config.vendor_dir().join("pkg").join("b").exists());
    }

    #[test]
    fn test_update_refuses_legacy_manifest() {
        let ws = Workspace::new();
        let app = ws.package("example.com/app", &[]);
        fs::write(app.dir.join("Godeps"), "pkg/a\n").unwrap();
        let config = Config::new(&app.dir);

        let err = run(&config, &FakeLoader::new(), &mut VcsRegistry::new(), &["pkg/a".to_string()])
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::LegacyManifest(_))));
    }
}
