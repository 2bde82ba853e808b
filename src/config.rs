//! Run configuration.
//!
//! A [`Config`] is built once per invocation and passed explicitly to every
//! workflow. Values come from built-in defaults, an optional `gopin.toml` in
//! the project root, the environment, and finally command-line flags.

use crate::loader::BuildContext;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "gopin.toml";

/// Name of the manifest directory inside the project root.
pub const GODEPS_DIR: &str = "Godeps";

#[derive(Deserialize, Debug, Default)]
pub struct FileConfig {
    pub build: Option<BuildConfig>,
}

#[derive(Deserialize, Debug, Default)]
pub struct BuildConfig {
    pub tags: Option<Vec<String>>,
    pub goos: Option<String>,
    pub goarch: Option<String>,
    pub vendor: Option<bool>,
    pub go: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub project_dir: PathBuf,
    pub verbose: bool,
    /// Custom build tags honored by the import scan and passed to `go list`.
    pub tags: Vec<String>,
    pub goos: String,
    pub goarch: String,
    /// Copy into `vendor/` instead of `Godeps/_workspace/src`.
    pub vendor: bool,
    /// Toolchain binary used for package metadata and fetching.
    pub go: String,
}

impl Config {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            verbose: false,
            tags: Vec::new(),
            goos: default_goos(),
            goarch: default_goarch(),
            vendor: false,
            go: "go".to_string(),
        }
    }

    /// Defaults, then `gopin.toml`, then the process environment.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let mut config = Self::new(project_dir);
        let path = project_dir.join(CONFIG_FILE);
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let file: FileConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            config.apply_file(file);
        }
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        let Some(build) = file.build else {
            return;
        };
        if let Some(tags) = build.tags {
            self.tags = tags;
        }
        if let Some(goos) = build.goos {
            self.goos = goos;
        }
        if let Some(goarch) = build.goarch {
            self.goarch = goarch;
        }
        if let Some(vendor) = build.vendor {
            self.vendor = vendor;
        }
        if let Some(go) = build.go {
            self.go = go;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(goos) = lookup("GOOS").filter(|v| !v.is_empty()) {
            self.goos = goos;
        }
        if let Some(goarch) = lookup("GOARCH").filter(|v| !v.is_empty()) {
            self.goarch = goarch;
        }
        if lookup("GO15VENDOREXPERIMENT").as_deref() == Some("1") {
            self.vendor = true;
        }
    }

    /// Replace the tag set with a space- or comma-separated flag value.
    pub fn set_tags(&mut self, tags: &str) {
        self.tags = tags
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(ToOwned::to_owned)
            .collect();
    }

    pub fn godeps_dir(&self) -> PathBuf {
        self.project_dir.join(GODEPS_DIR)
    }

    pub fn vendor_dir(&self) -> PathBuf {
        if self.vendor {
            self.project_dir.join("vendor")
        } else {
            self.godeps_dir().join("_workspace").join("src")
        }
    }

    pub fn build_context(&self) -> BuildContext {
        BuildContext {
            goos: self.goos.clone(),
            goarch: self.goarch.clone(),
            tags: self.tags.clone(),
        }
    }
}

fn default_goos() -> String {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
    .to_string()
}

fn default_goarch() -> String {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "powerpc" => "ppc",
        "loongarch64" => "loong64",
        other => other,
    }
    .to_string()
}
