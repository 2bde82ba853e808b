//! Package metadata resolution.
//!
//! The toolchain's `go list -e -json` is the source of truth for where a
//! package lives and what it declares. Its output is a stream of
//! concatenated JSON objects which is decoded one record at a time by
//! [`PackageStream`]. [`load_packages_all`] additionally scans source files
//! for imports the toolchain skipped (see [`scan`]).

mod constraint;
pub mod scan;

pub use constraint::BuildContext;

use crate::config::Config;
use crate::error::Error;
use crate::process;
use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// One record of `go list -json` output.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Package {
    pub dir: PathBuf,
    /// Workspace (GOPATH entry or GOROOT) containing the package.
    pub root: PathBuf,
    pub import_path: String,
    pub deps: Vec<String>,
    pub standard: bool,

    pub go_files: Vec<String>,
    pub cgo_files: Vec<String>,
    pub ignored_go_files: Vec<String>,

    pub test_go_files: Vec<String>,
    pub test_imports: Vec<String>,
    pub x_test_go_files: Vec<String>,
    pub x_test_imports: Vec<String>,

    pub error: Option<PackageError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageError {
    #[serde(rename = "Err", default)]
    pub err: String,
}

impl Package {
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.err.as_str())
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.error = Some(PackageError { err: msg.into() });
    }

    fn from_decode_error(err: Error) -> Self {
        let mut pkg = Self::default();
        pkg.set_error(err.to_string());
        pkg
    }
}

/// Pull-based decoder over a stream of concatenated JSON package records.
///
/// A record that is valid JSON but the wrong shape yields an error for that
/// record only. A syntax error ends the stream, since there is no reliable
/// way to find the start of the next record.
pub struct PackageStream<R: Read> {
    inner: serde_json::StreamDeserializer<'static, serde_json::de::IoRead<R>, Value>,
    done: bool,
}

impl<R: Read> PackageStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: serde_json::Deserializer::from_reader(reader).into_iter(),
            done: false,
        }
    }
}

impl<R: Read> Iterator for PackageStream<R> {
    type Item = Result<Package, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.inner.next()? {
            Ok(value) => Some(serde_json::from_value(value).map_err(|e| Error::Decode(e.to_string()))),
            Err(e) => {
                self.done = true;
                Some(Err(Error::Decode(e.to_string())))
            }
        }
    }
}

/// Decode every record, turning per-record failures into package errors.
pub fn decode_packages(reader: impl Read) -> Vec<Package> {
    PackageStream::new(reader)
        .map(|record| record.unwrap_or_else(Package::from_decode_error))
        .collect()
}

/// The external toolchain as seen by the workflows.
pub trait PackageLoader {
    /// Resolve metadata for `names`. An empty list yields an empty result
    /// without consulting the toolchain.
    fn load(&self, names: &[String]) -> Result<Vec<Package>>;

    /// Abridged toolchain version, e.g. `go1.5.1`.
    fn toolchain_version(&self) -> Result<String>;

    /// Download `import_path` into the workspace without building it.
    fn fetch(&self, import_path: &str) -> Result<()>;
}

/// [`PackageLoader`] backed by the `go` command.
#[derive(Debug, Clone)]
pub struct GoToolchain {
    go: String,
    dir: PathBuf,
    tags: Vec<String>,
}

impl GoToolchain {
    pub fn new(config: &Config) -> Self {
        Self {
            go: config.go.clone(),
            dir: config.project_dir.clone(),
            tags: config.tags.clone(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.go);
        cmd.current_dir(&self.dir);
        cmd
    }
}

impl PackageLoader for GoToolchain {
    fn load(&self, names: &[String]) -> Result<Vec<Package>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let mut cmd = self.command();
        cmd.args(["list", "-e", "-json"]);
        if !self.tags.is_empty() {
            cmd.arg(format!("-tags={}", self.tags.join(" ")));
        }
        cmd.args(names).stdout(Stdio::piped()).stderr(Stdio::inherit());

        let command = process::command_line(&cmd);
        log::debug!("running `{}`", command);
        let mut child = cmd.spawn().map_err(|source| Error::Transport {
            command: command.clone(),
            source,
        })?;
        let pkgs = match child.stdout.take() {
            Some(stdout) => decode_packages(stdout),
            None => Vec::new(),
        };
        let status = child.wait().map_err(|source| Error::Transport {
            command: command.clone(),
            source,
        })?;
        if !status.success() {
            return Err(Error::CommandFailed {
                command,
                status: status.to_string(),
            }
            .into());
        }
        Ok(pkgs)
    }

    fn toolchain_version(&self) -> Result<String> {
        let mut cmd = self.command();
        cmd.arg("version");
        let out = process::output(&mut cmd)?;
        parse_go_version(&String::from_utf8_lossy(&out))
    }

    fn fetch(&self, import_path: &str) -> Result<()> {
        let mut cmd = self.command();
        cmd.args(["get", "-d", import_path]);
        process::run(&mut cmd)?;
        Ok(())
    }
}

/// `go version go1.5.1 linux/amd64` → `go1.5.1`;
/// `go version devel +a1b2c3 ...` → `devel-+a1b2c3`.
pub fn parse_go_version(out: &str) -> Result<String> {
    let parts: Vec<&str> = out.split_whitespace().collect();
    match parts.as_slice() {
        [_, _, "devel", rest, ..] => Ok(format!("devel-{}", rest)),
        [_, _, version, ..] => Ok((*version).to_string()),
        _ => Err(anyhow::anyhow!(
            "Error splitting output of `go version`: expected 3 or more elements: {:?}",
            out
        )),
    }
}

/// Like [`PackageLoader::load`], with each package's dependency list
/// widened by a source-level import scan.
pub fn load_packages_all(
    loader: &dyn PackageLoader,
    ctx: &BuildContext,
    names: &[String],
) -> Result<Vec<Package>> {
    let mut pkgs = loader.load(names)?;
    scan::augment(&mut pkgs, ctx);
    Ok(pkgs)
}
