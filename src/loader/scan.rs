//! Source-level import scanning.
//!
//! `go list` only reports imports of files that build for the current target.
//! The scan here reads every source file under a package directory, applies
//! the build constraints of [`BuildContext`], and collects the import paths.
//! Files are parsed in parallel; each task returns its own list and the
//! results are merged once all tasks are done.

use super::{BuildContext, Package};
use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directory and file names the toolchain never treats as package sources.
pub fn is_ignored_name(name: &OsStr) -> bool {
    let name = name.to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || name == "testdata"
}

/// All `.go` files below `dir`, skipping ignored and `vendor` subtrees. An
/// entry that cannot be read fails the whole walk.
pub fn source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir).into_iter().filter_entry(|e| {
        e.depth() == 0
            || !(is_ignored_name(e.file_name())
                || (e.file_type().is_dir() && e.file_name() == "vendor"))
    });
    for entry in walker {
        let entry = entry.with_context(|| format!("walking {}", dir.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "go") {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Imports of one file, or nothing when the file does not apply to `ctx`.
pub fn scan_file(path: &Path, ctx: &BuildContext) -> Result<Vec<String>> {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    if !ctx.matches_file_name(&name) {
        return Ok(Vec::new());
    }
    let src = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if !ctx.matches_source(&src) {
        return Ok(Vec::new());
    }
    let imports = parse_imports(&src).with_context(|| format!("parsing {}", path.display()))?;
    Ok(imports.into_iter().filter(|i| is_remote_import(i)).collect())
}

fn is_remote_import(path: &str) -> bool {
    !(path.is_empty() || path == "C" || path.starts_with('.') || path.starts_with('/'))
}

/// Union of the imports of every applicable file under `dir`.
pub fn import_deps(dir: &Path, ctx: &BuildContext) -> Result<BTreeSet<String>> {
    let files = source_files(dir)?;
    let per_file = files
        .par_iter()
        .map(|path| scan_file(path, ctx))
        .collect::<Result<Vec<_>>>()?;
    Ok(per_file.into_iter().flatten().collect())
}

/// Widen each package's dependency list with its scanned imports. A scan
/// failure is recorded on that package only.
pub fn augment(pkgs: &mut [Package], ctx: &BuildContext) {
    for pkg in pkgs.iter_mut() {
        if pkg.standard || pkg.error.is_some() || !pkg.dir.is_dir() {
            continue;
        }
        match import_deps(&pkg.dir, ctx) {
            Ok(scanned) => {
                let mut all: BTreeSet<String> = pkg.deps.drain(..).collect();
                all.extend(scanned);
                pkg.deps = all.into_iter().collect();
                let ignored = std::mem::take(&mut pkg.ignored_go_files);
                pkg.go_files.extend(ignored);
            }
            Err(e) => {
                log::warn!("{}: import scan failed: {:#}", pkg.import_path, e);
                pkg.set_error(format!("{:#}", e));
            }
        }
    }
}

/// Extract the import paths from Go source, stopping at the first
/// declaration that is not an import.
pub fn parse_imports(src: &str) -> Result<Vec<String>> {
    let mut lx = Lexer::new(src);
    lx.skip_trivia()?;
    if lx.ident() != Some("package") {
        bail!("expected 'package'");
    }
    lx.skip_trivia()?;
    if lx.ident().is_none() {
        bail!("expected package name");
    }

    let mut imports = Vec::new();
    loop {
        lx.skip_trivia()?;
        if lx.eat(b';') {
            continue;
        }
        let save = lx.pos;
        if lx.ident() != Some("import") {
            lx.pos = save;
            break;
        }
        lx.skip_trivia()?;
        if lx.eat(b'(') {
            loop {
                lx.skip_trivia()?;
                if lx.eat(b')') {
                    break;
                }
                if lx.eat(b';') {
                    continue;
                }
                imports.push(lx.import_spec()?);
            }
        } else {
            imports.push(lx.import_spec()?);
        }
    }
    Ok(imports)
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let src = src.strip_prefix('\u{feff}').unwrap_or(src);
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            let rest = self.rest();
            let trimmed = rest.trim_start();
            self.pos += rest.len() - trimmed.len();
            if trimmed.starts_with("//") {
                self.pos += trimmed.find('\n').unwrap_or(trimmed.len());
            } else if let Some(body) = trimmed.strip_prefix("/*") {
                let Some(end) = body.find("*/") else {
                    bail!("comment not terminated");
                };
                self.pos += 2 + end + 2;
            } else {
                return Ok(());
            }
        }
    }

    fn eat(&mut self, b: u8) -> bool {
        if self.rest().as_bytes().first() == Some(&b) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if len == 0 || rest.starts_with(|c: char| c.is_ascii_digit()) {
            return None;
        }
        self.pos += len;
        Some(&rest[..len])
    }

    /// `[name | . | _] "path"`
    fn import_spec(&mut self) -> Result<String> {
        if !self.eat(b'.') {
            self.ident();
        }
        self.skip_trivia()?;
        self.string_lit()
    }

    fn string_lit(&mut self) -> Result<String> {
        let rest = self.rest();
        let quote = match rest.chars().next() {
            Some(q @ ('"' | '`')) => q,
            _ => bail!("expected import path string"),
        };
        let body = &rest[1..];
        let Some(end) = body.find([quote, '\n']).filter(|&i| body[i..].starts_with(quote)) else {
            bail!("import path string not terminated");
        };
        let value = &body[..end];
        if quote == '"' && value.contains('\\') {
            bail!("escape sequences in import paths are not supported");
        }
        self.pos += 1 + end + 1;
        Ok(value.to_string())
    }
}
