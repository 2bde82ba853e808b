//! Copying dependency sources into the vendor tree.
//!
//! Copies are best-effort: a failure on one file is logged and the copy
//! carries on, and the caller gets [`Error::CopyFailed`] at the end.

use crate::error::Error;
use crate::loader::scan::is_ignored_name;
use crate::manifest::Dependency;
use regex::bytes::Regex;
use std::borrow::Cow;
use std::fs;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

const IMPORT_ANNOTATION: &str = r#"import\s+(?:"[^"]*"|`[^`]*`)"#;

static IMPORT_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    let comment = format!(r"(?://\s*{a}\s*$|/\*\s*{a}\s*\*/)", a = IMPORT_ANNOTATION);
    Regex::new(&format!(r"^\s*(package\s+\w+)\s+{}(.*)", comment)).expect("import comment pattern")
});

/// Copy each dependency's source tree into `vendor_dir`, replacing whatever
/// was there before.
pub fn copy_src(vendor_dir: &Path, deps: &[Dependency]) -> Result<(), Error> {
    let mut ok = true;
    for dep in deps {
        let src_root = dep.ws.join("src");
        let Ok(rel) = dep.dir.strip_prefix(&src_root) else {
            log::error!(
                "{}: {} is not inside {}",
                dep.import_path,
                dep.dir.display(),
                src_root.display()
            );
            ok = false;
            continue;
        };
        let dst_root = vendor_dir.join(rel);
        if let Err(e) = remove_tree(&dst_root) {
            log::error!("{}: {}", dst_root.display(), e);
            ok = false;
        }
        log::debug!("copying {} to {}", dep.dir.display(), dst_root.display());

        let walker = WalkDir::new(&dep.dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || !(e.file_type().is_dir() && is_ignored_name(e.file_name()))
            });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::error!("{}: {}", dep.import_path, e);
                    ok = false;
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&src_root) else {
                continue;
            };
            if let Err(e) = copy_file(&vendor_dir.join(rel), entry.path()) {
                log::error!("{}: {}", entry.path().display(), e);
                ok = false;
            }
        }
    }
    if ok { Ok(()) } else { Err(Error::CopyFailed) }
}

/// Delete each dependency's tree under `vendor_dir`. Missing trees are fine.
pub fn remove_src(vendor_dir: &Path, deps: &[Dependency]) -> Result<(), Error> {
    let mut ok = true;
    for dep in deps {
        let path = vendor_dir.join(import_path_dir(&dep.import_path));
        if let Err(e) = remove_tree(&path) {
            log::error!("{}: {}", path.display(), e);
            ok = false;
        }
    }
    if ok { Ok(()) } else { Err(Error::RemoveFailed) }
}

fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Slash-separated import path as a native relative path.
pub fn import_path_dir(import_path: &str) -> PathBuf {
    import_path.split('/').filter(|p| !p.is_empty()).collect()
}

/// Copy one file. Symlinks are recreated rather than followed, and `.go`
/// files lose their canonical import annotation.
pub fn copy_file(dst: &Path, src: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }

    if fs::symlink_metadata(src)?.file_type().is_symlink() {
        let target = fs::read_link(src)?;
        return symlink(&target, dst);
    }

    if src.extension().is_some_and(|ext| ext == "go") {
        let reader = BufReader::new(fs::File::open(src)?);
        let mut writer = BufWriter::new(fs::File::create(dst)?);
        copy_without_import_comment(reader, &mut writer)?;
        writer.flush()?;
    } else {
        fs::copy(src, dst)?;
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink(target: &Path, link: &Path) -> io::Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    // Relative targets resolve against the link's directory.
    let resolved = match link.parent() {
        Some(parent) if target.is_relative() => parent.join(target),
        _ => target.to_path_buf(),
    };
    if resolved.is_dir() {
        symlink_dir(target, link)
    } else {
        symlink_file(target, link)
    }
}

/// Stream `r` to `w`, stripping import annotations line by line. Line
/// endings, including a missing final newline, are preserved.
pub fn copy_without_import_comment(mut r: impl BufRead, mut w: impl Write) -> io::Result<()> {
    let mut line = Vec::new();
    loop {
        line.clear();
        if r.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }
        let ending_len = if line.ends_with(b"\r\n") {
            2
        } else {
            usize::from(line.ends_with(b"\n"))
        };
        let (body, ending) = line.split_at(line.len() - ending_len);
        w.write_all(&strip_import_comment(body))?;
        w.write_all(ending)?;
    }
}

/// `package foo // import "bar/foo"` becomes `package foo`. Lines that are
/// not a package clause with an annotation come back unchanged.
pub fn strip_import_comment(line: &[u8]) -> Cow<'_, [u8]> {
    // Only the package clause can match, and it starts at column zero.
    if !line.starts_with(b"package ") {
        return Cow::Borrowed(line);
    }
    match IMPORT_COMMENT.captures(line) {
        Some(caps) => {
            let mut out = caps[1].to_vec();
            out.extend_from_slice(&caps[2]);
            Cow::Owned(out)
        }
        None => Cow::Borrowed(line),
    }
}
