//! Dependency manifest (`Godeps/Godeps.json`) reading and writing.
//!
//! Two on-disk formats exist. The current one is a JSON document inside the
//! `Godeps/` directory. The legacy one is a plain `Godeps` file at the project
//! root, holding either the same JSON document or a list of import paths.
//! [`ManifestFormat::detect`] decides which one is present before anything
//! is parsed.

use crate::config::GODEPS_DIR;
use crate::vcs::Vcs;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const MANIFEST_FILE: &str = "Godeps.json";

/// Optional package list consulted by `save` when no packages are named.
pub const APP_VENDOR_FILE: &str = "appVendor";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "ImportPath", default)]
    pub import_path: String,

    /// Abridged `go version` output.
    #[serde(rename = "GoVersion", alias = "ToolchainVersion", default)]
    pub go_version: String,

    /// Packages named explicitly on the `save` command line.
    #[serde(
        rename = "Packages",
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "null_as_empty"
    )]
    pub packages: Vec<String>,

    /// Always serialized, as `[]` when empty.
    #[serde(rename = "Deps", default, deserialize_with = "null_as_empty")]
    pub deps: Vec<Dependency>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dependency {
    #[serde(rename = "ImportPath")]
    pub import_path: String,

    /// Tag or description of the revision.
    #[serde(rename = "Comment", default, skip_serializing_if = "String::is_empty")]
    pub comment: String,

    /// VCS-specific revision id.
    #[serde(rename = "Rev", default)]
    pub rev: String,

    /// Source directory the dependency was resolved from.
    #[serde(skip)]
    pub dir: PathBuf,

    /// Workspace the source directory lives in (its `src/` holds `dir`).
    #[serde(skip)]
    pub ws: PathBuf,

    /// Repository root, slash-separated and relative to the workspace `src/`.
    #[serde(skip)]
    pub root: String,

    #[serde(skip)]
    pub vcs: Option<Arc<dyn Vcs>>,

    /// Set by `update` pattern matching.
    #[serde(skip)]
    pub matched: bool,
}

impl Dependency {
    pub fn new(import_path: impl Into<String>, rev: impl Into<String>) -> Self {
        Self {
            import_path: import_path.into(),
            rev: rev.into(),
            ..Self::default()
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// `Godeps/Godeps.json`
    Current,
    /// A regular file named `Godeps`.
    Legacy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestLocation {
    pub format: ManifestFormat,
    pub path: PathBuf,
}

impl ManifestFormat {
    /// Inspect `dir` for a manifest without parsing it.
    pub fn detect(dir: &Path) -> Option<ManifestLocation> {
        let godeps = dir.join(GODEPS_DIR);
        let current = godeps.join(MANIFEST_FILE);
        if current.is_file() {
            return Some(ManifestLocation {
                format: ManifestFormat::Current,
                path: current,
            });
        }
        if godeps.is_file() {
            return Some(ManifestLocation {
                format: ManifestFormat::Legacy,
                path: godeps,
            });
        }
        None
    }
}

impl ManifestLocation {
    /// Search `start` and then each of its parents.
    pub fn find(start: &Path) -> Option<Self> {
        start.ancestors().find_map(ManifestFormat::detect)
    }

    /// Directory holding `Godeps` (the project root).
    pub fn project_dir(&self) -> &Path {
        let godeps = match self.format {
            ManifestFormat::Current => self.path.parent().unwrap_or(&self.path),
            ManifestFormat::Legacy => &self.path,
        };
        godeps.parent().unwrap_or(Path::new("."))
    }
}

impl Manifest {
    /// Load whatever manifest `project_dir` holds. A missing manifest is an
    /// empty one, not an error.
    pub fn load(project_dir: &Path) -> Result<(Self, Option<ManifestFormat>)> {
        match ManifestFormat::detect(project_dir) {
            Some(location) => {
                let manifest = Self::read(&location)?;
                Ok((manifest, Some(location.format)))
            }
            None => Ok((Self::default(), None)),
        }
    }

    pub fn read(location: &ManifestLocation) -> Result<Self> {
        let file = fs::File::open(&location.path)
            .with_context(|| format!("Failed to open {}", location.path.display()))?;
        let reader = BufReader::new(file);
        let parsed = match location.format {
            ManifestFormat::Current => Self::read_current(reader),
            ManifestFormat::Legacy => Self::read_legacy(reader),
        };
        parsed.with_context(|| format!("Failed to parse {}", location.path.display()))
    }

    pub fn read_current(reader: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// A legacy file starting with `{` is the old JSON document. Anything
    /// else is a package list whose entries have no revision, so they carry
    /// no pin.
    pub fn read_legacy(mut reader: impl BufRead) -> Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        if content.trim_start().starts_with('{') {
            return Self::read_current(content.as_bytes());
        }
        let deps = parse_package_list(content.as_bytes())?
            .into_iter()
            .map(|path| Dependency::new(path, ""))
            .collect();
        Ok(Self {
            deps,
            ..Self::default()
        })
    }

    /// Tab-indented JSON followed by a newline.
    pub fn write_to(&self, mut w: impl Write) -> Result<()> {
        {
            let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
            let mut ser = serde_json::Serializer::with_formatter(&mut w, formatter);
            self.serialize(&mut ser)?;
        }
        w.write_all(b"\n")?;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        fs::write(path, buf).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, import_path: &str) -> Option<&Dependency> {
        self.deps.iter().find(|d| d.import_path == import_path)
    }
}

/// Parse a newline-separated package list. Text after `#` or `//` is a
/// comment; blank lines are skipped.
pub fn parse_package_list(reader: impl BufRead) -> io::Result<Vec<String>> {
    let mut pkgs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.split('#').next().unwrap_or_default();
        let line = line.split("//").next().unwrap_or_default().trim();
        if !line.is_empty() {
            pkgs.push(line.to_string());
        }
    }
    Ok(pkgs)
}

/// Packages listed in `appVendor`, or none when the file is absent.
pub fn read_app_vendor(project_dir: &Path) -> Result<Vec<String>> {
    let path = project_dir.join(APP_VENDOR_FILE);
    match fs::File::open(&path) {
        Ok(file) => Ok(parse_package_list(BufReader::new(file))?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e).with_context(|| format!("Failed to open {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Manifest {
        Manifest {
            import_path: "example.com/app".to_string(),
            go_version: "go1.5.1".to_string(),
            packages: Vec::new(),
            deps: vec![
                Dependency {
                    comment: "v1.2.0".to_string(),
                    ..Dependency::new("github.com/kr/fs", "2788f0dbd16903de03cb8186e5c7d97b69ad387b")
                },
                Dependency::new("golang.org/x/tools/go/vcs", "b48dc8da98ae78c3d11f220e7d327304c84e623a"),
            ],
        }
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let manifest = sample();
        let mut buf = Vec::new();
        manifest.write_to(&mut buf).unwrap();
        let back = Manifest::read_current(buf.as_slice()).unwrap();

        assert_eq!(back.import_path, "example.com/app");
        assert_eq!(back.go_version, "go1.5.1");
        let paths: Vec<_> = back.deps.iter().map(|d| d.import_path.as_str()).collect();
        assert_eq!(paths, vec!["github.com/kr/fs", "golang.org/x/tools/go/vcs"]);
        assert_eq!(back.deps[0].comment, "v1.2.0");
        assert_eq!(back.deps[1].rev, "b48dc8da98ae78c3d11f220e7d327304c84e623a");
    }

    #[test]
    fn test_empty_deps_encode_as_array() {
        let manifest = Manifest {
            import_path: "example.com/app".to_string(),
            ..Manifest::default()
        };
        let mut buf = Vec::new();
        manifest.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"Deps\": []"));
        assert!(!text.contains("null"));
        assert!(!text.contains("Packages"));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_output_is_tab_indented_without_empty_comment() {
        let manifest = Manifest {
            deps: vec![Dependency::new("a/b", "r1")],
            ..Manifest::default()
        };
        let mut buf = Vec::new();
        manifest.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\n\t\"ImportPath\""));
        assert!(text.contains("\n\t\t\t\"Rev\": \"r1\""));
        assert!(!text.contains("Comment"));
    }

    #[test]
    fn test_null_deps_decode_as_empty() {
        let json = r#"{"ImportPath": "x", "ToolchainVersion": "go1.4", "Deps": null}"#;
        let manifest = Manifest::read_current(json.as_bytes()).unwrap();
        assert!(manifest.deps.is_empty());
        assert_eq!(manifest.go_version, "go1.4");
    }

    #[test]
    fn test_parse_package_list_strips_comments() {
        let contents = "
// some slash comment
# some hash comment

github.com/tools/godep
github.com/golang/go // package with a slash comment
github.com/golang/tools # package with hash comment

";
        let pkgs = parse_package_list(contents.as_bytes()).unwrap();
        assert_eq!(
            pkgs,
            vec![
                "github.com/tools/godep",
                "github.com/golang/go",
                "github.com/golang/tools"
            ]
        );
    }

    #[test]
    fn test_detect_prefers_current_format() {
        let tmp = TempDir::new().unwrap();
        assert!(ManifestFormat::detect(tmp.path()).is_none());

        fs::write(tmp.path().join("Godeps"), "github.com/kr/fs\n").unwrap();
        let legacy = ManifestFormat::detect(tmp.path()).unwrap();
        assert_eq!(legacy.format, ManifestFormat::Legacy);
        assert_eq!(legacy.project_dir(), tmp.path());

        fs::remove_file(tmp.path().join("Godeps")).unwrap();
        sample().save(&tmp.path().join("Godeps").join(MANIFEST_FILE)).unwrap();
        let current = ManifestFormat::detect(tmp.path()).unwrap();
        assert_eq!(current.format, ManifestFormat::Current);
        assert_eq!(current.project_dir(), tmp.path());
    }

    #[test]
    fn test_find_searches_parent_directories() {
        let tmp = TempDir::new().unwrap();
        sample().save(&tmp.path().join("Godeps").join(MANIFEST_FILE)).unwrap();
        let nested = tmp.path().join("cmd").join("tool");
        fs::create_dir_all(&nested).unwrap();

        let found = ManifestLocation::find(&nested).unwrap();
        assert_eq!(found.project_dir(), tmp.path());
    }

    #[test]
    fn test_load_missing_manifest_is_empty() {
        let tmp = TempDir::new().unwrap();
        let (manifest, format) = Manifest::load(tmp.path()).unwrap();
        assert!(manifest.deps.is_empty());
        assert!(format.is_none());
    }

    #[test]
    fn test_legacy_entries_have_no_revision() {
        let manifest = Manifest::read_legacy("a/b\nc/d # pinned elsewhere\n".as_bytes()).unwrap();
        assert_eq!(manifest.deps.len(), 2);
        assert!(manifest.deps.iter().all(|d| d.rev.is_empty()));
    }

    #[test]
    fn test_legacy_json_document() {
        let json = r#"{"ImportPath": "example.com/app", "Deps": [{"ImportPath": "a/b", "Rev": "r1"}]}"#;
        let manifest = Manifest::read_legacy(json.as_bytes()).unwrap();
        assert_eq!(manifest.import_path, "example.com/app");
        assert_eq!(manifest.get("a/b").unwrap().rev, "r1");
    }

    #[test]
    fn test_read_app_vendor_absent() {
        let tmp = TempDir::new().unwrap();
        assert!(read_app_vendor(tmp.path()).unwrap().is_empty());
        fs::write(tmp.path().join(APP_VENDOR_FILE), "example.com/app/cmd/...\n").unwrap();
        assert_eq!(
            read_app_vendor(tmp.path()).unwrap(),
            vec!["example.com/app/cmd/..."]
        );
    }
}
