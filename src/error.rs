//! Error kinds surfaced by the vendoring engine.
//!
//! Only [`Error::Transport`] and [`Error::RevisionConflict`] stop a workflow
//! outright. Everything else is recorded per dependency and folded into an
//! [`Error::Batch`] once the remaining dependencies have been processed.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A subprocess could not be started or waited on.
    #[error("error running `{command}`: {source}")]
    Transport {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A subprocess ran but exited unsuccessfully.
    #[error("`{command}` exited with {status}")]
    CommandFailed { command: String, status: String },

    /// One malformed package record in the toolchain metadata stream.
    #[error("malformed package record: {0}")]
    Decode(String),

    #[error("{import_path}: revision is {have}, but {conflicts_with} wants {want}")]
    RevisionConflict {
        import_path: String,
        have: String,
        /// Already-pinned package from the same repository.
        conflicts_with: String,
        want: String,
    },

    #[error("dirty working tree: {0}")]
    DirtyWorkingTree(String),

    #[error("{import_path}: revision {rev} not found in workspace")]
    MissingRevision { import_path: String, rev: String },

    #[error("not in manifest: {0}")]
    NotInManifest(String),

    #[error("{0}: no known version control system found")]
    UnrecognizedRepository(PathBuf),

    #[error("{0}: standard library packages cannot be vendored")]
    StandardPackage(String),

    #[error("no packages can be updated")]
    NoPackagesToUpdate,

    #[error("{}", NEED_RESTORE.trim())]
    NeedRestore,

    #[error("error copying source code")]
    CopyFailed,

    #[error("error removing vendored source")]
    RemoveFailed,

    #[error("{operation}: {count} dependencies failed")]
    Batch {
        operation: &'static str,
        count: usize,
    },

    #[error("{0} dependencies are not at their pinned revision")]
    Outdated(usize),

    #[error("no Godeps found (or in any parent directory)")]
    ManifestNotFound,

    #[error("{0}: old Godeps format cannot be updated; run 'gopin save' to migrate")]
    LegacyManifest(PathBuf),
}

const NEED_RESTORE: &str = "
mismatched versions while migrating

It looks like you are switching from the old Godeps format.
The old format is just a file; it doesn't contain source code.
For this migration, gopin needs the appropriate version of each
dependency to be installed in the workspace, so that the source
code is available to copy.

To fix this, run 'gopin restore'.
";
