//! Dependency resolution, pin carrying, diffing and vendoring.
//!
//! - **Resolution**: turn loaded packages into [`Dependency`] records pinned
//!   at their checked-out revision
//! - **Carrying**: keep revisions already recorded in the manifest
//! - **Vendoring**: copy dependency sources into the vendor tree
//!
//! [`Dependency`]: crate::manifest::Dependency

mod carry;
mod resolve;
mod vendor;

pub use carry::{carry_version, carry_versions, eq_deps, sub_deps};
pub use resolve::{dependency_for, is_within, resolve_dependencies};
pub use vendor::{
    copy_file, copy_src, copy_without_import_comment, import_path_dir, remove_src,
    strip_import_comment,
};
