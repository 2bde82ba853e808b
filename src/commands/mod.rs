//! Workflow orchestrators behind each subcommand.
//!
//! Every workflow takes the run [`Config`](crate::config::Config), a
//! [`PackageLoader`](crate::loader::PackageLoader) and a
//! [`VcsRegistry`](crate::vcs::VcsRegistry) explicitly, and processes
//! dependencies one at a time.

pub mod outdated;
pub mod restore;
pub mod save;
pub mod update;
