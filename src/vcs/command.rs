use super::{Vcs, VcsKind};
use crate::process;
use anyhow::Result;
use std::path::Path;
use std::process::Command;

/// Argument templates for a command-line backend. `{rev}` is replaced by the
/// revision being asked about.
#[derive(Debug, Clone, Copy)]
struct CommandSpec {
    program: &'static str,
    identify: &'static [&'static str],
    describe: &'static [&'static str],
    diff: &'static [&'static str],
    exists: &'static [&'static str],
    download: &'static [&'static str],
    rev_sync: &'static [&'static str],
}

const GIT: CommandSpec = CommandSpec {
    program: "git",
    identify: &["rev-parse", "HEAD"],
    describe: &["describe", "--tags", "{rev}"],
    diff: &["diff", "{rev}"],
    exists: &["cat-file", "-e", "{rev}"],
    download: &["fetch"],
    rev_sync: &["checkout", "-q", "--force", "{rev}"],
};

const MERCURIAL: CommandSpec = CommandSpec {
    program: "hg",
    identify: &["identify", "--id", "--debug"],
    describe: &["log", "-r", "{rev}", "--template", "{latesttag}-{latesttagdistance}"],
    diff: &["diff", "-r", "{rev}"],
    exists: &["cat", "-r", "{rev}", "."],
    download: &["pull"],
    rev_sync: &["update", "-r", "{rev}"],
};

const BAZAAR: CommandSpec = CommandSpec {
    program: "bzr",
    identify: &["version-info", "--custom", "--template={revision_id}"],
    describe: &["log", "-r", "{rev}", "--line"],
    diff: &["diff", "-r", "{rev}"],
    exists: &["log", "-r", "{rev}"],
    download: &["pull"],
    rev_sync: &["update", "-r", "{rev}"],
};

const SUBVERSION: CommandSpec = CommandSpec {
    program: "svn",
    identify: &["info", "--show-item", "revision"],
    describe: &["log", "-r", "{rev}", "--quiet"],
    diff: &["diff", "-r", "{rev}"],
    exists: &["info", "-r", "{rev}"],
    download: &["update"],
    rev_sync: &["update", "-r", "{rev}"],
};

/// Backend driving an external VCS binary.
#[derive(Debug, Clone, Copy)]
pub struct CommandVcs {
    kind: VcsKind,
    spec: CommandSpec,
}

impl CommandVcs {
    /// The default registry serves git through [`super::GitVcs`] instead.
    pub fn new(kind: VcsKind) -> Self {
        let spec = match kind {
            VcsKind::Git => GIT,
            VcsKind::Mercurial => MERCURIAL,
            VcsKind::Bazaar => BAZAAR,
            VcsKind::Subversion => SUBVERSION,
        };
        Self { kind, spec }
    }

    fn command(&self, dir: &Path, args: &[&str], rev: &str) -> Command {
        let mut cmd = Command::new(self.spec.program);
        cmd.current_dir(dir);
        cmd.args(args.iter().map(|a| a.replace("{rev}", rev)));
        cmd
    }

    fn output(&self, dir: &Path, args: &[&str], rev: &str) -> Result<String> {
        let out = process::output(&mut self.command(dir, args, rev))?;
        Ok(String::from_utf8_lossy(&out).trim().to_string())
    }
}

impl Vcs for CommandVcs {
    fn kind(&self) -> VcsKind {
        self.kind
    }

    fn identify(&self, dir: &Path) -> Result<String> {
        let id = self.output(dir, self.spec.identify, "")?;
        // hg marks uncommitted changes with a trailing '+'.
        Ok(id.trim_end_matches('+').to_string())
    }

    fn exists(&self, dir: &Path, rev: &str) -> bool {
        process::succeeds(&mut self.command(dir, self.spec.exists, rev))
    }

    fn is_dirty(&self, dir: &Path, rev: &str) -> bool {
        match self.output(dir, self.spec.diff, rev) {
            Ok(diff) => !diff.is_empty(),
            Err(_) => true,
        }
    }

    fn describe(&self, dir: &Path, rev: &str) -> String {
        self.output(dir, self.spec.describe, rev).unwrap_or_default()
    }

    fn download(&self, dir: &Path) -> Result<()> {
        process::run(&mut self.command(dir, self.spec.download, ""))?;
        Ok(())
    }

    fn rev_sync(&self, dir: &Path, rev: &str) -> Result<()> {
        process::run(&mut self.command(dir, self.spec.rev_sync, rev))?;
        Ok(())
    }
}
