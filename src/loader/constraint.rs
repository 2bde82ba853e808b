//! Conditional-build constraints.
//!
//! A source file applies to the current target when its name suffixes and its
//! leading `//go:build` or `// +build` comments are satisfied by the
//! [`BuildContext`].

const KNOWN_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "js", "linux",
    "nacl", "netbsd", "openbsd", "plan9", "solaris", "wasip1", "windows", "zos",
];

const KNOWN_ARCH: &[&str] = &[
    "386", "amd64", "amd64p32", "arm", "armbe", "arm64", "arm64be", "loong64", "mips", "mipsle",
    "mips64", "mips64le", "mips64p32", "mips64p32le", "ppc", "ppc64", "ppc64le", "riscv",
    "riscv64", "s390", "s390x", "sparc", "sparc64", "wasm",
];

const UNIX_OS: &[&str] = &[
    "aix", "android", "darwin", "dragonfly", "freebsd", "hurd", "illumos", "ios", "linux",
    "netbsd", "openbsd", "solaris",
];

/// Target description used to decide which files take part in a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildContext {
    pub goos: String,
    pub goarch: String,
    pub tags: Vec<String>,
}

impl BuildContext {
    pub fn matches_tag(&self, tag: &str) -> bool {
        if tag == self.goos || tag == self.goarch || tag == "gc" {
            return true;
        }
        match (tag, self.goos.as_str()) {
            ("unix", os) if UNIX_OS.contains(&os) => return true,
            ("linux", "android") | ("solaris", "illumos") | ("darwin", "ios") => return true,
            _ => {}
        }
        self.tags.iter().any(|t| t == tag)
    }

    /// File-name suffix rule: `name_GOOS.go`, `name_GOARCH.go` and
    /// `name_GOOS_GOARCH.go` (optionally followed by `_test`) only apply to
    /// matching targets.
    pub fn matches_file_name(&self, name: &str) -> bool {
        let stem = name.strip_suffix(".go").unwrap_or(name);
        let stem = stem.strip_suffix("_test").unwrap_or(stem);
        let Some((_, rest)) = stem.split_once('_') else {
            return true;
        };
        let parts: Vec<&str> = rest.split('_').collect();
        let n = parts.len();
        if n >= 2 && KNOWN_OS.contains(&parts[n - 2]) && KNOWN_ARCH.contains(&parts[n - 1]) {
            return self.matches_tag(parts[n - 2]) && self.matches_tag(parts[n - 1]);
        }
        let last = parts[n - 1];
        if KNOWN_OS.contains(&last) || KNOWN_ARCH.contains(&last) {
            return self.matches_tag(last);
        }
        true
    }

    /// Evaluate the constraint comments that precede the package clause.
    /// A `//go:build` line takes precedence over `// +build` lines.
    pub fn matches_source(&self, src: &str) -> bool {
        let mut go_build = None;
        let mut plus_build = Vec::new();
        let mut in_block = false;

        for line in src.lines() {
            let line = line.trim();
            if in_block {
                if line.contains("*/") {
                    in_block = false;
                }
                continue;
            }
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix("//") {
                if let Some(expr) = comment.strip_prefix("go:build") {
                    go_build.get_or_insert_with(|| expr.trim().to_string());
                } else if let Some(opts) = comment.trim_start().strip_prefix("+build") {
                    plus_build.push(opts.trim().to_string());
                }
                continue;
            }
            if line.starts_with("/*") {
                in_block = !line.contains("*/");
                continue;
            }
            break;
        }

        if let Some(expr) = go_build {
            return match ExprParser::new(&expr, self).parse() {
                Some(ok) => ok,
                None => {
                    log::debug!("invalid //go:build expression: {}", expr);
                    false
                }
            };
        }
        plus_build.iter().all(|line| self.matches_plus_build(line))
    }

    /// Space-separated options are OR-ed; comma-separated terms are AND-ed.
    fn matches_plus_build(&self, line: &str) -> bool {
        line.split_whitespace().any(|option| {
            option.split(',').all(|term| match term.strip_prefix('!') {
                Some(negated) => !negated.is_empty() && !self.matches_tag(negated),
                None => !term.is_empty() && self.matches_tag(term),
            })
        })
    }
}

/// Recursive-descent evaluator for `//go:build` expressions.
struct ExprParser<'a> {
    src: &'a [u8],
    pos: usize,
    ctx: &'a BuildContext,
}

impl<'a> ExprParser<'a> {
    fn new(src: &'a str, ctx: &'a BuildContext) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            ctx,
        }
    }

    fn parse(mut self) -> Option<bool> {
        let value = self.or()?;
        self.skip_space();
        (self.pos == self.src.len()).then_some(value)
    }

    fn or(&mut self) -> Option<bool> {
        let mut value = self.and()?;
        while self.eat("||") {
            value |= self.and()?;
        }
        Some(value)
    }

    fn and(&mut self) -> Option<bool> {
        let mut value = self.not()?;
        while self.eat("&&") {
            value &= self.not()?;
        }
        Some(value)
    }

    fn not(&mut self) -> Option<bool> {
        if self.eat("!") {
            return Some(!self.not()?);
        }
        if self.eat("(") {
            let value = self.or()?;
            return self.eat(")").then_some(value);
        }
        let tag = self.ident()?;
        Some(self.ctx.matches_tag(tag))
    }

    fn ident(&mut self) -> Option<&'a str> {
        self.skip_space();
        let start = self.pos;
        while self.pos < self.src.len()
            && (self.src[self.pos].is_ascii_alphanumeric() || matches!(self.src[self.pos], b'_' | b'.'))
        {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        std::str::from_utf8(&self.src[start..self.pos]).ok()
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_space();
        if self.src[self.pos..].starts_with(token.as_bytes()) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn skip_space(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }
}
