//! Layered gitignore-style exclusion.
//!
//! Each ignore file found during a scan becomes a [`PatternScope`] bound to
//! the directory that holds it. The [`IgnoreResolver`] keeps those scopes on
//! a LIFO stack that mirrors directory entry and exit, and answers
//! inclusion questions by asking the innermost ancestor scope first.

use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log;
use std::path::{Path, PathBuf};

/// Version-control metadata directory. Never scanned.
pub const VCS_DIR_NAME: &str = ".git";
pub const GITIGNORE_FILE_NAME: &str = ".gitignore";
/// The engine's own ignore file. Always honored, never emitted.
pub const JSMASHY_IGNORE_FILE_NAME: &str = ".jsmashyignore";

const ALWAYS_EXCLUDED_NAMES: [&str; 2] = [VCS_DIR_NAME, JSMASHY_IGNORE_FILE_NAME];

/// Outcome of evaluating one scope's rules against a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The last matching rule excludes the path.
    Excluded,
    /// The last matching rule is a negation (`!pattern`).
    Included,
    /// No rule in the scope matches.
    NoOpinion,
}

/// The compiled rules of a single ignore file.
#[derive(Debug, Clone)]
pub struct PatternScope {
    boundary: PathBuf,
    matcher: Gitignore,
}

impl PatternScope {
    /// Compiles `file` into a scope rooted at `boundary`.
    ///
    /// Malformed lines are logged and dropped. Returns `None` only when the
    /// file cannot be compiled at all.
    pub fn from_file(boundary: &Path, file: &Path) -> Option<Self> {
        let mut builder = GitignoreBuilder::new(boundary);
        if let Some(err) = builder.add(file) {
            log::warn!(
                "Ignoring malformed rules in {}: {}",
                file.display(),
                err
            );
        }
        match builder.build() {
            Ok(matcher) => Some(Self {
                boundary: boundary.to_path_buf(),
                matcher,
            }),
            Err(e) => {
                log::warn!("Could not compile ignore file {}: {}", file.display(), e);
                None
            }
        }
    }

    /// Builds a scope from in-memory rule lines, in declaration order.
    pub fn from_lines<I, S>(boundary: &Path, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GitignoreBuilder::new(boundary);
        for line in lines {
            let line = line.as_ref();
            if let Err(e) = builder.add_line(None, line) {
                log::warn!("Skipping malformed ignore rule \"{}\": {}", line, e);
            }
        }
        let matcher = builder.build().unwrap_or_else(|e| {
            log::warn!("Could not compile ignore rules: {}", e);
            Gitignore::empty()
        });
        Self {
            boundary: boundary.to_path_buf(),
            matcher,
        }
    }

    pub fn boundary(&self) -> &Path {
        &self.boundary
    }

    pub fn rule_count(&self) -> u64 {
        self.matcher.num_ignores() + self.matcher.num_whitelists()
    }

    /// Evaluates a path already made relative to this scope's boundary.
    /// The last matching rule wins.
    pub fn judge(&self, relative: &Path, is_dir: bool) -> Verdict {
        match self.matcher.matched(relative, is_dir) {
            Match::None => Verdict::NoOpinion,
            Match::Ignore(_) => Verdict::Excluded,
            Match::Whitelist(_) => Verdict::Included,
        }
    }
}

/// True for names that are excluded before any scope is consulted.
pub fn is_always_excluded(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| ALWAYS_EXCLUDED_NAMES.contains(&name))
}

/// Stack of active scopes, innermost last.
#[derive(Debug, Default)]
pub struct IgnoreResolver {
    scopes: Vec<PatternScope>,
}

impl IgnoreResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scope: PatternScope) {
        log::debug!(
            "Entering ignore scope {} ({} rules)",
            scope.boundary.display(),
            scope.rule_count()
        );
        self.scopes.push(scope);
    }

    /// Pops every scope bound to `dir`. A directory may own several scopes
    /// (one per ignore-file convention); all of them leave together.
    pub fn pop_scopes_for(&mut self, dir: &Path) -> usize {
        let mut popped = 0;
        while self.scopes.last().is_some_and(|s| s.boundary == dir) {
            self.scopes.pop();
            popped += 1;
        }
        if popped > 0 {
            log::debug!("Leaving {} ignore scope(s) at {}", popped, dir.display());
        }
        popped
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Decides whether `path` (absolute, or relative to the same base as the
    /// scope boundaries) is excluded.
    pub fn is_excluded(&self, path: &Path, is_dir: bool) -> bool {
        if is_always_excluded(path) {
            log::trace!("Always excluded: {}", path.display());
            return true;
        }

        for scope in self.scopes.iter().rev() {
            let Ok(relative) = path.strip_prefix(&scope.boundary) else {
                continue;
            };
            if relative.as_os_str().is_empty() {
                continue;
            }
            match scope.judge(relative, is_dir) {
                Verdict::Excluded => {
                    log::trace!(
                        "Excluded by scope {}: {}",
                        scope.boundary.display(),
                        path.display()
                    );
                    return true;
                }
                Verdict::Included => {
                    log::trace!(
                        "Re-included by scope {}: {}",
                        scope.boundary.display(),
                        path.display()
                    );
                    return false;
                }
                Verdict::NoOpinion => {}
            }
        }
        false
    }
}
