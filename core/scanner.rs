use crate::config::Config;
use crate::error::{AppError, Result};
use crate::ignore_rules::{
    GITIGNORE_FILE_NAME, IgnoreResolver, JSMASHY_IGNORE_FILE_NAME, PatternScope, VCS_DIR_NAME,
};
use crate::languages::{self, LanguageAnalyzer};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

// Appended to a directory path so that `dir/**` exclude globs also match the
// directory itself.
const DIR_MATCH_PROBE: &str = "dummy_file_for_dir_match";

/// One scanned file. `path` is relative to the scan root and always uses `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: String,
    pub content: String,
    pub skeletonized: bool,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            skeletonized: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Honor `.gitignore` files. `.jsmashyignore` files are always honored.
    pub use_gitignore: bool,
    /// Extra globs matched against root-relative paths.
    pub exclude: Vec<String>,
    /// Files larger than this many bytes are skipped.
    pub max_file_size: Option<u64>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            exclude: Vec::new(),
            max_file_size: None,
        }
    }
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            use_gitignore: config.general.use_gitignore,
            exclude: config.general.exclude.clone(),
            max_file_size: config.max_file_size_bytes()?,
        })
    }
}

/// Files collected by a scan plus counts of everything left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub files: Vec<FileRecord>,
    pub excluded: usize,
    pub binary: usize,
    pub oversized: usize,
    pub unreadable: usize,
    /// Supported files whose analysis failed; stored raw.
    pub degraded: usize,
    pub skeletonized: usize,
}

impl ScanReport {
    pub fn skipped(&self) -> usize {
        self.excluded + self.binary + self.oversized + self.unreadable
    }
}

/// Depth-first, single-threaded directory scanner.
#[derive(Debug)]
pub struct Scanner {
    analyzers: Vec<Box<dyn LanguageAnalyzer>>,
    options: ScanOptions,
    exclude_set: GlobSet,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    /// Scanner with the default analyzers and options.
    pub fn new() -> Self {
        Self::with_analyzers(languages::default_analyzers())
    }

    /// Scanner with an explicit, ordered analyzer list. An empty list stores
    /// every file raw.
    pub fn with_analyzers(analyzers: Vec<Box<dyn LanguageAnalyzer>>) -> Self {
        Self {
            analyzers,
            options: ScanOptions::default(),
            exclude_set: GlobSet::empty(),
        }
    }

    pub fn with_options(mut self, options: ScanOptions) -> Result<Self> {
        self.exclude_set = build_glob_set_from_vec(&options.exclude)?;
        self.options = options;
        Ok(self)
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let analyzers = if config.skeleton.enabled {
            languages::default_analyzers()
        } else {
            log::debug!("Skeletonization disabled; files are stored raw.");
            Vec::new()
        };
        Self::with_analyzers(analyzers).with_options(ScanOptions::from_config(config)?)
    }

    /// Collects every included file under `root`, in traversal order.
    pub fn scan(&self, root: &Path) -> Result<Vec<FileRecord>> {
        self.scan_with_report(root).map(|report| report.files)
    }

    pub fn scan_with_report(&self, root: &Path) -> Result<ScanReport> {
        let root = root.canonicalize().map_err(|e| AppError::RootNotFound {
            path: root.to_path_buf(),
            source: e,
        })?;
        if !root.is_dir() {
            return Err(AppError::RootNotDirectory(root));
        }
        log::info!("Scanning directory: {}", root.display());

        let mut resolver = IgnoreResolver::new();
        let ancestors = enclosing_repository_dirs(&root);
        for dir in &ancestors {
            self.enter_directory(&mut resolver, dir);
        }

        let mut report = ScanReport::default();
        let mut open_dirs: Vec<PathBuf> = Vec::new();
        let mut walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = walker.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => return Err(e.into()),
                Err(e) => {
                    log::warn!("Error walking directory: {}", e);
                    report.unreadable += 1;
                    continue;
                }
            };

            // Leave every directory that is not an ancestor of this entry.
            while open_dirs.len() > entry.depth() {
                if let Some(dir) = open_dirs.pop() {
                    resolver.pop_scopes_for(&dir);
                }
            }

            let path = entry.path();
            let relative = relative_slash_path(path, &root);

            if entry.file_type().is_dir() {
                if entry.depth() > 0 && self.is_excluded(&resolver, path, &relative, true) {
                    log::trace!("Pruning directory: {}", relative);
                    report.excluded += 1;
                    walker.skip_current_dir();
                    continue;
                }
                self.enter_directory(&mut resolver, path);
                open_dirs.push(path.to_path_buf());
                continue;
            }

            if !entry.file_type().is_file() {
                log::trace!("Skipping non-regular entry: {}", relative);
                continue;
            }
            if self.is_excluded(&resolver, path, &relative, false) {
                log::trace!("Excluding file: {}", relative);
                report.excluded += 1;
                continue;
            }
            if let Some(record) = self.load_file(&entry, relative, &mut report) {
                report.files.push(record);
            }
        }

        while let Some(dir) = open_dirs.pop() {
            resolver.pop_scopes_for(&dir);
        }
        for dir in ancestors.iter().rev() {
            resolver.pop_scopes_for(dir);
        }
        debug_assert!(resolver.is_empty(), "ignore scopes leaked past the scan");

        log::info!(
            "Scan complete: {} files collected ({} skeletonized, {} degraded), {} skipped.",
            report.files.len(),
            report.skeletonized,
            report.degraded,
            report.skipped()
        );
        Ok(report)
    }

    fn ignore_file_names(&self) -> &'static [&'static str] {
        if self.options.use_gitignore {
            &[GITIGNORE_FILE_NAME, JSMASHY_IGNORE_FILE_NAME]
        } else {
            &[JSMASHY_IGNORE_FILE_NAME]
        }
    }

    /// Pushes one scope per recognized ignore file in `dir`.
    fn enter_directory(&self, resolver: &mut IgnoreResolver, dir: &Path) {
        for name in self.ignore_file_names() {
            let ignore_file = dir.join(name);
            if !ignore_file.is_file() {
                continue;
            }
            if let Some(scope) = PatternScope::from_file(dir, &ignore_file) {
                resolver.push(scope);
            }
        }
    }

    fn is_excluded(
        &self,
        resolver: &IgnoreResolver,
        path: &Path,
        relative: &str,
        is_dir: bool,
    ) -> bool {
        if self.exclude_set.is_match(relative)
            || (is_dir
                && self
                    .exclude_set
                    .is_match(format!("{}/{}", relative, DIR_MATCH_PROBE)))
        {
            log::trace!("Path excluded by configured exclude set: {}", relative);
            return true;
        }
        resolver.is_excluded(path, is_dir)
    }

    fn load_file(
        &self,
        entry: &DirEntry,
        relative: String,
        report: &mut ScanReport,
    ) -> Option<FileRecord> {
        let path = entry.path();
        if let Some(limit) = self.options.max_file_size {
            match entry.metadata() {
                Ok(meta) if meta.len() > limit => {
                    log::debug!(
                        "Skipping large file: {} ({} bytes > {})",
                        relative,
                        meta.len(),
                        limit
                    );
                    report.oversized += 1;
                    return None;
                }
                Ok(_) => {}
                Err(e) => log::debug!("Could not stat {}: {}", relative, e),
            }
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("{}", AppError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                });
                report.unreadable += 1;
                return None;
            }
        };
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(e) => {
                log::debug!("Skipping non-UTF-8 file: {} ({})", relative, e);
                report.binary += 1;
                return None;
            }
        };

        let mut record = FileRecord::new(relative, content);
        let file_name = entry.file_name().to_string_lossy();
        if let Some(analyzer) = languages::find_analyzer(&self.analyzers, &file_name) {
            let result = analyzer.analyze(&record.content);
            if result.has_errors() {
                log::warn!(
                    "{} analyzer reported {} error(s) in {}; keeping original content",
                    analyzer.name(),
                    result.errors.len(),
                    record.path
                );
                for err in &result.errors {
                    log::debug!("  {}", err);
                }
                report.degraded += 1;
            } else {
                record.content = result.skeleton;
                record.skeletonized = true;
                report.skeletonized += 1;
            }
        }
        Some(record)
    }
}

/// Directories from the enclosing repository root down to, but excluding,
/// `root`. Empty when `root` is itself a repository root or when no
/// ancestor holds a `.git` entry.
pub fn enclosing_repository_dirs(root: &Path) -> Vec<PathBuf> {
    if root.join(VCS_DIR_NAME).exists() {
        return Vec::new();
    }
    let mut chain = Vec::new();
    let mut current = root.parent();
    while let Some(dir) = current {
        chain.push(dir.to_path_buf());
        if dir.join(VCS_DIR_NAME).exists() {
            chain.reverse();
            return chain;
        }
        current = dir.parent();
    }
    Vec::new()
}

/// `path` relative to `root`, joined with `/` on every platform.
pub fn relative_slash_path(path: &Path, root: &Path) -> String {
    let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn build_glob_set_from_vec(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern_str in patterns {
        let mut processed_pattern = pattern_str.trim().to_string();
        if processed_pattern.is_empty() {
            continue;
        }
        if processed_pattern.ends_with('/') && processed_pattern.len() > 1 {
            processed_pattern.push_str("**");
        }
        match Glob::new(&processed_pattern) {
            Ok(glob) => {
                log::trace!(
                    "Adding glob pattern: {} (processed as {})",
                    pattern_str,
                    processed_pattern
                );
                builder.add(glob);
            }
            Err(e) => {
                log::error!("Invalid glob pattern \"{}\": {}", pattern_str, e);
                return Err(AppError::Glob(format!(
                    "Invalid glob pattern \"{}\" (processed as \"{}\"): {}",
                    pattern_str, processed_pattern, e
                )));
            }
        }
    }
    builder.build().map_err(|e| {
        log::error!("Error building glob set: {}", e);
        AppError::Glob(e.to_string())
    })
}
