//! Removal of generated artifacts
//!
//! Presets name directories and file patterns. Directories are either
//! emptied (keeping a `.gitkeep`) or removed entirely; patterns are simple
//! globs matched case-insensitively against file names anywhere under the
//! root, outside the preset directories.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use plumbline_common::Error;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const GITKEEP: &str = ".gitkeep";

/// Directories never descended into while matching patterns
const SKIP_DIRS: &[&str] = &[".git", "target"];

/// Cleanup preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanTarget {
    Reports,
    Logs,
    Build,
    Cache,
    All,
}

impl FromStr for CleanTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reports" => Ok(CleanTarget::Reports),
            "logs" => Ok(CleanTarget::Logs),
            "build" => Ok(CleanTarget::Build),
            "cache" | "node-cache" => Ok(CleanTarget::Cache),
            "all" => Ok(CleanTarget::All),
            other => Err(Error::InvalidConfig(format!(
                "unknown cleanup target '{other}' (expected reports, logs, build, cache or all)"
            ))),
        }
    }
}

/// A directory to clean
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRule {
    pub path: PathBuf,
    /// Empty the directory and leave a `.gitkeep` instead of removing it
    pub keep_structure: bool,
}

impl DirRule {
    fn keep(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            keep_structure: true,
        }
    }

    fn remove(path: &str) -> Self {
        Self {
            path: PathBuf::from(path),
            keep_structure: false,
        }
    }
}

/// What a cleanup run touches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupPlan {
    pub directories: Vec<DirRule>,
    pub patterns: Vec<String>,
}

impl CleanupPlan {
    pub fn for_target(target: CleanTarget) -> Self {
        match target {
            CleanTarget::Reports => Self {
                directories: vec![DirRule::keep("reports")],
                patterns: vec![
                    "cucumber-report.*".into(),
                    "health-check.json".into(),
                    "health-status.txt".into(),
                ],
            },
            CleanTarget::Logs => Self {
                directories: vec![DirRule::keep("logs")],
                patterns: vec!["*.log".into()],
            },
            CleanTarget::Build => Self {
                directories: vec![
                    DirRule::remove("dist"),
                    DirRule::remove("build"),
                    DirRule::remove("coverage"),
                ],
                patterns: vec![],
            },
            CleanTarget::Cache => Self {
                directories: vec![DirRule::remove(".cache")],
                patterns: vec![],
            },
            CleanTarget::All => {
                let mut plan = Self {
                    directories: vec![],
                    patterns: vec![],
                };
                for part in [
                    CleanTarget::Reports,
                    CleanTarget::Logs,
                    CleanTarget::Build,
                    CleanTarget::Cache,
                ] {
                    let sub = Self::for_target(part);
                    plan.directories.extend(sub.directories);
                    plan.patterns.extend(sub.patterns);
                }
                plan.patterns
                    .extend(["*.tmp", ".DS_Store", "Thumbs.db"].map(String::from));
                plan
            }
        }
    }
}

/// Counters for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    pub directories_processed: usize,
    pub files_deleted: usize,
    pub bytes_freed: u64,
    pub errors: Vec<String>,
    /// Files and directories removed, or that would be in a dry run
    pub removed: Vec<PathBuf>,
}

/// Convert a glob with `*` and `?` into an anchored, case-insensitive regex.
pub fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut re = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => re.push_str(".*"),
            '?' => re.push('.'),
            c => re.push_str(&regex::escape(&c.to_string())),
        }
    }
    re.push('$');
    RegexBuilder::new(&re).case_insensitive(true).build()
}

/// Runs a [`CleanupPlan`] below a root directory
pub struct Cleaner {
    root: PathBuf,
    dry_run: bool,
    stats: CleanupStats,
}

impl Cleaner {
    pub fn new(root: impl Into<PathBuf>, dry_run: bool) -> Self {
        Self {
            root: root.into(),
            dry_run,
            stats: CleanupStats::default(),
        }
    }

    pub fn run(mut self, plan: &CleanupPlan) -> CleanupStats {
        info!(
            "🧹 Starting cleanup ({})",
            if self.dry_run { "DRY RUN" } else { "EXECUTE" }
        );
        for rule in &plan.directories {
            self.clean_directory(rule);
        }
        for pattern in &plan.patterns {
            self.clean_pattern(pattern, &plan.directories);
        }
        self.stats
    }

    fn clean_directory(&mut self, rule: &DirRule) {
        let full = self.root.join(&rule.path);
        if !full.exists() {
            debug!("⏭️ Directory doesn't exist: {}", rule.path.display());
            return;
        }
        if !full.is_dir() {
            warn!("⚠️ Not a directory: {}", rule.path.display());
            return;
        }
        info!("📁 Processing directory: {}", rule.path.display());
        self.stats.directories_processed += 1;

        if !rule.keep_structure {
            self.remove_tree(&full);
            return;
        }

        let entries = match std::fs::read_dir(&full) {
            Ok(entries) => entries,
            Err(e) => {
                self.error(format!("Failed to read {}: {e}", full.display()));
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if entry.file_name() == GITKEEP {
                continue;
            }
            if path.is_dir() {
                self.remove_tree(&path);
            } else {
                self.remove_file(&path);
            }
        }

        let gitkeep = full.join(GITKEEP);
        if !gitkeep.exists() && !self.dry_run {
            if let Err(e) = std::fs::write(&gitkeep, "") {
                self.error(format!("Failed to create {}: {e}", gitkeep.display()));
            }
        }
    }

    fn clean_pattern(&mut self, pattern: &str, dirs: &[DirRule]) {
        let re = match glob_to_regex(pattern) {
            Ok(re) => re,
            Err(e) => {
                self.error(format!("Invalid pattern {pattern}: {e}"));
                return;
            }
        };
        debug!("🔍 Looking for files matching: {}", pattern);

        let excluded: Vec<PathBuf> = dirs.iter().map(|d| self.root.join(&d.path)).collect();
        let walker = WalkDir::new(&self.root).into_iter().filter_entry(|e| {
            let skip_name = e.depth() > 0
                && e.file_type().is_dir()
                && SKIP_DIRS.iter().any(|s| e.file_name() == *s);
            !skip_name && !excluded.iter().any(|x| e.path() == x)
        });

        let mut matches = Vec::new();
        for entry in walker {
            match entry {
                Ok(e) if e.file_type().is_file() => {
                    if re.is_match(&e.file_name().to_string_lossy()) {
                        matches.push(e.into_path());
                    }
                }
                Ok(_) => {}
                Err(e) => self.error(format!("Failed to search: {e}")),
            }
        }
        for path in matches {
            self.remove_file(&path);
        }
    }

    fn remove_file(&mut self, path: &Path) {
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
        if !self.dry_run {
            if let Err(e) = std::fs::remove_file(path) {
                self.error(format!("Failed to delete {}: {e}", path.display()));
                return;
            }
        }
        debug!("🗑️ {} ({} bytes)", path.display(), size);
        self.stats.files_deleted += 1;
        self.stats.bytes_freed += size;
        self.stats.removed.push(path.to_path_buf());
    }

    fn remove_tree(&mut self, path: &Path) {
        let (files, bytes) = WalkDir::new(path)
            .into_iter()
            .flatten()
            .filter(|e| e.file_type().is_file())
            .fold((0usize, 0u64), |(n, b), e| {
                (n + 1, b + e.metadata().map(|m| m.len()).unwrap_or(0))
            });

        if !self.dry_run {
            if let Err(e) = std::fs::remove_dir_all(path) {
                self.error(format!("Failed to delete {}: {e}", path.display()));
                return;
            }
        }
        debug!("🗑️ {} ({} files, {} bytes)", path.display(), files, bytes);
        self.stats.files_deleted += files;
        self.stats.bytes_freed += bytes;
        self.stats.removed.push(path.to_path_buf());
    }

    fn error(&mut self, message: String) {
        warn!("❌ {}", message);
        self.stats.errors.push(message);
    }
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn seed(root: &Path) {
        fs::create_dir_all(root.join("reports/nested")).unwrap();
        fs::write(root.join("reports/cucumber-report.json"), "[]").unwrap();
        fs::write(root.join("reports/nested/x.html"), "<html>").unwrap();
        fs::create_dir_all(root.join("logs")).unwrap();
        fs::write(root.join("logs/test.log"), "line").unwrap();
        fs::write(root.join("debug.log"), "12345").unwrap();
        fs::write(root.join("health-check.json"), "{}").unwrap();
        fs::create_dir_all(root.join("dist")).unwrap();
        fs::write(root.join("dist/app.js"), "x").unwrap();
        fs::write(root.join("scratch.TMP"), "t").unwrap();
        fs::create_dir_all(root.join("target/debug")).unwrap();
        fs::write(root.join("target/debug/build.log"), "keep").unwrap();
    }

    #[test]
    fn test_target_names() {
        assert_eq!("node-cache".parse::<CleanTarget>().unwrap(), CleanTarget::Cache);
        assert!("everything".parse::<CleanTarget>().is_err());
    }

    #[test]
    fn test_glob_to_regex() {
        let re = glob_to_regex("cucumber-report.*").unwrap();
        assert!(re.is_match("cucumber-report.html"));
        assert!(!re.is_match("cucumber-reportXhtml"));
        assert!(glob_to_regex("*.log").unwrap().is_match("TEST.LOG"));
        assert!(glob_to_regex("file?.txt").unwrap().is_match("file1.txt"));
    }

    #[test]
    fn test_reports_keep_structure() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());

        let stats = Cleaner::new(dir.path(), false).run(&CleanupPlan::for_target(CleanTarget::Reports));
        assert_eq!(stats.directories_processed, 1);
        assert!(dir.path().join("reports").is_dir());
        assert!(dir.path().join("reports/.gitkeep").exists());
        assert!(!dir.path().join("reports/nested").exists());
        assert!(!dir.path().join("health-check.json").exists());
        assert!(dir.path().join("logs/test.log").exists());
        assert_eq!(stats.files_deleted, 3);
        assert!(stats.errors.is_empty());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());

        let stats = Cleaner::new(dir.path(), true).run(&CleanupPlan::for_target(CleanTarget::All));
        assert!(stats.files_deleted > 0);
        assert!(stats.bytes_freed > 0);
        assert!(dir.path().join("reports/cucumber-report.json").exists());
        assert!(dir.path().join("dist/app.js").exists());
        assert!(!dir.path().join("reports/.gitkeep").exists());
    }

    #[test]
    fn test_all_removes_build_and_patterns() {
        let dir = tempfile::tempdir().unwrap();
        seed(dir.path());

        let stats = Cleaner::new(dir.path(), false).run(&CleanupPlan::for_target(CleanTarget::All));
        assert!(!dir.path().join("dist").exists());
        assert!(!dir.path().join("debug.log").exists());
        assert!(!dir.path().join("scratch.TMP").exists());
        assert!(dir.path().join("logs/.gitkeep").exists());
        // target/ is never searched
        assert!(dir.path().join("target/debug/build.log").exists());
        assert_eq!(stats.directories_processed, 3);
    }

    #[test]
    fn test_missing_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let stats = Cleaner::new(dir.path(), false).run(&CleanupPlan::for_target(CleanTarget::Cache));
        assert_eq!(stats, CleanupStats::default());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
    }
}
