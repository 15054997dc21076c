//! Configuration discovery and effective settings resolution.
//!
//! doccollab-lint reads `doccollab.toml|yaml|yml` from the repository root
//! (or closest ancestor) and merges it with CLI flags to produce an
//! `Effective` config.
//! Defaults:
//! - `output`: `human`
//! - `patterns`: `["**/*.tex"]`
//! - `lint.max_line_length`: 120
//! - `lint.disable`: empty
//! - `fix.write|diff|check`: false
//!
//! Overrides precedence: CLI > config file > defaults.

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::scan::ScanOptions;

const CONFIG_FILES: [&str; 3] = ["doccollab.toml", "doccollab.yaml", "doccollab.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Scanner settings under `[lint]`.
pub struct LintCfg {
    pub max_line_length: Option<usize>,
    /// Rule ids to drop from results.
    pub disable: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Defaults for the `fix` command under `[fix]`.
pub struct FixCfg {
    pub write: Option<bool>,
    pub diff: Option<bool>,
    pub check: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `doccollab.toml|yaml`.
pub struct DocCollabConfig {
    pub output: Option<String>,
    pub patterns: Option<Vec<String>>,
    pub lint: Option<LintCfg>,
    pub fix: Option<FixCfg>,
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub output: String,
    pub patterns: Vec<String>,
    pub max_line_length: usize,
    pub disabled: HashSet<String>,
    pub write: bool,
    pub diff: bool,
    pub check: bool,
}

impl Effective {
    /// The part of the configuration the scanner sees.
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            max_line_length: self.max_line_length,
            disabled: self.disabled.clone(),
        }
    }
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `doccollab.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_FILES.iter().any(|f| cur.join(f).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `DocCollabConfig` from `doccollab.toml` or `doccollab.yaml|yml` if
/// present. A file that fails to parse is reported and ignored.
pub fn load_config(root: &Path) -> Option<DocCollabConfig> {
    let toml_path = root.join(CONFIG_FILES[0]);
    if toml_path.exists() {
        let s = fs::read_to_string(&toml_path).ok()?;
        return match toml::from_str(&s) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                warn!(path = %toml_path.display(), error = %e, "ignoring invalid config");
                None
            }
        };
    }
    for yml in &CONFIG_FILES[1..] {
        let p = root.join(yml);
        if p.exists() {
            let s = fs::read_to_string(&p).ok()?;
            return match serde_yaml::from_str(&s) {
                Ok(cfg) => Some(cfg),
                Err(e) => {
                    warn!(path = %p.display(), error = %e, "ignoring invalid config");
                    None
                }
            };
        }
    }
    None
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_output: Option<&str>,
    cli_write: Option<bool>,
    cli_diff: Option<bool>,
    cli_check: Option<bool>,
) -> Effective {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    // `.` has no parent to walk up to; resolve it first.
    let start = fs::canonicalize(&start).unwrap_or(start);
    let repo_root = detect_repo_root(&start);
    let cfg = load_config(&repo_root).unwrap_or_default();

    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());

    let patterns = cfg
        .patterns
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| vec!["**/*.tex".to_string()]);

    let max_line_length = cfg
        .lint
        .as_ref()
        .and_then(|l| l.max_line_length)
        .unwrap_or(ScanOptions::default().max_line_length);
    let disabled = cfg
        .lint
        .as_ref()
        .and_then(|l| l.disable.clone())
        .unwrap_or_default()
        .into_iter()
        .collect();

    let write = cli_write
        .or_else(|| cfg.fix.as_ref().and_then(|f| f.write))
        .unwrap_or(false);
    let diff = cli_diff
        .or_else(|| cfg.fix.as_ref().and_then(|f| f.diff))
        .unwrap_or(false);
    let check = cli_check
        .or_else(|| cfg.fix.as_ref().and_then(|f| f.check))
        .unwrap_or(false);

    Effective {
        repo_root,
        output,
        patterns,
        max_line_length,
        disabled,
        write,
        diff,
        check,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("doccollab.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
output = "json"
patterns = ["chapters/**/*.tex"]
[lint]
max_line_length = 80
disable = ["line_length", "quote_style"]
[fix]
write = true
    "#
        )
        .unwrap();

        // Resolve using explicit repo_root to avoid global CWD races
        let eff = resolve_effective(root.to_str(), None, None, None, None);
        assert_eq!(eff.output, "json");
        assert_eq!(eff.patterns, vec!["chapters/**/*.tex"]);
        assert_eq!(eff.max_line_length, 80);
        assert!(eff.disabled.contains("quote_style"));
        assert!(eff.write);
        assert_eq!(eff.scan_options().max_line_length, 80);
    }

    #[test]
    fn test_load_yaml_and_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("doccollab.yaml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
output: human
fix:
  diff: true
            "#
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), None, None, None, None);
        assert_eq!(eff.output, "human");
        assert_eq!(eff.patterns, vec!["**/*.tex"]);
        assert_eq!(eff.max_line_length, 120);
        assert!(eff.disabled.is_empty());
        assert!(eff.diff);
        assert!(!eff.write);
    }

    #[test]
    fn test_cli_takes_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("doccollab.toml"),
            "output = \"json\"\n[fix]\nwrite = true\ncheck = true\n",
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), Some("human"), Some(false), None, None);
        assert_eq!(eff.output, "human");
        assert!(!eff.write);
        assert!(eff.check);
    }

    #[test]
    fn test_root_detection_walks_up_to_git() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        let nested = root.join("paper/chapters");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(detect_repo_root(&nested), root.to_path_buf());
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("doccollab.toml"), "output = [not valid").unwrap();
        assert!(load_config(root).is_none());
        let eff = resolve_effective(root.to_str(), None, None, None, None);
        assert_eq!(eff.output, "human");
    }
}
