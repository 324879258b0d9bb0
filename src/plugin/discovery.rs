//! Plugin candidate discovery
//!
//! Patterns are `/`-separated paths relative to the plugin root. Each component
//! matches exactly one directory level and may use `*` and `?` wildcards, so
//! `plugins/*` yields every directory directly under `plugins`. Hidden entries
//! are only matched by a component that itself starts with `.`.

use crate::core::error::{BusError, Result};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;
use wildmatch::WildMatch;

/// Expand every pattern into plugin directories
///
/// Patterns are processed in order and matches within one pattern come in
/// file-name order. A directory matched by two patterns is returned twice.
pub fn discover(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let root = absolute_root(root)?;
    if !root.is_dir() {
        return Err(BusError::Discovery(format!(
            "plugin root {} is not a directory",
            root.display()
        )));
    }

    let mut found = Vec::new();
    for pattern in patterns {
        let matches = expand(&root, pattern)?;
        tracing::debug!(pattern = %pattern, count = matches.len(), "Expanded plugin pattern");
        found.extend(matches);
    }
    Ok(found)
}

/// Expand one pattern under an absolute root
pub fn expand(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if Path::new(pattern).is_absolute() {
        return Err(BusError::Discovery(format!(
            "pattern {:?} must be relative to the plugin root",
            pattern
        )));
    }

    let matchers: Vec<(WildMatch, bool)> = pattern
        .split('/')
        .filter(|component| !component.is_empty() && *component != ".")
        .map(|component| (WildMatch::new(component), component.starts_with('.')))
        .collect();
    let depth = matchers.len();

    let walker = WalkDir::new(root)
        .min_depth(depth)
        .max_depth(depth)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let level = entry.depth();
            if level == 0 {
                return true;
            }
            let (matcher, allows_hidden) = &matchers[level - 1];
            let name = entry.file_name().to_string_lossy();
            entry.file_type().is_dir()
                && (*allows_hidden || !name.starts_with('.'))
                && matcher.matches(&name)
        });

    let mut matches = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => matches.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(pattern = %pattern, "Skipping unreadable path during discovery: {}", e);
            }
        }
    }
    Ok(matches)
}

fn absolute_root(root: &Path) -> Result<PathBuf> {
    let root = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };

    // Drop `.` components so discovered paths read cleanly
    Ok(root
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mkdirs(root: &Path, dirs: &[&str]) {
        for dir in dirs {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
    }

    #[test]
    fn test_single_level_wildcard() {
        let tmp = TempDir::new().unwrap();
        mkdirs(tmp.path(), &["plugins/b", "plugins/a", "plugins/a/nested", "other/c"]);
        std::fs::write(tmp.path().join("plugins/readme.txt"), "not a plugin").unwrap();

        let found = discover(tmp.path(), &["plugins/*".to_string()]).unwrap();
        assert_eq!(
            found,
            vec![tmp.path().join("plugins/a"), tmp.path().join("plugins/b")]
        );
        assert!(found.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_patterns_keep_order_and_duplicates() {
        let tmp = TempDir::new().unwrap();
        mkdirs(tmp.path(), &["p2/two", "p1/one"]);

        let patterns = vec!["p2/*".to_string(), "p1/*".to_string(), "p1/one".to_string()];
        let found = discover(tmp.path(), &patterns).unwrap();
        assert_eq!(
            found,
            vec![
                tmp.path().join("p2/two"),
                tmp.path().join("p1/one"),
                tmp.path().join("p1/one"),
            ]
        );
    }

    #[test]
    fn test_question_mark_and_intermediate_wildcards() {
        let tmp = TempDir::new().unwrap();
        mkdirs(tmp.path(), &["team-a/plugins/x1", "team-b/plugins/x2", "team-b/plugins/xyz"]);

        let found = discover(tmp.path(), &["team-*/plugins/x?".to_string()]).unwrap();
        assert_eq!(
            found,
            vec![
                tmp.path().join("team-a/plugins/x1"),
                tmp.path().join("team-b/plugins/x2"),
            ]
        );
    }

    #[test]
    fn test_hidden_directories_need_explicit_dot() {
        let tmp = TempDir::new().unwrap();
        mkdirs(tmp.path(), &["plugins/.git", "plugins/real", ".cache/plugin"]);

        let found = discover(tmp.path(), &["plugins/*".to_string(), "*/*".to_string()]).unwrap();
        assert_eq!(
            found,
            vec![tmp.path().join("plugins/real"), tmp.path().join("plugins/real")]
        );

        let found = discover(tmp.path(), &["plugins/.*".to_string(), ".cache/*".to_string()]).unwrap();
        assert_eq!(
            found,
            vec![tmp.path().join("plugins/.git"), tmp.path().join(".cache/plugin")]
        );
    }

    #[test]
    fn test_no_match_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(discover(tmp.path(), &["missing/*".to_string()]).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_inputs() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            discover(tmp.path(), &["/abs/*".to_string()]),
            Err(BusError::Discovery(_))
        ));
        assert!(matches!(
            discover(&tmp.path().join("nope"), &["*".to_string()]),
            Err(BusError::Discovery(_))
        ));
    }
}
