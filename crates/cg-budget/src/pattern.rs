// pattern.rs - Allow-list globs and forbidden-path prefixes.
//
// Allowed patterns are globs matched against a file's basename only. No
// patterns means every file is allowed; a configured list that matches
// nothing (blank entries, invalid globs, globs containing `/`) denies.
//
// Forbidden paths are plain prefixes that may appear anywhere in the
// normalized path: `.git/` catches both `.git/config` and
// `vendor/lib/.git/HEAD`. No prefixes means nothing is forbidden.

use glob::{MatchOptions, Pattern};

/// Check a path against a list of allowed glob patterns.
///
/// Invalid or blank globs never match (fail-closed). Only an empty list
/// allows everything.
pub fn matches_allowed_pattern(path: &str, patterns: &[String]) -> bool {
    if patterns.is_empty() {
        return true;
    }
    PatternSet::new(patterns).allows(path)
}

/// Check whether any forbidden prefix occurs in the path.
pub fn matches_forbidden_path(path: &str, prefixes: &[String]) -> bool {
    let normalized = normalize(path);
    prefixes
        .iter()
        .map(|p| normalize(p))
        .filter(|p| !p.is_empty())
        .any(|p| normalized.contains(p.as_str()))
}

/// A precompiled allow-list, built once per budget and reused across calls.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
    raw_patterns: Vec<String>,
}

impl PatternSet {
    pub fn new(raw: &[String]) -> Self {
        let mut patterns = Vec::new();
        let mut raw_patterns = Vec::new();
        for entry in raw {
            let trimmed = entry.trim();
            raw_patterns.push(trimmed.to_string());
            if trimmed.is_empty() {
                tracing::warn!("blank allowed_file_pattern never matches");
                continue;
            }
            match Pattern::new(trimmed) {
                Ok(p) => patterns.push(p),
                Err(e) => {
                    tracing::warn!(pattern = trimmed, error = %e, "ignoring invalid allowed_file_pattern")
                }
            }
        }
        Self {
            patterns,
            raw_patterns,
        }
    }

    /// True when no patterns were configured at all. Blank or invalid
    /// entries still count as configured.
    pub fn is_unrestricted(&self) -> bool {
        self.raw_patterns.is_empty()
    }

    pub fn allows(&self, path: &str) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        let normalized = normalize(path);
        let basename = normalized.rsplit('/').next().unwrap_or(&normalized);
        let opts = MatchOptions {
            require_literal_separator: true,
            ..Default::default()
        };
        self.patterns.iter().any(|p| p.matches_with(basename, opts))
    }

    /// The raw pattern strings (for display in messages).
    pub fn raw_patterns(&self) -> &[String] {
        &self.raw_patterns
    }
}

/// Use forward slashes and drop a leading `./`.
fn normalize(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    match replaced.strip_prefix("./") {
        Some(rest) => rest.to_string(),
        None => replaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_allow_list_allows_everything() {
        assert!(matches_allowed_pattern("anything/at/all.bin", &[]));
    }

    #[test]
    fn allow_list_matches_basename() {
        let patterns = list(&["*.py", "*.md"]);
        assert!(matches_allowed_pattern("src/deep/module.py", &patterns));
        assert!(matches_allowed_pattern("README.md", &patterns));
        assert!(!matches_allowed_pattern("src/main.rs", &patterns));
    }

    #[test]
    fn directory_globs_do_not_widen_the_allow_list() {
        let patterns = list(&["src/*"]);
        assert!(!matches_allowed_pattern("src/evil.sh", &patterns));
        assert!(!matches_allowed_pattern("src/pkg/mod.py", &list(&["src/**/*.py"])));
    }

    #[test]
    fn blank_entries_deny_instead_of_unrestricting() {
        for blank in ["", "   "] {
            let patterns = list(&[blank]);
            let set = PatternSet::new(&patterns);
            assert!(!set.is_unrestricted());
            assert!(!set.allows("deploy.sh"));
            assert!(!matches_allowed_pattern("deploy.sh", &patterns));
        }
        // A blank entry next to a real one is simply inert.
        assert!(matches_allowed_pattern("app.py", &list(&["", "*.py"])));
    }

    #[test]
    fn invalid_glob_never_matches() {
        let patterns = list(&["[unclosed"]);
        assert!(!matches_allowed_pattern("[unclosed", &patterns));
        assert!(!matches_allowed_pattern("main.py", &patterns));
    }

    #[test]
    fn forbidden_prefix_matches_root_and_nested() {
        let forbidden = list(&[".git/", "node_modules/"]);
        assert!(matches_forbidden_path(".git/config", &forbidden));
        assert!(matches_forbidden_path("project/node_modules/left-pad/index.js", &forbidden));
        assert!(!matches_forbidden_path("src/gitignore_parser.py", &forbidden));
    }

    #[test]
    fn forbidden_check_normalizes_separators() {
        let forbidden = list(&["node_modules/"]);
        assert!(matches_forbidden_path("web\\node_modules\\pkg\\a.js", &forbidden));
        assert!(matches_forbidden_path("./node_modules/x.js", &forbidden));
    }

    #[test]
    fn empty_forbidden_list_never_matches() {
        assert!(!matches_forbidden_path(".git/config", &[]));
        assert!(!matches_forbidden_path(".git/config", &list(&[""])));
    }

    #[test]
    fn pattern_set_keeps_raw_patterns() {
        let set = PatternSet::new(&list(&["*.py", "  ", "*.toml"]));
        assert_eq!(set.raw_patterns(), &["*.py".to_string(), "*.toml".to_string()]);
        assert!(!set.is_unrestricted());
    }
}
