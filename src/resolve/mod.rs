//! Path & pattern resolution
//!
//! Turns the strings found in a permission declaration and in a capability
//! call into comparable values:
//! - `vars` - `$HOME`, `$APP_DATA`, ... expansion
//! - `canonical` - traversal and symlink resistant canonicalization
//! - `pattern` - `*` / `**` path pattern matching
//! - `domain` - exact and `*.` subdomain host matching

pub mod canonical;
pub mod domain;
pub mod pattern;
pub mod vars;

use std::path::{Path, PathBuf};

pub use canonical::{absolutize, canonicalize_candidate, normalize_lexically};
pub use domain::match_domain;
pub use pattern::{canonicalize_pattern, match_pattern};
pub use vars::{to_slash, PathVars, VarSource};

/// A candidate path after variable expansion and canonicalization
///
/// Built once per check and compared against every pattern of a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    path: PathBuf,
    slash: String,
}

impl ResolvedPath {
    pub fn new(raw: &str, vars: &PathVars) -> Self {
        let expanded = vars.expand(raw);
        let path = canonicalize_candidate(Path::new(expanded.as_ref()));
        let slash = to_slash(&path);
        Self { path, slash }
    }

    /// The path handlers must operate on
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }

    /// Whether this path is covered by a (variable-bearing) scope pattern
    pub fn matches(&self, pattern: &str, vars: &PathVars) -> bool {
        let expanded = vars.expand(pattern);
        match_pattern(&canonicalize_pattern(&expanded), &self.slash)
    }

    /// Whether this path equals or is nested under `dir`
    pub fn is_within(&self, dir: &Path) -> bool {
        self.path.starts_with(dir)
    }
}

/// Whether `path` is covered by `pattern`, resolving both against `vars`
pub fn path_matches(pattern: &str, path: &str, vars: &PathVars) -> bool {
    ResolvedPath::new(path, vars).matches(pattern, vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn vars_for(root: &Path) -> PathVars {
        PathVars {
            home: Some(root.join("home")),
            app_data: Some(root.join("home/.local/share/app")),
            temp: Some(root.join("tmp")),
            ..Default::default()
        }
    }

    #[test]
    fn test_variable_pattern_matches_variable_path() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("home/Documents")).unwrap();
        let vars = vars_for(&root);

        assert!(path_matches(
            "$HOME/Documents/**",
            "$HOME/Documents/notes.txt",
            &vars
        ));
        assert!(!path_matches("$HOME/Documents/**", "/etc/passwd", &vars));
    }

    #[test]
    fn test_traversal_out_of_app_data_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let vars = vars_for(&root);

        // app data directory does not exist yet: lexical collapse still applies
        assert!(!path_matches(
            "$APP_DATA/**",
            "$APP_DATA/../../etc/passwd",
            &vars
        ));

        fs::create_dir_all(root.join("home/.local/share/app")).unwrap();
        assert!(!path_matches(
            "$APP_DATA/**",
            "$APP_DATA/../../etc/passwd",
            &vars
        ));
        assert!(path_matches("$APP_DATA/**", "$APP_DATA/sub/../db.sqlite", &vars));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_out_of_scope_is_denied() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret"), "s").unwrap();
        fs::create_dir_all(root.join("home/Documents")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret"),
            root.join("home/Documents/innocent.txt"),
        )
        .unwrap();
        let vars = vars_for(&root);

        assert!(!path_matches(
            "$HOME/Documents/**",
            "$HOME/Documents/innocent.txt",
            &vars
        ));
    }

    #[test]
    fn test_is_within() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let vars = PathVars::default();

        let inside = ResolvedPath::new(&to_slash(&root.join("a/b.txt")), &vars);
        assert!(inside.is_within(&root));
        assert!(!inside.is_within(&root.join("a/b")));
    }
}
