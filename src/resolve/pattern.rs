//! Filesystem scope pattern matching
//!
//! All path-pattern semantics live in [`match_pattern`]; everything else in
//! the crate goes through it.
//!
//! - Without `**`, the pattern is a glob where `*` and `?` never cross `/`.
//! - With `**`, the pattern is split at the first `**` into a literal
//!   `prefix` and a `suffix`. The path must start with `prefix`. An empty
//!   suffix matches anything under the prefix. Otherwise the suffix (leading
//!   `/` dropped) must match a trailing run of whole path segments: globbed
//!   when it has wildcards, compared literally when it does not.

use std::path::Path;

use glob::{MatchOptions, Pattern};

use super::canonical::canonicalize_candidate;
use super::vars::to_slash;

const WILDCARDS: &[char] = &['*', '?', '['];

fn segment_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

/// Match a canonical, `/`-separated path against an expanded pattern
pub fn match_pattern(pattern: &str, path: &str) -> bool {
    let Some((prefix, suffix)) = pattern.split_once("**") else {
        return glob_match(pattern, path);
    };

    // `dir/**` covers what is under `dir`, never `dir` itself
    let Some(rest) = path.strip_prefix(prefix) else {
        return false;
    };

    let suffix = suffix.trim_start_matches('/');
    if suffix.is_empty() {
        return true;
    }
    if rest.is_empty() {
        return false;
    }

    let literal = !suffix.contains(WILDCARDS);
    trailing_segments(rest).any(|tail| {
        if literal {
            tail == suffix
        } else {
            glob_match(suffix, tail)
        }
    })
}

/// `a/b/c` yields `a/b/c`, `b/c`, `c`
fn trailing_segments(path: &str) -> impl Iterator<Item = &str> {
    let path = path.trim_start_matches('/');
    std::iter::once(path).chain(
        path.char_indices()
            .filter(|(_, c)| *c == '/')
            .map(move |(i, _)| &path[i + 1..])
            .filter(|tail| !tail.is_empty()),
    )
}

fn glob_match(pattern: &str, path: &str) -> bool {
    match Pattern::new(pattern) {
        Ok(p) => p.matches_with(path, segment_options()),
        Err(e) => {
            tracing::debug!("Ignoring invalid scope pattern '{}': {}", pattern, e);
            false
        }
    }
}

/// Canonicalize the literal directory part of an expanded pattern
///
/// Keeps patterns rooted under a symlinked directory comparable with
/// canonical candidates. The wildcard tail is left untouched. Relative
/// patterns (including ones with an unresolved variable) are returned as-is
/// and can never match an absolute candidate.
pub fn canonicalize_pattern(pattern: &str) -> String {
    if !Path::new(pattern).is_absolute() {
        return pattern.to_string();
    }

    let first_wildcard = pattern.find(WILDCARDS).unwrap_or(pattern.len());
    let literal = &pattern[..first_wildcard];

    if first_wildcard == pattern.len() {
        return to_slash(&canonicalize_candidate(Path::new(pattern)));
    }

    let Some(split) = literal.rfind('/') else {
        return pattern.to_string();
    };
    let (dir, tail) = pattern.split_at(split);
    let dir = if dir.is_empty() { "/" } else { dir };

    let canonical_dir = to_slash(&canonicalize_candidate(Path::new(dir)));
    format!("{}{}", canonical_dir.trim_end_matches('/'), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_table() {
        let cases: &[(&str, &str, bool)] = &[
            // recursive, empty suffix
            ("/data/**", "/data/a.txt", true),
            ("/data/**", "/data/a/b/c.txt", true),
            ("/data/**", "/data", false),
            ("/data/**", "/data/", true),
            ("/data/**", "/database/x", false),
            ("/data/**", "/etc/passwd", false),
            ("/data**", "/database/x", true),
            // recursive, globbed suffix
            ("/data/**/*.txt", "/data/a.txt", true),
            ("/data/**/*.txt", "/data/a/b/c.txt", true),
            ("/data/**/*.txt", "/data/a/b/c.md", false),
            ("/data/**/docs/*.md", "/data/x/docs/a.md", true),
            ("/data/**/docs/*.md", "/data/x/docs/sub/a.md", false),
            // recursive, literal suffix
            ("/data/**/config.json", "/data/config.json", true),
            ("/data/**/config.json", "/data/a/b/config.json", true),
            ("/data/**/config.json", "/data/a/myconfig.json", false),
            ("/data/**/config.json", "/data", false),
            // single segment
            ("/data/*", "/data/a.txt", true),
            ("/data/*", "/data/a/b.txt", false),
            ("/data/*.txt", "/data/a.txt", true),
            ("/data/*.txt", "/data/a.md", false),
            ("/data/?.txt", "/data/a.txt", true),
            ("/data/?.txt", "/data/ab.txt", false),
            // exact
            ("/etc/hosts", "/etc/hosts", true),
            ("/etc/hosts", "/etc/hosts.allow", false),
            // invalid glob never matches
            ("/data/[", "/data/[", false),
        ];

        for (pattern, path, expected) in cases {
            assert_eq!(
                match_pattern(pattern, path),
                *expected,
                "pattern {:?} vs path {:?}",
                pattern,
                path
            );
        }
    }

    #[test]
    fn test_dotdot_is_never_literal() {
        // Candidates reach the matcher canonical; an uncanonical one must not
        // sneak through a single-segment wildcard.
        assert!(!match_pattern("/data/*", "/data/../etc"));
    }

    #[test]
    fn test_trailing_segments() {
        let tails: Vec<&str> = trailing_segments("a/b/c").collect();
        assert_eq!(tails, vec!["a/b/c", "b/c", "c"]);
        let tails: Vec<&str> = trailing_segments("/a").collect();
        assert_eq!(tails, vec!["a"]);
    }

    #[test]
    fn test_canonicalize_pattern_keeps_wildcard_tail() {
        let dir = tempfile::tempdir().unwrap();
        let root = to_slash(&dir.path().canonicalize().unwrap());
        let raw = format!("{}/**/*.txt", to_slash(dir.path()));

        assert_eq!(canonicalize_pattern(&raw), format!("{}/**/*.txt", root));
    }

    #[test]
    fn test_canonicalize_pattern_without_wildcards() {
        let dir = tempfile::tempdir().unwrap();
        let root = to_slash(&dir.path().canonicalize().unwrap());
        let raw = format!("{}/notes.txt", to_slash(dir.path()));

        assert_eq!(canonicalize_pattern(&raw), format!("{}/notes.txt", root));
    }

    #[test]
    fn test_canonicalize_pattern_at_root() {
        assert_eq!(canonicalize_pattern("/*"), "/*");
    }

    #[test]
    fn test_relative_pattern_is_untouched() {
        assert_eq!(canonicalize_pattern("$DESKTOP/**"), "$DESKTOP/**");
        assert!(!match_pattern("$DESKTOP/**", "/home/ada/Desktop/a"));
    }
}
