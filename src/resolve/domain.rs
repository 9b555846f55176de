//! Hostname matching for network scopes

/// Match a hostname against a scope entry
///
/// - `*` matches every host
/// - `*.example.com` matches any host ending in `.example.com`, at any depth,
///   but not `example.com` itself
/// - anything else must be equal
///
/// Comparison is ASCII case-insensitive and ignores a trailing root dot.
pub fn match_domain(host: &str, pattern: &str) -> bool {
    // a bare `*.` must not collapse into `*`
    if pattern.trim().ends_with("*.") {
        return false;
    }

    let host = normalize(host);
    let pattern = normalize(pattern);

    if host.is_empty() {
        return false;
    }
    if pattern == "*" {
        return true;
    }

    match pattern.strip_prefix("*.") {
        Some(parent) if !parent.is_empty() => host
            .strip_suffix(parent)
            .is_some_and(|label| label.len() > 1 && label.ends_with('.')),
        _ => host == pattern,
    }
}

fn normalize(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}
