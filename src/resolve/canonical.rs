//! Path canonicalization for policy checks
//!
//! A candidate path is reduced to the form the OS would actually touch before
//! any pattern comparison, so `..` segments and symlinks cannot be used to
//! step outside an allowed directory. The leaf does not have to exist: for a
//! write-then-create the deepest existing ancestor is resolved and the
//! missing components are re-attached.

use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Dangling symlink chains longer than this are not followed further
const MAX_LINK_HOPS: usize = 16;

/// Canonicalize a candidate path for matching
pub fn canonicalize_candidate(path: &Path) -> PathBuf {
    resolve(absolutize(path), 0)
}

fn resolve(absolute: PathBuf, hops: usize) -> PathBuf {
    // Fully existing path: let the OS resolve `..` and every link, leaf included
    if let Ok(canonical) = fs::canonicalize(&absolute) {
        return canonical;
    }

    // Dangling leaf symlink: a create through it lands on the target
    if hops < MAX_LINK_HOPS {
        if let Ok(target) = fs::read_link(&absolute) {
            let base = absolute.parent().unwrap_or_else(|| Path::new("/"));
            let next = if target.is_absolute() {
                target
            } else {
                base.join(target)
            };
            return resolve(next, hops + 1);
        }
    }

    resolve_existing_prefix(&normalize_lexically(&absolute))
}

/// Resolve the deepest existing ancestor and re-attach the missing tail
///
/// `path` must already be free of `.` and `..` components.
fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<OsString> = Vec::new();

    loop {
        if let Ok(canonical) = fs::canonicalize(&existing) {
            return tail.iter().rev().fold(canonical, |acc, part| acc.join(part));
        }
        match (existing.file_name().map(|n| n.to_os_string()), existing.parent()) {
            (Some(name), Some(parent)) => {
                tail.push(name);
                existing = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Make a path absolute against the current directory
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| Path::new("/").join(path))
    }
}

/// Collapse `.` and `..` without touching the filesystem
///
/// `..` never climbs above the root of an absolute path.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}
