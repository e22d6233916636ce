//! Lexical path helpers shared by the skip log and the quarantine.

use std::path::{Component, Path, PathBuf};

/// Collapse `.` and `..` components without touching the filesystem.
///
/// A `..` that would climb above the start of a relative path is kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().map(|c| c.as_os_str()).collect()
}

/// Normalized string form, used as a stable key in persisted records
pub fn key(path: &Path) -> String {
    normalize(path).to_string_lossy().into_owned()
}

/// Re-root `path` from whichever of `bases` contains it onto `new_base`.
///
/// Returns `None` when no base contains the path.
pub fn rebase(bases: &[PathBuf], new_base: &Path, path: &Path) -> Option<PathBuf> {
    let path = normalize(path);
    bases.iter().find_map(|base| {
        path.strip_prefix(normalize(base))
            .ok()
            .map(|relative| new_base.join(relative))
    })
}
