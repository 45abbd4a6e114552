use std::path::{Component, Path, PathBuf};

use mortar_dsl::diagnostics::Location;

use crate::errors::{IntpError, IntpResult};

/// Resolves `.` and `..` lexically, without touching the filesystem. Build
/// definitions may reference files that do not exist yet.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Which subproject a source-tree path belongs to: `None` for the top-level
/// project, `Some(name)` for `subprojects/name/...`.
fn owner_subproject<'a>(relative: &'a Path, subproject_dir: &str) -> Option<&'a str> {
    let mut components = relative.components();
    match components.next() {
        Some(Component::Normal(first)) if first.to_str() == Some(subproject_dir) => components
            .next()
            .and_then(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            }),
        _ => None,
    }
}

/// Validates that a file reference does not cross a subproject boundary.
///
/// Absolute paths outside the source tree are allowed (vendored material).
/// Paths resolving inside the tree must belong to the subproject that is
/// referencing them; anything else is a sandbox violation.
pub fn check_source_ref(
    source_root: &Path,
    subproject_dir: &str,
    current_subproject: &str,
    candidate: &Path,
    location: &Location,
) -> IntpResult<()> {
    let absolute = if candidate.is_absolute() {
        normalize(candidate)
    } else {
        normalize(&source_root.join(candidate))
    };

    let Ok(relative) = absolute.strip_prefix(source_root) else {
        return Ok(());
    };

    let owner = owner_subproject(relative, subproject_dir).unwrap_or("");
    if owner == current_subproject {
        return Ok(());
    }

    let detail = if current_subproject.is_empty() {
        format!(
            "sandbox violation: cannot reference \"{}\" which belongs to subproject \"{owner}\"",
            relative.display()
        )
    } else {
        format!(
            "sandbox violation: subproject \"{current_subproject}\" cannot reference \"{}\"",
            relative.display()
        )
    };
    Err(IntpError::invalid_code(detail).at(location))
}
