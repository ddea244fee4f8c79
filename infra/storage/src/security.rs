use crate::error::StorageError;
use std::path::{Component, Path, PathBuf};

fn traversal(path: &Path, reason: &'static str) -> StorageError {
    StorageError::PathTraversalAttempt {
        message: path.display().to_string().into(),
        context: Some(reason.into()),
    }
}

/// Collapses `.` / `..` lexically; `..` may never climb above the (empty) relative base.
fn normalize_relative(path: &Path) -> Result<PathBuf, StorageError> {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::Normal(segment) => out.push(segment),
            Component::ParentDir => {
                if !out.pop() {
                    return Err(traversal(path, "Path attempted to escape sandbox via '..'"));
                }
            },
            Component::RootDir | Component::Prefix(_) => {
                return Err(traversal(path, "Absolute paths are not allowed in sandbox"));
            },
        }
    }

    if out.as_os_str().is_empty() {
        return Err(traversal(path, "Path does not name a file inside the sandbox"));
    }

    Ok(out)
}

/// Joins `path` onto `root` and guarantees the result stays inside `root`.
pub(crate) fn resolve_path(root: &Path, path: impl AsRef<Path>) -> Result<PathBuf, StorageError> {
    let safe_rel = normalize_relative(path.as_ref())?;
    let joined = root.join(safe_rel);

    match joined.canonicalize() {
        Ok(canonical) if canonical.starts_with(root) => Ok(canonical),
        Ok(canonical) => Err(traversal(&canonical, "Resolved path is outside sandbox boundaries")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => validate_ancestors(root, &joined),
        Err(e) => Err(StorageError::Io { source: e, context: Some("Failed to resolve path".into()) }),
    }
}

/// Validates a not-yet-existing path through its closest existing ancestor.
///
/// The ancestor is canonicalized so a symlinked directory pointing outside the root is caught
/// even though the target file itself does not exist yet.
fn validate_ancestors(root: &Path, joined: &Path) -> Result<PathBuf, StorageError> {
    let mut current = joined.parent();

    while let Some(path) = current {
        if path == root {
            return Ok(joined.to_path_buf());
        }

        if path.exists() {
            return match path.canonicalize() {
                Ok(canonical) if canonical.starts_with(root) => Ok(joined.to_path_buf()),
                Ok(canonical) => {
                    Err(traversal(&canonical, "Existing parent directory is a symlink outside sandbox"))
                },
                Err(e) => Err(StorageError::Io {
                    source: e,
                    context: Some("Failed to verify parent directory".into()),
                }),
            };
        }

        current = path.parent();
    }

    Err(traversal(joined, "No valid parent directory found within sandbox"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexical_normalization() {
        assert_eq!(normalize_relative(Path::new("a/./b/../c.zip")).unwrap(), PathBuf::from("a/c.zip"));
        assert!(normalize_relative(Path::new("../c.zip")).is_err());
        assert!(normalize_relative(Path::new("/etc/passwd")).is_err());
        assert!(normalize_relative(Path::new("a/..")).is_err());
    }
}
