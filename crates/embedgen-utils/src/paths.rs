use std::path::{Component, Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Path Guard Error Types
// ============================================================================

/// Errors raised when a candidate artifact path is not safe to write.
///
/// Every variant is a hard failure: candidate paths are never silently
/// corrected or normalized into something else.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The candidate path is empty or whitespace only
    #[error("Artifact path is empty")]
    Empty,

    /// The candidate path is absolute
    #[error("Absolute path not allowed: {path}")]
    AbsolutePath { path: String },

    /// The candidate path contains a ".." segment
    #[error("Path contains parent directory traversal: {path}")]
    ParentTraversal { path: String },

    /// The candidate names no entry below the root, e.g. `.` or `./`
    #[error("Path does not name a file inside the output root: {path}")]
    NoFileName { path: String },

    /// The candidate resolves outside the output root
    #[error("Path escapes output root: {path} resolves outside {root}")]
    EscapeAttempt { path: String, root: String },

    /// The output root does not exist
    #[error("Output root does not exist: {path}")]
    RootNotFound { path: String },

    /// The output root is not a directory
    #[error("Output root is not a directory: {path}")]
    RootNotDirectory { path: String },

    /// Failed to canonicalize the output root
    #[error("Failed to canonicalize output root '{path}': {reason}")]
    RootCanonicalizationFailed { path: String, reason: String },

    /// Failed to canonicalize the candidate or one of its ancestors
    #[error("Failed to canonicalize path '{path}': {reason}")]
    PathCanonicalizationFailed { path: String, reason: String },
}

/// Lexical checks shared by [`PathGuard::join`] and artifact construction.
///
/// Rejects empty, absolute and `..`-bearing paths, and paths such as `.`
/// that name the root itself, without touching the filesystem.
pub fn validate_relative(rel: impl AsRef<Path>) -> Result<(), PathError> {
    let rel_path = rel.as_ref();
    let display = rel_path.display().to_string();

    if display.trim().is_empty() {
        return Err(PathError::Empty);
    }

    // `Path::is_absolute` is platform dependent; a leading separator or a
    // drive prefix counts as absolute everywhere.
    if rel_path.is_absolute()
        || rel_path
            .components()
            .any(|c| matches!(c, Component::RootDir | Component::Prefix(_)))
    {
        return Err(PathError::AbsolutePath { path: display });
    }

    if rel_path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(PathError::ParentTraversal { path: display });
    }

    if !rel_path
        .components()
        .any(|c| matches!(c, Component::Normal(_)))
    {
        return Err(PathError::NoFileName { path: display });
    }

    Ok(())
}

// ============================================================================
// PathGuard - Validated output root for artifact writes
// ============================================================================

/// A validated output root that every artifact write goes through.
///
/// The root is canonicalized at construction. Joined paths are checked
/// lexically first, then against the filesystem: an existing target must
/// canonicalize inside the root, and for a target that does not exist yet
/// the nearest existing ancestor must. Symlinked directories that point
/// outside the root are therefore rejected before anything is written.
///
/// # Example
///
/// ```rust,no_run
/// use embedgen_utils::paths::PathGuard;
///
/// let guard = PathGuard::new("/tmp/run/output")?;
/// let file = guard.join("main/main.c")?;
/// println!("Safe path: {}", file.as_path().display());
/// # Ok::<(), embedgen_utils::paths::PathError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Create a guard for an existing output directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the root is missing, is not a directory, or
    /// cannot be canonicalized.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, PathError> {
        let root_path = root.as_ref();

        if !root_path.exists() {
            return Err(PathError::RootNotFound {
                path: root_path.display().to_string(),
            });
        }

        if !root_path.is_dir() {
            return Err(PathError::RootNotDirectory {
                path: root_path.display().to_string(),
            });
        }

        let canonical =
            root_path
                .canonicalize()
                .map_err(|e| PathError::RootCanonicalizationFailed {
                    path: root_path.display().to_string(),
                    reason: e.to_string(),
                })?;

        Ok(Self { root: canonical })
    }

    /// Join a relative path, validating it stays within the output root.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is empty, absolute, contains `..`, or
    /// resolves outside the root.
    pub fn join(&self, rel: impl AsRef<Path>) -> Result<GuardedPath, PathError> {
        let rel_path = rel.as_ref();
        validate_relative(rel_path)?;

        let full_path = self.root.join(rel_path);

        if full_path.exists() {
            let canonical =
                full_path
                    .canonicalize()
                    .map_err(|e| PathError::PathCanonicalizationFailed {
                        path: full_path.display().to_string(),
                        reason: e.to_string(),
                    })?;

            if !canonical.starts_with(&self.root) {
                return Err(PathError::EscapeAttempt {
                    path: rel_path.display().to_string(),
                    root: self.root.display().to_string(),
                });
            }

            Ok(GuardedPath {
                full: canonical,
                rel: rel_path.to_path_buf(),
            })
        } else {
            self.validate_ancestor_within_root(&full_path, rel_path)?;

            Ok(GuardedPath {
                full: full_path,
                rel: rel_path.to_path_buf(),
            })
        }
    }

    /// The nearest existing ancestor of a not-yet-existing path must
    /// canonicalize inside the root.
    fn validate_ancestor_within_root(
        &self,
        full_path: &Path,
        rel_path: &Path,
    ) -> Result<(), PathError> {
        let mut ancestor = full_path.to_path_buf();
        while !ancestor.exists() {
            if !ancestor.pop() {
                return Ok(());
            }
        }

        let canonical_ancestor =
            ancestor
                .canonicalize()
                .map_err(|e| PathError::PathCanonicalizationFailed {
                    path: ancestor.display().to_string(),
                    reason: e.to_string(),
                })?;

        if !canonical_ancestor.starts_with(&self.root) {
            return Err(PathError::EscapeAttempt {
                path: rel_path.display().to_string(),
                root: self.root.display().to_string(),
            });
        }

        Ok(())
    }

    /// Canonicalized root path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.root
    }
}

/// A path that has passed [`PathGuard::join`].
#[derive(Debug, Clone)]
pub struct GuardedPath {
    full: PathBuf,
    rel: PathBuf,
}

impl GuardedPath {
    /// Full path for I/O.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.full
    }

    /// Path relative to the output root, as recorded in the manifest.
    #[must_use]
    pub fn relative(&self) -> &Path {
        &self.rel
    }

    #[must_use]
    pub fn to_path_buf(&self) -> PathBuf {
        self.full.clone()
    }
}

impl AsRef<Path> for GuardedPath {
    fn as_ref(&self) -> &Path {
        &self.full
    }
}

/// mkdir -p; treat `AlreadyExists` as success (removes TOCTTOU races)
pub fn ensure_dir_all<P: AsRef<Path>>(p: P) -> std::io::Result<()> {
    match std::fs::create_dir_all(&p) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_rejects_missing_root() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        assert!(matches!(
            PathGuard::new(&missing),
            Err(PathError::RootNotFound { .. })
        ));
    }

    #[test]
    fn test_new_rejects_file_root() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file.txt");
        std::fs::write(&file, "x").unwrap();
        assert!(matches!(
            PathGuard::new(&file),
            Err(PathError::RootNotDirectory { .. })
        ));
    }

    #[test]
    fn test_join_accepts_nested_relative_path() {
        let temp = TempDir::new().unwrap();
        let guard = PathGuard::new(temp.path()).unwrap();

        let joined = guard.join("main/main.c").unwrap();
        assert_eq!(joined.relative(), Path::new("main/main.c"));
        assert!(joined.as_path().starts_with(guard.as_path()));
    }

    #[test]
    fn test_join_rejects_parent_traversal() {
        let temp = TempDir::new().unwrap();
        let guard = PathGuard::new(temp.path()).unwrap();

        for candidate in ["../escape.c", "main/../../x", "a/b/.."] {
            assert!(
                matches!(
                    guard.join(candidate),
                    Err(PathError::ParentTraversal { .. })
                ),
                "{candidate} should be rejected"
            );
        }
    }

    #[test]
    fn test_join_rejects_absolute_and_empty() {
        let temp = TempDir::new().unwrap();
        let guard = PathGuard::new(temp.path()).unwrap();

        assert!(matches!(
            guard.join("/etc/passwd"),
            Err(PathError::AbsolutePath { .. })
        ));
        assert_eq!(guard.join("").unwrap_err(), PathError::Empty);
        assert_eq!(guard.join("   ").unwrap_err(), PathError::Empty);
    }

    #[cfg(unix)]
    #[test]
    fn test_join_rejects_symlinked_directory_outside_root() {
        let root = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("wiring")).unwrap();

        let guard = PathGuard::new(root.path()).unwrap();
        assert!(matches!(
            guard.join("wiring/wokwi.json"),
            Err(PathError::EscapeAttempt { .. })
        ));
    }

    #[test]
    fn test_join_rejects_paths_naming_the_root() {
        let temp = TempDir::new().unwrap();
        let guard = PathGuard::new(temp.path()).unwrap();

        for candidate in [".", "./", "./.", "././"] {
            assert!(
                matches!(guard.join(candidate), Err(PathError::NoFileName { .. })),
                "{candidate} should be rejected"
            );
        }
        assert!(validate_relative("./main/main.c").is_ok());
    }

    #[test]
    fn test_ensure_dir_all_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("output/main");
        ensure_dir_all(&dir).unwrap();
        ensure_dir_all(&dir).unwrap();
        assert!(dir.is_dir());
    }

    proptest! {
        #[test]
        fn prop_parent_segment_always_rejected(
            prefix in "[a-z]{1,8}(/[a-z]{1,8}){0,2}",
            suffix in "[a-z]{1,8}",
        ) {
            let candidate = format!("{prefix}/../{suffix}");
            let result = validate_relative(&candidate);
            prop_assert!(
                matches!(result, Err(PathError::ParentTraversal { .. })),
                "{} accepted: {:?}",
                candidate,
                result
            );
        }

        #[test]
        fn prop_absolute_always_rejected(rest in "[a-z]{1,8}(/[a-z]{1,8}){0,3}") {
            let candidate = format!("/{rest}");
            let result = validate_relative(&candidate);
            prop_assert!(
                matches!(result, Err(PathError::AbsolutePath { .. })),
                "{} accepted: {:?}",
                candidate,
                result
            );
        }
    }
}
