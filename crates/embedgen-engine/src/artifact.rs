//! Files a run intends to write, before they touch disk.

use std::fmt;

use embedgen_utils::paths::{PathError, validate_relative};
use serde::{Deserialize, Serialize};

/// What an artifact is for. Serialized lowercase in manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactRole {
    Code,
    Meta,
    Diagram,
}

impl ArtifactRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Meta => "meta",
            Self::Diagram => "diagram",
        }
    }
}

impl fmt::Display for ArtifactRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relative path, its exact content and its role.
///
/// The path is validated on construction (and on deserialization): it is
/// never absolute, blank, or carrying a `..` segment. Escapes through
/// symlinks are caught later by `PathGuard` when the artifact is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ArtifactRecord")]
pub struct Artifact {
    path: String,
    content: String,
    role: ArtifactRole,
}

#[derive(Deserialize)]
struct ArtifactRecord {
    path: String,
    content: String,
    role: ArtifactRole,
}

impl TryFrom<ArtifactRecord> for Artifact {
    type Error = PathError;

    fn try_from(record: ArtifactRecord) -> Result<Self, Self::Error> {
        Self::new(record.path, record.content, record.role)
    }
}

impl Artifact {
    /// # Errors
    ///
    /// Returns `PathError` when `path` is absolute, blank, or contains `..`.
    pub fn new(
        path: impl Into<String>,
        content: impl Into<String>,
        role: ArtifactRole,
    ) -> Result<Self, PathError> {
        let path = path.into();
        validate_relative(&path)?;
        Ok(Self {
            path,
            content: content.into(),
            role,
        })
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn role(&self) -> ArtifactRole {
        self.role
    }

    /// Size of the UTF-8 payload.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.content.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_nested_relative_path() {
        let artifact = Artifact::new("main/main.c", "int x;", ArtifactRole::Code).unwrap();
        assert_eq!(artifact.path(), "main/main.c");
        assert_eq!(artifact.bytes(), 6);
        assert_eq!(artifact.role(), ArtifactRole::Code);
    }

    #[test]
    fn test_new_rejects_unsafe_paths() {
        assert!(matches!(
            Artifact::new("", "x", ArtifactRole::Meta),
            Err(PathError::Empty)
        ));
        assert!(matches!(
            Artifact::new("   ", "x", ArtifactRole::Meta),
            Err(PathError::Empty)
        ));
        assert!(matches!(
            Artifact::new("/etc/passwd", "x", ArtifactRole::Meta),
            Err(PathError::AbsolutePath { .. })
        ));
        assert!(matches!(
            Artifact::new("main/../../escape.c", "x", ArtifactRole::Code),
            Err(PathError::ParentTraversal { .. })
        ));
        assert!(matches!(
            Artifact::new("./", "x", ArtifactRole::Code),
            Err(PathError::NoFileName { .. })
        ));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ArtifactRole::Diagram).unwrap(),
            "\"diagram\""
        );
    }

    #[test]
    fn test_deserialization_revalidates_path() {
        let ok: Artifact =
            serde_json::from_str(r#"{"path":"CMakeLists.txt","content":"x","role":"meta"}"#)
                .unwrap();
        assert_eq!(ok.role(), ArtifactRole::Meta);

        let bad = serde_json::from_str::<Artifact>(
            r#"{"path":"../x","content":"x","role":"meta"}"#,
        );
        assert!(bad.is_err());
    }
}
