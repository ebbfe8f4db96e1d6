//! `manifest.lock.json`: the per-run index of persisted artifacts.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use embedgen_utils::PathGuard;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::artifact::{Artifact, ArtifactRole};
use crate::state::Target;

pub const MANIFEST_FILE: &str = "manifest.lock.json";

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub role: ArtifactRole,
    pub bytes: u64,
    pub sha256: String,
}

impl ManifestEntry {
    #[must_use]
    pub fn for_artifact(artifact: &Artifact) -> Self {
        Self {
            path: artifact.path().to_string(),
            role: artifact.role(),
            bytes: artifact.bytes(),
            sha256: sha256_hex(artifact.content().as_bytes()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub project_name: String,
    pub target: Target,
    pub active_skills: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub artifacts: Vec<ManifestEntry>,
}

/// A manifest entry that no longer matches the file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestMismatch {
    Missing { path: String },
    Unreadable { path: String, reason: String },
    Modified { path: String, expected: String, actual: String },
}

impl ManifestMismatch {
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Missing { path } | Self::Unreadable { path, .. } | Self::Modified { path, .. } => {
                path
            }
        }
    }
}

impl fmt::Display for ManifestMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { path } => write!(f, "{path}: missing"),
            Self::Unreadable { path, reason } => write!(f, "{path}: unreadable ({reason})"),
            Self::Modified {
                path,
                expected,
                actual,
            } => write!(f, "{path}: sha256 {actual}, expected {expected}"),
        }
    }
}

impl Manifest {
    /// Pretty-printed JSON, as written to disk.
    ///
    /// # Errors
    ///
    /// Propagates `serde_json` serialization errors.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Read `manifest.lock.json` from an output root.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not a valid manifest.
    pub fn load(output_root: &Path) -> Result<Self> {
        let path = manifest_path(output_root);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    /// Re-hash every listed artifact under `output_root`.
    ///
    /// An empty result means the tree matches the manifest. Paths are
    /// re-validated so a tampered manifest cannot read outside the root.
    #[must_use]
    pub fn verify(&self, output_root: &Path) -> Vec<ManifestMismatch> {
        let guard = match PathGuard::new(output_root) {
            Ok(guard) => guard,
            Err(e) => {
                return self
                    .artifacts
                    .iter()
                    .map(|entry| ManifestMismatch::Unreadable {
                        path: entry.path.clone(),
                        reason: e.to_string(),
                    })
                    .collect();
            }
        };

        let mut mismatches = Vec::new();
        for entry in &self.artifacts {
            let file = match guard.join(&entry.path) {
                Ok(file) => file,
                Err(e) => {
                    mismatches.push(ManifestMismatch::Unreadable {
                        path: entry.path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            match std::fs::read(file.as_path()) {
                Ok(bytes) => {
                    let actual = sha256_hex(&bytes);
                    if actual != entry.sha256 {
                        mismatches.push(ManifestMismatch::Modified {
                            path: entry.path.clone(),
                            expected: entry.sha256.clone(),
                            actual,
                        });
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    mismatches.push(ManifestMismatch::Missing {
                        path: entry.path.clone(),
                    });
                }
                Err(e) => mismatches.push(ManifestMismatch::Unreadable {
                    path: entry.path.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        mismatches
    }
}

#[must_use]
pub fn manifest_path(output_root: &Path) -> PathBuf {
    output_root.join(MANIFEST_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manifest_for(artifacts: &[Artifact]) -> Manifest {
        Manifest {
            project_name: "blink".to_string(),
            target: Target::EspIdf,
            active_skills: vec!["esp-idf".to_string()],
            timestamp: Utc::now(),
            artifacts: artifacts.iter().map(ManifestEntry::for_artifact).collect(),
        }
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_entry_records_bytes_and_role() {
        let artifact = Artifact::new("main/main.c", "héllo", ArtifactRole::Code).unwrap();
        let entry = ManifestEntry::for_artifact(&artifact);
        assert_eq!(entry.bytes, 6);
        assert_eq!(entry.role, ArtifactRole::Code);
        assert_eq!(entry.sha256, sha256_hex("héllo".as_bytes()));
    }

    #[test]
    fn test_json_uses_wire_names() {
        let artifact = Artifact::new("CMakeLists.txt", "x", ArtifactRole::Meta).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&manifest_for(&[artifact]).to_json().unwrap()).unwrap();
        assert_eq!(value["target"], "esp-idf");
        assert_eq!(value["artifacts"][0]["role"], "meta");
        assert_eq!(value["artifacts"][0]["bytes"], 1);
    }

    #[test]
    fn test_verify_detects_missing_and_modified() {
        let temp = TempDir::new().unwrap();
        let kept = Artifact::new("a.txt", "same", ArtifactRole::Meta).unwrap();
        let changed = Artifact::new("b.txt", "before", ArtifactRole::Meta).unwrap();
        let gone = Artifact::new("sub/c.txt", "x", ArtifactRole::Meta).unwrap();
        std::fs::write(temp.path().join("a.txt"), "same").unwrap();
        std::fs::write(temp.path().join("b.txt"), "after").unwrap();

        let manifest = manifest_for(&[kept, changed, gone]);
        let mismatches = manifest.verify(temp.path());

        assert_eq!(mismatches.len(), 2);
        assert!(matches!(&mismatches[0], ManifestMismatch::Modified { path, .. } if path == "b.txt"));
        assert!(matches!(&mismatches[1], ManifestMismatch::Missing { path } if path == "sub/c.txt"));
    }

    #[test]
    fn test_load_round_trips_written_manifest() {
        let temp = TempDir::new().unwrap();
        let manifest = manifest_for(&[]);
        std::fs::write(manifest_path(temp.path()), manifest.to_json().unwrap()).unwrap();

        assert_eq!(Manifest::load(temp.path()).unwrap(), manifest);
    }
}
