//! Workflow engine for embedgen
//!
//! Turns a hardware requirement into a generated project in five stages:
//! plan, prepare workspace, generate code (optionally alongside a diagram
//! branch), assemble artifacts and persist. See [`WorkflowEngine`].

pub mod artifact;
pub mod extraction;
pub mod manifest;
pub mod stages;
pub mod state;
pub mod workflow;

pub use artifact::{Artifact, ArtifactRole};
pub use extraction::{Extraction, ExtractionStrategy, extract, extract_code};
pub use manifest::{MANIFEST_FILE, Manifest, ManifestEntry, ManifestMismatch, sha256_hex};
pub use stages::{Stage, StageContext, repair_workspace};
pub use state::{LogEntry, StateUpdate, Target, WorkflowState, WorkspaceInfo};
pub use workflow::{CompiledWorkflow, WorkflowEngine, WorkflowGraph};
