//! Skill catalog: named instruction bundles stored as `SKILL.md` files.
//!
//! Each skill lives in its own directory with a `SKILL.md` made of YAML front
//! matter (`name`, `description`) followed by a markdown body. The body is
//! what gets injected into the coder prompt.

mod catalog;
mod front_matter;

pub use catalog::{SkillCatalog, SkillEntry};
pub use front_matter::{FrontMatter, SkillDocument, parse_skill_document};

/// File name every skill directory must contain.
pub const SKILL_FILE: &str = "SKILL.md";

/// Description used when the front matter has none.
pub const DEFAULT_DESCRIPTION: &str = "No description";
