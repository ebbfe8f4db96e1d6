use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use embedgen_utils::paths::PathGuard;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::front_matter::parse_skill_document;
use crate::{DEFAULT_DESCRIPTION, SKILL_FILE};

/// One scanned skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillEntry {
    pub name: String,
    pub description: String,
    pub path: PathBuf,
}

/// Cached view of a skills directory.
///
/// Descriptions and bodies are cached behind `RwLock`s, so concurrent
/// readers never see a half-built index. Call [`SkillCatalog::invalidate`]
/// after editing skill files.
#[derive(Debug)]
pub struct SkillCatalog {
    root: PathBuf,
    index: RwLock<Option<BTreeMap<String, SkillEntry>>>,
    bodies: RwLock<HashMap<String, String>>,
}

impl SkillCatalog {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index: RwLock::new(None),
            bodies: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Drop all cached descriptions and bodies.
    pub fn invalidate(&self) {
        if let Ok(mut index) = self.index.write() {
            *index = None;
        }
        if let Ok(mut bodies) = self.bodies.write() {
            bodies.clear();
        }
    }

    /// `name -> description` for every parsable skill, sorted by name.
    ///
    /// Never fails: a missing root yields an empty map, unparsable files are
    /// logged and skipped.
    #[must_use]
    pub fn scan_skills(&self) -> BTreeMap<String, String> {
        self.entries()
            .into_iter()
            .map(|(name, entry)| (name, entry.description))
            .collect()
    }

    /// Catalog rendered for the planner prompt: one `- name: description`
    /// line per skill.
    #[must_use]
    pub fn describe(&self) -> String {
        self.scan_skills()
            .iter()
            .map(|(name, desc)| format!("- {name}: {desc}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether a skill of this name was found by the scan.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries().contains_key(name)
    }

    /// Body of one skill, without front matter.
    #[must_use]
    pub fn load_skill(&self, name: &str) -> Option<String> {
        if let Ok(bodies) = self.bodies.read()
            && let Some(body) = bodies.get(name)
        {
            return Some(body.clone());
        }

        let path = self.skill_path(name)?;
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!(skill = name, path = %path.display(), error = %e, "Skill file unreadable");
                return None;
            }
        };

        let body = match parse_skill_document(&content) {
            Ok(doc) => doc.body,
            Err(e) => {
                warn!(skill = name, path = %path.display(), error = %e, "Failed to parse skill");
                return None;
            }
        };

        if let Ok(mut bodies) = self.bodies.write() {
            bodies.insert(name.to_string(), body.clone());
        }
        Some(body)
    }

    /// Combined bodies of the named skills, each under a
    /// `=== SKILL: <name> ===` header, separated by blank lines.
    ///
    /// Missing or empty skills are skipped; the result may be empty.
    #[must_use]
    pub fn load_skills(&self, names: &[String]) -> String {
        names
            .iter()
            .filter_map(|name| {
                self.load_skill(name)
                    .filter(|body| !body.is_empty())
                    .map(|body| format!("=== SKILL: {name} ===\n{body}"))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Scanned path for `name`, else `<root>/<name>/SKILL.md` when that stays
    /// inside the root.
    fn skill_path(&self, name: &str) -> Option<PathBuf> {
        if let Some(entry) = self.entries().get(name) {
            return Some(entry.path.clone());
        }

        let guard = PathGuard::new(&self.root).ok()?;
        match guard.join(Path::new(name).join(SKILL_FILE)) {
            Ok(path) => Some(path.to_path_buf()),
            Err(e) => {
                warn!(skill = name, error = %e, "Rejected skill name");
                None
            }
        }
    }

    fn entries(&self) -> BTreeMap<String, SkillEntry> {
        if let Ok(index) = self.index.read()
            && let Some(entries) = index.as_ref()
        {
            return entries.clone();
        }

        let entries = self.scan_directory();
        if let Ok(mut index) = self.index.write() {
            *index = Some(entries.clone());
        }
        entries
    }

    fn scan_directory(&self) -> BTreeMap<String, SkillEntry> {
        let mut entries = BTreeMap::new();

        if !self.root.is_dir() {
            debug!(root = %self.root.display(), "Skills directory not found");
            return entries;
        }

        for dir_entry in WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file() && e.file_name() == SKILL_FILE)
        {
            let path = dir_entry.path();
            let content = match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read skill");
                    continue;
                }
            };

            let front_matter = match parse_skill_document(&content) {
                Ok(doc) => match doc.front_matter {
                    Some(fm) => fm,
                    None => {
                        debug!(path = %path.display(), "Skill has no front matter; skipped");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse skill");
                    continue;
                }
            };

            let Some(name) = front_matter
                .name
                .filter(|n| !n.trim().is_empty())
                .or_else(|| {
                    path.parent()
                        .and_then(Path::file_name)
                        .map(|n| n.to_string_lossy().into_owned())
                })
            else {
                continue;
            };

            if entries.contains_key(&name) {
                warn!(skill = %name, path = %path.display(), "Duplicate skill name; keeping first");
                continue;
            }

            let description = front_matter
                .description
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

            entries.insert(
                name.clone(),
                SkillEntry {
                    name,
                    description,
                    path: path.to_path_buf(),
                },
            );
        }

        debug!(root = %self.root.display(), count = entries.len(), "Scanned skills");
        entries
    }
}
