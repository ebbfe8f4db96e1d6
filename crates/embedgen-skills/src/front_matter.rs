use serde::Deserialize;

/// Metadata block at the top of a `SKILL.md`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FrontMatter {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// A `SKILL.md` split into front matter and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillDocument {
    /// `None` when the file has no `---` delimited block.
    pub front_matter: Option<FrontMatter>,
    /// Markdown after the front matter, trimmed.
    pub body: String,
}

/// Split and parse a skill document.
///
/// The front matter is the text between a leading `---` line and the next
/// `---` line. A document without that block is all body.
///
/// # Errors
///
/// Returns the YAML error message when the block exists but is not a valid
/// mapping.
pub fn parse_skill_document(content: &str) -> Result<SkillDocument, String> {
    let trimmed = content.trim_start_matches('\u{feff}');
    let Some(rest) = trimmed
        .strip_prefix("---\n")
        .or_else(|| trimmed.strip_prefix("---\r\n"))
    else {
        return Ok(SkillDocument {
            front_matter: None,
            body: trimmed.trim().to_string(),
        });
    };

    let mut offset = 0;
    let mut yaml_end = None;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            yaml_end = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }

    let Some((yaml_len, body_start)) = yaml_end else {
        return Ok(SkillDocument {
            front_matter: None,
            body: trimmed.trim().to_string(),
        });
    };

    let yaml = &rest[..yaml_len];
    let front_matter = if yaml.trim().is_empty() {
        FrontMatter::default()
    } else {
        serde_yaml::from_str::<FrontMatter>(yaml).map_err(|e| e.to_string())?
    };

    Ok(SkillDocument {
        front_matter: Some(front_matter),
        body: rest[body_start..].trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_front_matter_and_body() {
        let doc = parse_skill_document(
            "---\nname: esp-idf\ndescription: ESP-IDF conventions\n---\n\n# Rules\nUse FreeRTOS tasks.\n",
        )
        .unwrap();

        let fm = doc.front_matter.unwrap();
        assert_eq!(fm.name.as_deref(), Some("esp-idf"));
        assert_eq!(fm.description.as_deref(), Some("ESP-IDF conventions"));
        assert_eq!(doc.body, "# Rules\nUse FreeRTOS tasks.");
    }

    #[test]
    fn test_body_may_contain_horizontal_rules() {
        let doc = parse_skill_document("---\nname: a\n---\nfirst\n---\nsecond").unwrap();
        assert_eq!(doc.body, "first\n---\nsecond");
    }

    #[test]
    fn test_missing_front_matter_is_all_body() {
        let doc = parse_skill_document("just text").unwrap();
        assert!(doc.front_matter.is_none());
        assert_eq!(doc.body, "just text");
    }

    #[test]
    fn test_unknown_keys_are_tolerated() {
        let doc = parse_skill_document("---\nname: a\nversion: 2\n---\nbody").unwrap();
        assert_eq!(doc.front_matter.unwrap().name.as_deref(), Some("a"));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(parse_skill_document("---\nname: [unclosed\n---\nbody").is_err());
    }
}
