//! System prompts for the two model calls.

/// Output contract appended to the planner prompt.
pub const PLAN_FORMAT_INSTRUCTIONS: &str = "Respond with a single JSON object and nothing else. \
It must match this schema:\n\
{\"project_name\": \"<snake_case project name>\", \"selected_skills\": [\"<skill name>\", ...]}";

/// Used in the coder prompt when no skill bodies were resolved.
pub const NO_STANDARDS: &str = "No specific standards.";

#[must_use]
pub fn planner_system_prompt(available_skills: &str) -> String {
    format!(
        "You are a Project Planner. Analyze the request and output a JSON plan.\n\
         1. Use snake_case for the project_name.\n\
         2. Select relevant skills ONLY from the AVAILABLE SKILLS list.\n\n\
         AVAILABLE SKILLS:\n{available_skills}\n\n\
         {PLAN_FORMAT_INSTRUCTIONS}"
    )
}

#[must_use]
pub fn coder_system_prompt(project_name: &str, skill_instructions: &str) -> String {
    let standards = if skill_instructions.trim().is_empty() {
        NO_STANDARDS
    } else {
        skill_instructions
    };

    format!(
        "You are an expert Embedded Engineer. Generate ONLY the code for main.c or *.ino file.\n\n\
         Target Project: {project_name}\n\n\
         === APPLICABLE STANDARDS ===\n\
         {standards}\n\
         ============================\n\n\
         Task: Write the main C/C++ code file.\n\n\
         RULES:\n\
         1. Do NOT ask clarifying questions. Make reasonable engineering assumptions.\n\
         2. Output ONLY the code block (inside ```c wrapper).\n\
         3. Include all necessary headers based on the requirements.\n\
         4. Use reasonable GPIO pins if not specified."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planner_prompt_lists_skills_and_format() {
        let prompt = planner_system_prompt("- arduino: Arduino sketches");
        assert!(prompt.contains("AVAILABLE SKILLS:\n- arduino: Arduino sketches"));
        assert!(prompt.ends_with(PLAN_FORMAT_INSTRUCTIONS));
    }

    #[test]
    fn test_coder_prompt_uses_placeholder_for_empty_standards() {
        let prompt = coder_system_prompt("blink", "  ");
        assert!(prompt.contains("Target Project: blink"));
        assert!(prompt.contains("=== APPLICABLE STANDARDS ===\nNo specific standards.\n"));
    }
}
