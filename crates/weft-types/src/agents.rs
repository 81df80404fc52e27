//! Agent-key registry for the content pipeline.
//!
//! Keys are protocol constants emitted by the collaborator service. Internal
//! routing nodes never appear in user-visible output, and `_tools` helper
//! nodes are folded back into their parent agent.

/// Tool name of the batch image generation call.
pub const GENERATE_IMAGES_TOOL: &str = "generate_images";

pub const BRIEF_COMPILER_AGENT: &str = "brief_compiler_agent";
pub const RESEARCH_EVIDENCE_AGENT: &str = "research_evidence_agent";
/// Legacy alias still emitted by older runs.
pub const RESEARCH_AGENT: &str = "research_agent";
pub const REFERENCE_INTELLIGENCE_AGENT: &str = "reference_intelligence_agent";
pub const WRITER_AGENT: &str = "writer_agent";
pub const LAYOUT_PLANNER_AGENT: &str = "layout_planner_agent";
pub const IMAGE_PLANNER_AGENT: &str = "image_planner_agent";
pub const IMAGE_AGENT: &str = "image_agent";
pub const REVIEW_AGENT: &str = "review_agent";

const TOOLS_SUFFIX: &str = "_tools";

/// Internal/synthetic routing nodes that must not show up in the timeline.
pub fn is_internal_node(agent_key: &str) -> bool {
    matches!(
        agent_key,
        "supervisor" | "supervisor_route" | "supervisor_with_style"
    )
}

/// `_tools` helper nodes attribute their work to the parent agent and never
/// lead a stage of their own.
pub fn is_tools_helper(agent_key: &str) -> bool {
    agent_key.ends_with(TOOLS_SUFFIX)
}

/// Fold `<agent>_tools` helper nodes back onto their parent agent key and
/// map the legacy research key onto the current one.
pub fn normalize_agent_key(agent_key: &str) -> &str {
    let key = agent_key.strip_suffix(TOOLS_SUFFIX).unwrap_or(agent_key);
    if key == RESEARCH_AGENT {
        RESEARCH_EVIDENCE_AGENT
    } else {
        key
    }
}

/// Short label appended to the assistant text when a stage-labeled agent
/// starts or finishes. Agents without a stage label stay silent.
pub fn stage_label(agent_key: &str) -> Option<&'static str> {
    match agent_key {
        BRIEF_COMPILER_AGENT => Some("Brief compilation"),
        RESEARCH_EVIDENCE_AGENT => Some("Evidence research"),
        REFERENCE_INTELLIGENCE_AGENT => Some("Reference analysis"),
        WRITER_AGENT => Some("Copywriting"),
        LAYOUT_PLANNER_AGENT => Some("Layout planning"),
        IMAGE_PLANNER_AGENT => Some("Image planning"),
        IMAGE_AGENT => Some("Image generation"),
        REVIEW_AGENT => Some("Quality review"),
        _ => None,
    }
}

/// Human-readable name for an agent key; unknown keys fall back to the key
/// itself so nothing renders blank.
pub fn display_name(agent_key: &str) -> String {
    let key = normalize_agent_key(agent_key);
    match stage_label(key) {
        Some(label) => label.to_string(),
        None => match key {
            "pre" => "Preparation".to_string(),
            _ => key.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_tools_suffix() {
        assert_eq!(
            normalize_agent_key("research_evidence_agent_tools"),
            "research_evidence_agent"
        );
        assert_eq!(normalize_agent_key("writer_agent"), "writer_agent");
        assert_eq!(normalize_agent_key("research_agent"), "research_evidence_agent");
    }

    #[test]
    fn test_internal_nodes() {
        assert!(is_internal_node("supervisor"));
        assert!(is_internal_node("supervisor_route"));
        assert!(is_internal_node("supervisor_with_style"));
        assert!(!is_internal_node("writer_agent"));
    }

    #[test]
    fn test_display_name_falls_back_to_key() {
        assert_eq!(display_name("writer_agent"), "Copywriting");
        assert_eq!(display_name("writer_agent_tools"), "Copywriting");
        assert_eq!(display_name("mystery_agent"), "mystery_agent");
    }
}
