//! Prompt text sent to the image model.
//!
//! All wording lives here so it can be inspected by tests without a model.
//! The composition order of [`compose_prompt`] is fixed: the page-specific
//! instruction comes first, then the general instruction, then the
//! consistency clause. Reproducible outputs depend on it.

/// Label placed before a per-page instruction.
pub const PAGE_INSTRUCTION_LABEL: &str = "IMPORTANT - SPECIFIC INSTRUCTION FOR THIS PAGE:";

/// Label placed before the global design instruction.
pub const GENERAL_INSTRUCTION_LABEL: &str = "General Design Instruction:";

/// Appended when a previous page's design is attached as a reference.
pub const CONSISTENCY_CLAUSE: &str = "Refer to the provided reference image (the previous page's design) and maintain consistent tone & manner: color scheme, object styles, and overall visual identity. However, DO NOT copy the layout or structure from the previous page. Instead, create the most optimal layout and visual expression tailored to THIS page's text content. Adapt the design to best communicate the specific information on this slide while preserving the cohesive look and feel.";

/// Appended to the request text whenever reference images are attached.
pub const REFERENCE_STYLE_CLAUSE: &str = "Refer to the style of the attached reference images.";

/// Build the instruction text for one page.
///
/// `page_index` is 0-based and only used for tracing; the text depends on
/// the override, the global prompt, and whether a previous result exists.
/// A blank override counts as absent.
pub fn compose_prompt(
    page_index: usize,
    global_prompt: &str,
    page_override: Option<&str>,
    has_previous_result: bool,
) -> String {
    let mut prompt = String::new();

    if let Some(instruction) = page_override.filter(|s| !s.trim().is_empty()) {
        prompt.push_str(PAGE_INSTRUCTION_LABEL);
        prompt.push(' ');
        prompt.push_str(instruction);
        prompt.push_str("\n\n");
    }

    prompt.push_str(GENERAL_INSTRUCTION_LABEL);
    prompt.push(' ');
    prompt.push_str(global_prompt);

    if has_previous_result {
        prompt.push_str("\n\n");
        prompt.push_str(CONSISTENCY_CLAUSE);
    }

    tracing::trace!(page = page_index + 1, len = prompt.len(), "composed prompt");
    prompt
}

/// Final request text: the composed prompt plus the aspect-ratio and
/// reference-style clauses the remote client adds.
pub fn request_text(prompt: &str, aspect_ratio: Option<&str>, has_references: bool) -> String {
    let mut text = prompt.to_string();
    if let Some(ratio) = aspect_ratio {
        text.push_str(&format!(
            " The output image MUST have an aspect ratio of {ratio}."
        ));
    }
    if has_references {
        text.push(' ');
        text.push_str(REFERENCE_STYLE_CLAUSE);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_precedes_global_without_consistency() {
        let p = compose_prompt(0, "Use pastel colors", Some("Make it red"), false);
        let override_at = p.find("Make it red").unwrap();
        let global_at = p.find("Use pastel colors").unwrap();
        assert!(override_at < global_at);
        assert!(p.starts_with(PAGE_INSTRUCTION_LABEL));
        assert!(!p.contains(CONSISTENCY_CLAUSE));
    }

    #[test]
    fn exact_text_for_first_page() {
        let p = compose_prompt(0, "Use pastel colors", Some("Make it red"), false);
        assert_eq!(
            p,
            "IMPORTANT - SPECIFIC INSTRUCTION FOR THIS PAGE: Make it red\n\n\
             General Design Instruction: Use pastel colors"
        );
    }

    #[test]
    fn later_page_with_previous_result_gets_consistency_clause() {
        let p = compose_prompt(3, "Use pastel colors", None, true);
        assert_eq!(
            p,
            format!("General Design Instruction: Use pastel colors\n\n{CONSISTENCY_CLAUSE}")
        );
    }

    #[test]
    fn consistency_clause_forbids_copying_layout() {
        assert!(CONSISTENCY_CLAUSE.contains("color scheme"));
        assert!(CONSISTENCY_CLAUSE.contains("DO NOT copy the layout"));
    }

    #[test]
    fn blank_override_is_ignored() {
        let p = compose_prompt(1, "Dark mode", Some("   "), false);
        assert_eq!(p, "General Design Instruction: Dark mode");
    }

    #[test]
    fn composition_is_deterministic() {
        let a = compose_prompt(2, "Corporate", Some("Add a chart"), true);
        let b = compose_prompt(2, "Corporate", Some("Add a chart"), true);
        assert_eq!(a, b);
        let page_at = a.find("Add a chart").unwrap();
        let global_at = a.find("Corporate").unwrap();
        let clause_at = a.find(CONSISTENCY_CLAUSE).unwrap();
        assert!(page_at < global_at && global_at < clause_at);
    }

    #[test]
    fn request_text_adds_ratio_then_reference_clause() {
        let t = request_text("General Design Instruction: x", Some("16:9"), true);
        assert_eq!(
            t,
            "General Design Instruction: x The output image MUST have an aspect ratio of 16:9. \
             Refer to the style of the attached reference images."
        );
        assert_eq!(request_text("p", None, false), "p");
    }
}
