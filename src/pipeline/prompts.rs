use super::knowledge::Chunk;
use crate::prd::HistoryEntry;
use serde_json::Value;

pub const ANALYSIS_SYSTEM: &str =
    "Extract structured information from product ideas. Respond only with valid JSON.";

pub const GENERATION_SYSTEM: &str = "Generate PRD content as valid JSON matching the exact field \
                                     structure provided. Be specific and detailed.";

pub const QUESTIONS_SYSTEM: &str = "Generate clarifying questions as a JSON array.";

/// Retrieval query issued before analysis
pub fn context_query(user_input: &str) -> String {
    format!(
        "product requirements examples features user stories {}",
        user_input
    )
}

pub fn analysis_prompt(user_input: &str, history: &[HistoryEntry]) -> String {
    let mut prompt = String::new();
    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for entry in history {
            prompt.push_str(&format!("{}: {}\n", entry.role, entry.content));
        }
        prompt.push('\n');
    }
    prompt.push_str(&format!(
        r#"Analyze this product idea: "{}"

Extract:
1. Product type/category
2. Main purpose/goal
3. Target users
4. Key features mentioned
5. Technical requirements
6. Business objectives

Respond in JSON: {{"product_type": "", "purpose": "", "target_users": [], "features": [],
"technical_requirements": [], "business_objectives": []}}"#,
        user_input
    ));
    prompt
}

/// Generation prompt with the analysis and the leading part of each context chunk
pub fn generation_prompt(analysis: &Value, context: &[&Chunk], snippet_chars: usize) -> String {
    let examples = context
        .iter()
        .map(|chunk| chunk.text.chars().take(snippet_chars).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        r#"Based on this analysis: {}

And these examples: {}

Generate a PRD with these EXACT fields to match the document structure:

{{
    "title": "A clear, compelling product title",
    "overview": "2-3 sentences describing the product and its value proposition",
    "objectives": ["Business objective 1", "Business objective 2", "Business objective 3"],
    "features": [
        "Feature 1: Description",
        "Feature 2: Description",
        "Feature 3: Description",
        "Feature 4: Description"
    ],
    "requirements": [
        "Technical requirement 1",
        "Technical requirement 2",
        "Technical requirement 3"
    ],
    "userStories": [
        "As a user, I want X, so that Y",
        "As a user, I want A, so that B",
        "As a user, I want C, so that D"
    ]
}}

Make it specific to the analyzed product idea. Ensure all arrays have at least 3 items.
Respond with valid JSON only."#,
        pretty(analysis),
        examples
    )
}

pub fn questions_prompt(user_input: &str, analysis: &Value) -> String {
    format!(
        r#"For this product idea: "{}"

Based on analysis: {}

Generate 2-3 specific clarifying questions to improve the PRD.
Focus on missing details about users, features, or requirements.

Respond as JSON array: ["Question 1?", "Question 2?", "Question 3?"]"#,
        user_input,
        pretty(analysis)
    )
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
