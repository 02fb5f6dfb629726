//! Prompts for the selection and synthesis phases.

/// Placeholder context when no section could be resolved.
pub const EMPTY_CONTEXT: &str = "(no document sections were selected)";

pub const ANSWER_INSTRUCTIONS: &str = "Answer the question using only the context provided. \
If the context does not contain enough information to answer, say so plainly instead of \
guessing.";

/// Phase-1 prompt: the question plus the outline without section text.
pub fn selection_prompt(question: &str, outline_json: &str) -> String {
    format!(
        "You are given a question and the outline of a document. Each section lists its \
node_id, title, summary and starting line; section text is not shown. Find the sections \
that are likely to contain the answer.

Question: {question}

Document outline:
{outline_json}

Reply in this JSON format:
{{
    \"thinking\": \"<which sections are relevant and why>\",
    \"node_list\": [\"node_id_1\", \"node_id_2\"]
}}
Return only the JSON."
    )
}

/// Phase-3 prompt: the question and the resolved context.
pub fn answer_prompt(question: &str, context: &str) -> String {
    let context = if context.trim().is_empty() {
        EMPTY_CONTEXT
    } else {
        context
    };
    format!("Question: {question}\n\nContext:\n{context}")
}

/// One resolved section as it appears in the context.
pub fn context_block(title: &str, content: &str) -> String {
    format!("### {title}\n{content}")
}
