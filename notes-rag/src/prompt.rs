//! Grounded prompt assembly.
//!
//! The instruction text is the only mechanism that keeps answers inside the
//! notes; nothing checks the model's output afterwards. Edit it with care.

use crate::document::Chunk;

/// Sentence the model is told to reply with when the notes lack the answer.
pub const REFUSAL_SENTENCE: &str = "This information is not available in the provided notes.";

/// Fixed instructions placed ahead of the context and question.
pub const INSTRUCTIONS: &str = r#"You are a beginner-friendly Data Structures and Algorithms (DSA) assistant
built using a Retrieval-Augmented Generation (RAG) model.

Your job is to help students understand DSA problems using ONLY the
information provided in the retrieved context.

Rules:
1. Use ONLY the given context.
2. Do NOT assume the student knows advanced concepts.
3. Explain in simple words.
4. If the answer is not in the context, say:
   "This information is not available in the provided notes."
5. Do NOT invent algorithms or shortcuts.
6. Follow the same language and examples from the context."#;

/// Join chunk texts in retrieval order, separated by a blank line.
pub fn format_context(chunks: &[Chunk]) -> String {
    chunks.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// Build the prompt sent to the answer generator.
///
/// The context and question are inserted verbatim in a single pass, so
/// braces or template-like text inside either are never expanded.
pub fn assemble_prompt(chunks: &[Chunk], question: &str) -> String {
    let context = format_context(chunks);
    format!(
        "{INSTRUCTIONS}\n\nContext:\n{context}\n\nUser Question:\n{question}\n\nAnswer:"
    )
}
