use crate::retrieve_chunks::ScoredChunk;

const QA_INSTRUCTIONS: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

/// Stuff-QA prompt: instructions, the retrieved context, then the question.
pub fn build_prompt(question: &str, hits: &[ScoredChunk]) -> String {
    format!(
        "{}\n\n{}\n\nQuestion: {}\nHelpful Answer:",
        QA_INSTRUCTIONS,
        format_context_from_hits(hits),
        question.trim()
    )
}

/// Retrieved texts in rank order, separated by a blank line.
pub fn format_context_from_hits(hits: &[ScoredChunk]) -> String {
    if hits.is_empty() {
        return "(no context found)".to_string();
    }
    hits.iter()
        .map(|hit| hit.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk_text::{Chunk, ChunkMetadata};

    fn hit(text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                text: text.to_string(),
                metadata: ChunkMetadata {
                    name: "chess".to_string(),
                    chunk_index: 0,
                    id: None,
                },
            },
            score,
            source: None,
        }
    }

    #[test]
    fn context_precedes_question() {
        let hits = [hit("Castling moves the king two squares.", 0.9), hit("Pawns move forward.", 0.4)];
        let prompt = build_prompt("How does castling work? ", &hits);
        assert!(prompt.contains("Castling moves the king two squares.\n\nPawns move forward."));
        assert!(prompt.starts_with("Use the following pieces of context"));
        assert!(prompt.ends_with("Question: How does castling work?\nHelpful Answer:"));
        let ctx_at = prompt.find("Castling moves").expect("context present");
        let q_at = prompt.find("Question:").expect("question present");
        assert!(ctx_at < q_at);
    }

    #[test]
    fn braces_in_context_are_not_treated_as_placeholders() {
        let prompt = build_prompt("what is {context}?", &[hit("use {question} here", 1.0)]);
        assert!(prompt.contains("use {question} here"));
        assert!(prompt.contains("Question: what is {context}?"));
    }

    #[test]
    fn empty_hits_are_marked() {
        assert_eq!(format_context_from_hits(&[]), "(no context found)");
    }
}
