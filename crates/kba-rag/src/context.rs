//! Context assembly for grounded prompts

use kba_core::RetrievedPassage;

/// Context used when retrieval found nothing
pub const NO_CONTEXT: &str = "No relevant knowledge base content found for this question.";

const CONTEXT_HEADER: &str = "KNOWLEDGE BASE CONTENT:\n\n";

/// Builds the annotated context blob handed to the generation backend
#[derive(Debug, Default, Clone, Copy)]
pub struct ContextAssembler;

impl ContextAssembler {
    /// One labeled block per passage, in ranked order
    pub fn build(passages: &[RetrievedPassage]) -> String {
        if passages.is_empty() {
            return NO_CONTEXT.to_string();
        }

        let mut context = String::from(CONTEXT_HEADER);
        for (i, passage) in passages.iter().enumerate() {
            context.push_str(&format!(
                "--- Document {}: {} (Relevance: {:.2}) ---\n",
                i + 1,
                passage.metadata.source,
                passage.similarity
            ));
            context.push_str(&passage.text);
            context.push_str("\n\n");
        }

        context
    }
}
