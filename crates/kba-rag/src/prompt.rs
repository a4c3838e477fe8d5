//! Prompt templates

use crate::config::DEFAULT_ASSISTANT_ROLE;

/// The two mutually exclusive prompt shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptTemplate {
    /// Knowledge-base content first, general knowledge as a cautious supplement
    Grounded,
    /// Nothing relevant was retrieved
    GeneralKnowledge,
}

impl PromptTemplate {
    pub fn select(context_used: bool) -> Self {
        if context_used {
            PromptTemplate::Grounded
        } else {
            PromptTemplate::GeneralKnowledge
        }
    }
}

/// Renders prompts addressed to a configurable assistant persona
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    role: String,
}

impl PromptTemplates {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }

    /// Answer label such as `IT SUPPORT EXPERT ANSWER:`, derived from the role
    fn answer_label(&self) -> String {
        let role = self.role.trim();
        let role = ["an ", "a ", "the "]
            .iter()
            .find_map(|article| role.strip_prefix(article))
            .unwrap_or(role);
        let role = role.strip_suffix(" assistant").unwrap_or(role);
        format!("{} ANSWER:", role.to_uppercase())
    }

    pub fn render(&self, template: PromptTemplate, question: &str, context: &str) -> String {
        match template {
            PromptTemplate::Grounded => self.grounded(question, context),
            PromptTemplate::GeneralKnowledge => self.general_knowledge(question),
        }
    }

    fn grounded(&self, question: &str, context: &str) -> String {
        format!(
            "You are {role}. Use the provided knowledge base content as your primary source, \
             and supplement with your general knowledge when helpful.\n\
             \n\
             {context}\n\
             \n\
             USER QUESTION: {question}\n\
             \n\
             INSTRUCTIONS:\n\
             1. FIRST answer based on the provided knowledge base content\n\
             2. If the knowledge base content is incomplete or doesn't fully address the question, \
             you may supplement with your general knowledge\n\
             3. Clearly distinguish between information from the knowledge base and general knowledge\n\
             4. Cite specific documents when using information from them\n\
             5. Be specific, technical, and practical\n\
             6. If providing steps, make them actionable and sequential\n\
             7. If the knowledge base content seems incorrect or outdated, mention this cautiously\n\
             \n\
             {label}",
            role = self.role,
            context = context,
            question = question,
            label = self.answer_label(),
        )
    }

    fn general_knowledge(&self, question: &str) -> String {
        format!(
            "You are {role}. No relevant information was found in the knowledge base, \
             so provide the best answer using your general knowledge.\n\
             \n\
             USER QUESTION: {question}\n\
             \n\
             INSTRUCTIONS:\n\
             1. Provide a helpful answer based on your general knowledge and best practices\n\
             2. Clearly state that this information is from general knowledge rather than \
             specific organizational documentation\n\
             3. Be specific, technical, and practical\n\
             4. If providing steps, make them actionable and sequential\n\
             5. If you're uncertain about something, acknowledge the limitation\n\
             \n\
             {label}",
            role = self.role,
            question = question,
            label = self.answer_label(),
        )
    }
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self::new(DEFAULT_ASSISTANT_ROLE)
    }
}
