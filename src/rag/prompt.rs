use super::documents::Document;
use super::generator::ChatMessage;
use crate::history::HistoryEntry;

const CONTEXT_SLOT: &str = "{context}";
const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Builds the text sent for a chat turn: prior turns as `role: content`
/// lines followed by the new message.
pub fn contextual_input(history: &[HistoryEntry], message: &str) -> String {
    let context = history
        .iter()
        .map(|entry| format!("{}: {}", entry.role, entry.content))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Conversation so far:\n{}\n\nUser: {}", context, message)
}

/// Combines the persona instruction, retrieved chunks and the human input.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    system_template: String,
}

impl PromptAssembler {
    pub fn new(system_template: impl Into<String>) -> Self {
        Self {
            system_template: system_template.into(),
        }
    }

    pub fn assemble(&self, documents: &[Document], input: &str) -> Vec<ChatMessage> {
        let context = documents
            .iter()
            .map(|doc| doc.text.as_str())
            .collect::<Vec<_>>()
            .join(DOCUMENT_SEPARATOR);

        let system = if self.system_template.contains(CONTEXT_SLOT) {
            self.system_template.replace(CONTEXT_SLOT, &context)
        } else {
            format!("{}{}{}", self.system_template, DOCUMENT_SEPARATOR, context)
        };

        vec![ChatMessage::system(system), ChatMessage::user(input)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Role;

    #[test]
    fn contextual_input_lists_turns_in_order() {
        let history = vec![
            HistoryEntry::new(Role::User, "I have a headache"),
            HistoryEntry::new(Role::Assistant, "How long has it lasted?"),
        ];

        let input = contextual_input(&history, "Two days");

        assert_eq!(
            input,
            "Conversation so far:\nuser: I have a headache\nassistant: How long has it lasted?\n\nUser: Two days"
        );
    }

    #[test]
    fn contextual_input_without_history() {
        assert_eq!(contextual_input(&[], "hi"), "Conversation so far:\n\n\nUser: hi");
    }

    #[test]
    fn context_fills_the_slot() {
        let assembler = PromptAssembler::new("Answer from:\n{context}\nBe brief.");
        let docs = vec![Document::new("chunk one", "a"), Document::new("chunk two", "b")];

        let messages = assembler.assemble(&docs, "question");

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "Answer from:\nchunk one\n\nchunk two\nBe brief.");
        assert_eq!(messages[1], ChatMessage::user("question"));
    }

    #[test]
    fn template_without_slot_gets_context_appended() {
        let assembler = PromptAssembler::new("Persona.");
        let messages = assembler.assemble(&[Document::new("facts", "a")], "q");
        assert_eq!(messages[0].content, "Persona.\n\nfacts");
    }
}
