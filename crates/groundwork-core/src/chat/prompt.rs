//! Prompt assembly for a chat turn

use super::conversation::Message;

pub const ASSISTANT_PREAMBLE: &str = "You are a helpful network troubleshooting assistant.";

const CLOSING_INSTRUCTION: &str = "Respond in a helpful and informative way. \
All troubleshooting should be done through natural conversation.";

/// Contexts this short carry no usable passage
const MIN_CONTEXT_CHARS: usize = 10;

/// Whether a retrieved context block is worth including
pub fn has_usable_context(context: &str) -> bool {
    context.trim().chars().count() > MIN_CONTEXT_CHARS
}

/// Build the generation prompt.
///
/// `history` holds the earlier turns only; the current `message` is
/// appended separately.
pub fn build_prompt(message: &str, context: &str, history: &[Message]) -> String {
    let history_block = format!(
        "\nConversation history:\n{}",
        history
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    );

    let mut prompt = String::from(ASSISTANT_PREAMBLE);
    prompt.push('\n');
    if has_usable_context(context) {
        prompt.push_str("Here's some context from the knowledge base that might be relevant:\n\n");
        prompt.push_str(context);
        prompt.push_str("\n\n");
    } else {
        prompt.push('\n');
    }
    prompt.push_str(&history_block);
    prompt.push_str("\n\nUser's latest message: ");
    prompt.push_str(message);
    prompt.push_str("\n\n");
    prompt.push_str(CLOSING_INSTRUCTION);
    prompt.push('\n');
    prompt
}
