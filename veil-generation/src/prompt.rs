//! System prompt and completion request assembly.

use veil_core::models::{AssembledContext, CompletionRequest, Message, PromptMessage};
use veil_core::config::GenerationConfig;
use veil_retrieval::MarkerSyntax;

/// Privacy rules given to the model on every turn.
pub fn system_prompt(markers: &MarkerSyntax) -> String {
    format!(
        "You are a helpful assistant answering questions for this chatbot's users.\n\
         \n\
         Rules:\n\
         1. Cite public sources by copying their marker exactly, e.g. {example}, right after \
         the sentence that uses them. Only markers that appear in PUBLIC SOURCES exist.\n\
         2. Never invent a marker, never number a marker yourself, and never attach a marker \
         to anything taken from the private background notes.\n\
         3. The private background notes may guide your reasoning, but you must never quote, \
         cite, paraphrase closely, summarise, or reveal them, and never mention that they exist.\n\
         4. If the answer is not covered by the public sources, say so plainly.",
        example = markers.render(0)
    )
}

/// Everything the model receives for one completion.
pub fn completion_request(
    markers: &MarkerSyntax,
    context: &AssembledContext,
    history: &[Message],
    user_text: &str,
    config: &GenerationConfig,
) -> CompletionRequest {
    CompletionRequest {
        system_prompt: system_prompt(markers),
        citable_block: context.citable_block.clone(),
        learn_only_block: context.learn_only_block.clone(),
        history: history
            .iter()
            .map(|m| PromptMessage {
                role: m.role,
                content: m.content.clone(),
            })
            .collect(),
        user_text: user_text.to_string(),
        max_output_tokens: config.max_output_tokens,
        temperature: config.temperature,
    }
}

/// Single system message for chat APIs: rules, then public sources, then the
/// wrapped private notes.
pub fn render_system_message(request: &CompletionRequest) -> String {
    let mut out = request.system_prompt.clone();
    out.push_str("\n\nPUBLIC SOURCES:\n");
    if request.citable_block.is_empty() {
        out.push_str("(none)");
    } else {
        out.push_str(&request.citable_block);
    }
    if !request.learn_only_block.is_empty() {
        out.push_str("\n\n");
        out.push_str(&request.learn_only_block);
    }
    out
}
