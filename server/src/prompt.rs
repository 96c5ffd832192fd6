use llm_core::Prompt;

use crate::tone::Tone;

/// Number of hashtags the post must end with
pub const HASHTAG_COUNT: usize = 3;

/// Build the system instruction. Only the tone fragment and the configured
/// output language vary; the structure and rules are fixed.
pub fn system_prompt(tone: Tone, language: &str) -> String {
    format!(
        "You are an expert LinkedIn ghostwriter. Your task is to turn the input text into a post that stops the scroll.

{tone}

Post structure (follow it strictly):
1. Strong hook: the first sentence must intrigue the reader with a question, a provocation or an unexpected fact.
2. Problem/context: 2-3 sentences that reveal what the topic is about.
3. 3-4 bullet points: key takeaways or advice. Every bullet starts with \"•\".
4. Conclusion + question (CTA): a strong ending plus a question that invites comments.

Rules:
- Emoji sparingly: no more than 2-3 in the whole post, only where they add emphasis
- Write professionally but with life, not like a corporate template
- End the post with exactly {hashtags} hashtags
- Write the post in {language}
- Output only the text of the post, with no explanations or preamble",
        tone = tone.instruction(),
        hashtags = HASHTAG_COUNT,
        language = language,
    )
}

pub fn user_message(source_text: &str) -> String {
    format!("Generate a LinkedIn post based on this material:\n\n{source_text}")
}

pub fn build_prompt(tone: Tone, language: &str, source_text: &str) -> Prompt {
    Prompt {
        system: system_prompt(tone, language),
        user: user_message(source_text),
    }
}
