//! Named prompt templates for the task wrappers
//!
//! Each template uses `{slot}` placeholders which [`PromptTemplates::render`]
//! substitutes. Defaults can be overridden from the `[prompts]` config table.

use serde::{Deserialize, Serialize};

/// One template per task wrapper
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PromptTemplates {
    #[serde(default = "default_summarize")]
    pub summarize: String,
    #[serde(default = "default_quiz")]
    pub quiz: String,
    #[serde(default = "default_suggest_replies")]
    pub suggest_replies: String,
    #[serde(default = "default_moderate")]
    pub moderate: String,
    #[serde(default = "default_translate")]
    pub translate: String,
    #[serde(default = "default_fix_grammar")]
    pub fix_grammar: String,
    #[serde(default = "default_autocorrect")]
    pub autocorrect: String,
    #[serde(default = "default_summarize_thread")]
    pub summarize_thread: String,
}

fn default_summarize() -> String {
    r#"Analyze this course material and provide a concise summary (max 300 words).

Text: "{document}...""#
        .to_string()
}

fn default_quiz() -> String {
    r#"Create a short assignment based on this summary.
Return JSON format:
{
    "title": "Assignment Title",
    "questions": ["Q1", "Q2", "Q3"]
}

Summary: "{summary}""#
        .to_string()
}

fn default_suggest_replies() -> String {
    r#"You are a smart reply assistant. Analyze this message (could be in ANY language) and generate 3 natural, contextual responses.

Message: "{message}"

IMPORTANT RULES:
1. Detect the language AND SCRIPT of the message.
2. If the message is in a transliterated language (e.g., Tamil written in English script), REPLY IN THE SAME TRANSLITERATED STYLE. Do NOT use native script.
3. Keep replies short (max 8 words each).
4. Make them contextual and natural for a chat app.

Return ONLY a JSON array: ["reply1", "reply2", "reply3"]

Examples:
Message: "Want to grab lunch?"
Output: ["Sure, what time?", "Sounds good!", "Maybe tomorrow?"]

Message: "Bonjour, comment ça va?"
Output: ["Très bien, merci!", "Ça va bien, et toi?", "Pas mal!"]

Your JSON:"#
        .to_string()
}

fn default_moderate() -> String {
    r#"Is this toxic/harmful? "{text}"

Return JSON: {"isToxic": true/false, "reason": "brief explanation"}

Examples:
Input: "I hate you"
Output: {"isToxic": true, "reason": "Contains hostile language"}

Input: "Great work!"
Output: {"isToxic": false, "reason": "Positive encouragement"}

Your JSON:"#
        .to_string()
}

fn default_translate() -> String {
    r#"Translate to {language}: "{text}"

Return ONLY the translation. No explanations or extra text.

Translation:"#
        .to_string()
}

fn default_fix_grammar() -> String {
    r#"Improve grammar: "{text}"

Return JSON: {"fixed": "corrected text"}

Example:
Input: "me go store"
Output: {"fixed": "I'm going to the store"}

Your JSON:"#
        .to_string()
}

fn default_autocorrect() -> String {
    r#"Fix typos in: "{text}"

Return a JSON array with 2-3 corrections. No explanations.

Example format:
["the quick brown fox", "the quick fox", "a quick brown fox"]

Your JSON:"#
        .to_string()
}

fn default_summarize_thread() -> String {
    r#"Summarize this conversation in 3 short bullet points:

{conversation}

Summary:"#
        .to_string()
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            summarize: default_summarize(),
            quiz: default_quiz(),
            suggest_replies: default_suggest_replies(),
            moderate: default_moderate(),
            translate: default_translate(),
            fix_grammar: default_fix_grammar(),
            autocorrect: default_autocorrect(),
            summarize_thread: default_summarize_thread(),
        }
    }
}

impl PromptTemplates {
    /// Substitute every `{name}` slot in `template`.
    ///
    /// Slots are replaced in a single left-to-right pass, so values that
    /// themselves contain `{...}` are inserted verbatim. Unknown slots and
    /// literal braces (e.g. JSON examples) are left untouched.
    pub fn render(template: &str, slots: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let replaced = after.find('}').and_then(|close| {
                let name = &after[..close];
                slots
                    .iter()
                    .find(|(slot, _)| *slot == name)
                    .map(|(_, value)| (close, *value))
            });

            match replaced {
                Some((close, value)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Truncate to at most `max_chars` characters on a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
