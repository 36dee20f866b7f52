//! Task-specific wrappers built on [`Gateway::generate_request`]

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::prompts::{truncate_chars, PromptTemplates};
use crate::gateway::service::Gateway;
use crate::response::{to_structured, to_text};

pub const SUMMARY_FALLBACK: &str = "Unable to summarize document.";
pub const THREAD_SUMMARY_FALLBACK: &str = "Unable to summarize conversation.";
pub const QUIZ_FALLBACK_TITLE: &str = "Error";
pub const SUGGESTION_FALLBACK: [&str; 3] = ["OK", "Thanks", "Got it"];

const DOCUMENT_MAX_CHARS: usize = 8000;
const QUIZ_SUMMARY_MAX_CHARS: usize = 2000;
const THREAD_WINDOW: usize = 10;
const LONG_FORM_MAX_TOKENS: u32 = 512;
const AUTOCORRECT_MIN_CHARS: usize = 3;

/// Generated assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub title: String,
    #[serde(default)]
    pub questions: Vec<String>,
}

impl Quiz {
    pub fn fallback() -> Self {
        Self {
            title: QUIZ_FALLBACK_TITLE.to_string(),
            questions: Vec::new(),
        }
    }
}

/// Moderation verdict
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Moderation {
    pub is_toxic: bool,
    pub reason: String,
}

/// One line of a chat thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub sender: String,
    pub content: String,
}

fn suggestion_fallback() -> [String; 3] {
    SUGGESTION_FALLBACK.map(String::from)
}

impl Gateway {
    /// Summarize course material as free text
    pub async fn summarize(&self, document: &str) -> String {
        let prompt = PromptTemplates::render(&self.prompts.summarize, &[(
            "document",
            truncate_chars(document, DOCUMENT_MAX_CHARS),
        )]);
        let request = self
            .request(&prompt, "summary")
            .max_tokens(self.max_tokens.max(LONG_FORM_MAX_TOKENS));

        self.generate_request(&request)
            .await
            .map(|text| to_text(&text))
            .unwrap_or_else(|| SUMMARY_FALLBACK.to_string())
    }

    /// Build a short assignment from a summary
    pub async fn generate_quiz(&self, summary: &str) -> Quiz {
        let prompt = PromptTemplates::render(&self.prompts.quiz, &[(
            "summary",
            truncate_chars(summary, QUIZ_SUMMARY_MAX_CHARS),
        )]);
        let request = self
            .request(&prompt, "assignment")
            .json_mode(true)
            .max_tokens(self.max_tokens.max(LONG_FORM_MAX_TOKENS));

        let raw = self.generate_request(&request).await;
        to_structured(raw.as_deref(), Quiz::fallback())
    }

    /// Three short contextual replies, always exactly three
    pub async fn suggest_replies(&self, message: &str) -> [String; 3] {
        let prompt = PromptTemplates::render(&self.prompts.suggest_replies, &[("message", message)]);
        let raw = self.generate(&prompt, "suggestions", true).await;

        let Value::Array(items) = to_structured(raw.as_deref(), Value::Null) else {
            return suggestion_fallback();
        };

        let replies: Vec<String> = items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .take(3)
            .collect();

        replies.try_into().unwrap_or_else(|_| suggestion_fallback())
    }

    /// Toxicity check; only a literal JSON `true` counts as toxic
    pub async fn moderate(&self, text: &str) -> Moderation {
        let prompt = PromptTemplates::render(&self.prompts.moderate, &[("text", text)]);
        let raw = self.generate(&prompt, "moderate", true).await;
        let parsed = to_structured(raw.as_deref(), Value::Null);

        Moderation {
            is_toxic: parsed.get("isToxic").and_then(Value::as_bool) == Some(true),
            reason: parsed
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }
    }

    /// Translate `text`, returning the input unchanged on failure
    pub async fn translate(&self, text: &str, target_language: &str) -> String {
        let prompt = PromptTemplates::render(&self.prompts.translate, &[
            ("language", target_language),
            ("text", text),
        ]);
        let raw = self.generate(&prompt, "translate", false).await;

        raw.as_deref()
            .map(to_text)
            .and_then(|reply| reply.lines().next().map(|line| line.trim().to_string()))
            .filter(|line| !line.is_empty())
            .unwrap_or_else(|| text.to_string())
    }

    /// Grammar correction, returning the input unchanged on failure
    pub async fn fix_grammar(&self, text: &str) -> String {
        #[derive(Deserialize)]
        struct Fixed {
            #[serde(default)]
            fixed: Option<String>,
        }

        let prompt = PromptTemplates::render(&self.prompts.fix_grammar, &[("text", text)]);
        let raw = self.generate(&prompt, "fix", true).await;

        to_structured(raw.as_deref(), Fixed { fixed: None })
            .fixed
            .filter(|fixed| !fixed.trim().is_empty())
            .unwrap_or_else(|| text.to_string())
    }

    /// Up to three typo corrections for short input
    pub async fn autocorrect(&self, text: &str) -> Vec<String> {
        if text.chars().count() < AUTOCORRECT_MIN_CHARS {
            return Vec::new();
        }

        let prompt = PromptTemplates::render(&self.prompts.autocorrect, &[("text", text)]);
        let raw = self.generate(&prompt, "autocorrect", true).await;

        match to_structured(raw.as_deref(), Value::Null) {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .take(3)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Three-bullet summary of the last ten messages of a thread
    pub async fn summarize_thread(&self, messages: &[ThreadMessage]) -> String {
        let start = messages.len().saturating_sub(THREAD_WINDOW);
        let conversation = messages[start..]
            .iter()
            .map(|m| format!("{}: {}", m.sender, m.content))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = PromptTemplates::render(&self.prompts.summarize_thread, &[(
            "conversation",
            conversation.as_str(),
        )]);

        self.generate(&prompt, "summarize", false)
            .await
            .map(|text| to_text(&text))
            .unwrap_or_else(|| THREAD_SUMMARY_FALLBACK.to_string())
    }
}
