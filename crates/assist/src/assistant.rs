use core_types::strip_html;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::provider::{CompletionProvider, CompletionRequest};

pub const TRANSLATION_LANGUAGES: &[&str] = &[
    "Spanish",
    "French",
    "German",
    "Italian",
    "Portuguese",
    "Chinese",
    "Japanese",
    "Korean",
    "Arabic",
    "Hindi",
    "Russian",
    "Dutch",
];

const MAX_TAGS: usize = 5;
const MAX_TAG_CHARS: usize = 19;
const MAX_GLOSSARY_TERMS: usize = 8;
const MAX_SUGGESTIONS: usize = 10;
const MAX_KEY_POINTS: usize = 5;
const MAX_RECOMMENDATIONS: usize = 3;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("content too short for {operation}: at least {min} characters required")]
    ContentTooShort { operation: &'static str, min: usize },

    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub error: String,
    pub correction: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl Sentiment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "positive" => Sentiment::Positive,
            "negative" => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInsights {
    pub sentiment: Sentiment,
    pub key_points: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Per-operation limits: minimum stripped length, input cap, and sampling.
struct Operation {
    name: &'static str,
    min_chars: usize,
    input_cap: usize,
    max_tokens: u32,
    temperature: f32,
}

const SUMMARIZE: Operation = Operation {
    name: "summary",
    min_chars: 20,
    input_cap: 3000,
    max_tokens: 150,
    temperature: 0.3,
};

const SUGGEST_TAGS: Operation = Operation {
    name: "tag suggestions",
    min_chars: 20,
    input_cap: 2000,
    max_tokens: 100,
    temperature: 0.4,
};

const GLOSSARY: Operation = Operation {
    name: "glossary extraction",
    min_chars: 50,
    input_cap: 2000,
    max_tokens: 800,
    temperature: 0.3,
};

const GRAMMAR: Operation = Operation {
    name: "grammar check",
    min_chars: 10,
    input_cap: 1500,
    max_tokens: 600,
    temperature: 0.2,
};

const TRANSLATE: Operation = Operation {
    name: "translation",
    min_chars: 5,
    input_cap: 2500,
    max_tokens: 1200,
    temperature: 0.3,
};

const INSIGHTS: Operation = Operation {
    name: "insights",
    min_chars: 50,
    input_cap: 2000,
    max_tokens: 500,
    temperature: 0.4,
};

impl Operation {
    fn prepare(&self, content: &str) -> Result<String, AssistError> {
        let text = strip_html(content);
        if text.chars().count() < self.min_chars {
            return Err(AssistError::ContentTooShort {
                operation: self.name,
                min: self.min_chars,
            });
        }
        Ok(text.chars().take(self.input_cap).collect())
    }

    fn request(&self, prompt: String) -> CompletionRequest {
        CompletionRequest::new(prompt, self.max_tokens, self.temperature)
    }
}

pub struct NoteAssistant<P> {
    provider: P,
}

impl<P: CompletionProvider> NoteAssistant<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn summarize(&self, content: &str) -> Result<String, AssistError> {
        let text = SUMMARIZE.prepare(content)?;
        let prompt = format!(
            "Summarize the following note in 1-2 concise sentences. Focus on the main point:\n\n{text}\n\nSummary:"
        );
        let response = self.run(&SUMMARIZE, prompt).await?;
        Ok(response.trim().to_owned())
    }

    pub async fn suggest_tags(&self, content: &str) -> Result<Vec<String>, AssistError> {
        let text = SUGGEST_TAGS.prepare(content)?;
        let prompt = format!(
            "Analyze this note and suggest 3-5 relevant tags.\nReturn ONLY the tags as a comma-separated list, nothing else.\n\nNote content:\n{text}\n\nTags:"
        );
        let response = self.run(&SUGGEST_TAGS, prompt).await?;
        Ok(parse_tags(&response))
    }

    /// Suggested tags minus those the note already carries.
    pub async fn suggest_new_tags(
        &self,
        content: &str,
        existing: &[String],
    ) -> Result<Vec<String>, AssistError> {
        let suggested = self.suggest_tags(content).await?;
        Ok(suggested
            .into_iter()
            .filter(|tag| !existing.iter().any(|have| have.eq_ignore_ascii_case(tag)))
            .collect())
    }

    /// Empty on provider or parse failure.
    pub async fn extract_glossary(&self, content: &str) -> Result<Vec<GlossaryTerm>, AssistError> {
        let text = GLOSSARY.prepare(content)?;
        let prompt = format!(
            "Identify 5-8 key technical terms, acronyms, or important concepts from this text.\nFor each term, provide a brief definition.\n\nReturn ONLY a valid JSON array in this exact format:\n[{{\"term\":\"example term\",\"definition\":\"brief explanation\"}}]\n\nText:\n{text}\n\nJSON:"
        );
        let Some(items) = self.run_json(&GLOSSARY, prompt, '[', ']').await else {
            return Ok(Vec::new());
        };
        Ok(json_items(&items)
            .filter_map(|item| {
                Some(GlossaryTerm {
                    term: non_empty_str(item, "term")?,
                    definition: non_empty_str(item, "definition")?,
                })
            })
            .take(MAX_GLOSSARY_TERMS)
            .collect())
    }

    /// Empty on provider or parse failure.
    pub async fn check_grammar(&self, content: &str) -> Result<Vec<Suggestion>, AssistError> {
        let text = GRAMMAR.prepare(content)?;
        let prompt = format!(
            "Check this text for grammar, spelling, and punctuation errors.\nFor each error, provide the incorrect text, the correction, and the error type.\n\nReturn ONLY a valid JSON array in this format:\n[{{\"error\":\"incorrect text\",\"correction\":\"correct text\",\"type\":\"grammar\"}}]\n\nIf no errors found, return [].\n\nText:\n{text}\n\nJSON:"
        );
        let Some(items) = self.run_json(&GRAMMAR, prompt, '[', ']').await else {
            return Ok(Vec::new());
        };
        Ok(json_items(&items)
            .filter_map(|item| {
                Some(Suggestion {
                    error: non_empty_str(item, "error")?,
                    correction: non_empty_str(item, "correction")?,
                    kind: non_empty_str(item, "type")?,
                })
            })
            .take(MAX_SUGGESTIONS)
            .collect())
    }

    pub async fn translate(&self, content: &str, language: &str) -> Result<String, AssistError> {
        let text = TRANSLATE.prepare(content)?;
        let prompt = format!(
            "Translate the following text to {language}.\nReturn ONLY the translated text, nothing else.\n\nText:\n{text}\n\nTranslation:"
        );
        let response = self.run(&TRANSLATE, prompt).await?;
        Ok(response.trim().to_owned())
    }

    /// Neutral defaults on provider or parse failure.
    pub async fn insights(&self, content: &str) -> Result<NoteInsights, AssistError> {
        let text = INSIGHTS.prepare(content)?;
        let prompt = format!(
            "Analyze this note and provide:\n1. Sentiment (positive/neutral/negative)\n2. 3-5 key points\n3. 2-3 actionable recommendations\n\nReturn ONLY a valid JSON object in this format:\n{{\n  \"sentiment\": \"positive\",\n  \"keyPoints\": [\"point 1\", \"point 2\", \"point 3\"],\n  \"recommendations\": [\"recommendation 1\", \"recommendation 2\"]\n}}\n\nNote:\n{text}\n\nJSON:"
        );
        let Some(value) = self.run_json(&INSIGHTS, prompt, '{', '}').await else {
            return Ok(NoteInsights::default());
        };
        Ok(NoteInsights {
            sentiment: value
                .get("sentiment")
                .and_then(Value::as_str)
                .map(Sentiment::parse)
                .unwrap_or_default(),
            key_points: string_list(&value, "keyPoints", MAX_KEY_POINTS),
            recommendations: string_list(&value, "recommendations", MAX_RECOMMENDATIONS),
        })
    }

    async fn run(&self, operation: &Operation, prompt: String) -> anyhow::Result<String> {
        let request = operation.request(prompt);
        debug!(
            operation = operation.name,
            max_tokens = request.max_tokens,
            prompt_chars = request.prompt.len(),
            "requesting completion"
        );
        self.provider.complete(&request).await
    }

    async fn run_json(
        &self,
        operation: &Operation,
        prompt: String,
        open: char,
        close: char,
    ) -> Option<Value> {
        let response = match self.run(operation, prompt).await {
            Ok(response) => response,
            Err(err) => {
                warn!(operation = operation.name, error = %err, "completion failed");
                return None;
            }
        };
        let Some(span) = json_span(&response, open, close) else {
            warn!(operation = operation.name, "completion contained no JSON");
            return None;
        };
        serde_json::from_str(span)
            .inspect_err(|err| {
                warn!(operation = operation.name, error = %err, "completion JSON is malformed");
            })
            .ok()
    }
}

fn parse_tags(response: &str) -> Vec<String> {
    response
        .split(',')
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty() && tag.chars().count() <= MAX_TAG_CHARS)
        .take(MAX_TAGS)
        .collect()
}

/// Span from the first `open` to the last `close`, inclusive.
fn json_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

fn json_items(value: &Value) -> impl Iterator<Item = &Value> {
    value.as_array().into_iter().flatten()
}

fn non_empty_str(item: &Value, field: &str) -> Option<String> {
    item.get(field)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

fn string_list(value: &Value, field: &str, limit: usize) -> Vec<String> {
    value
        .get(field)
        .into_iter()
        .flat_map(json_items)
        .filter_map(Value::as_str)
        .map(str::to_owned)
        .take(limit)
        .collect()
}
