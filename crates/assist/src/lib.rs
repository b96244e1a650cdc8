//! AI-assisted note features on top of an opaque completion provider.

mod assistant;
mod provider;

pub use assistant::{
    AssistError, GlossaryTerm, NoteAssistant, NoteInsights, Sentiment, Suggestion,
    TRANSLATION_LANGUAGES,
};
pub use provider::{CompletionProvider, CompletionRequest, DEFAULT_SYSTEM_PROMPT};
