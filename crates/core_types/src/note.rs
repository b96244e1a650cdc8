use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage key holding the serialized note collection.
pub const NOTES_KEY: &str = "notes_app_data";

pub const DEFAULT_NOTE_TITLE: &str = "Untitled Note";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Note {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: NoteId::generate(),
            title: title.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
            is_pinned: false,
            is_locked: false,
            tags: Vec::new(),
        }
    }

    /// Moves `updated_at` forward, strictly past its previous value.
    pub fn touch(&mut self) {
        self.updated_at = next_timestamp(self.updated_at);
    }

    /// Merges `patch` into the note. Returns whether any field was provided.
    pub fn apply(&mut self, patch: NotePatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(tags) = patch.tags {
            self.tags.clear();
            self.add_tags(tags);
        }
        self.touch();
        true
    }

    /// Unions `tags` into the tag set, skipping case-insensitive duplicates
    /// and blank values. Returns the number of tags actually added.
    pub fn add_tags<I, T>(&mut self, tags: I) -> usize
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut added = 0;
        for tag in tags {
            let tag: String = tag.into();
            let tag = tag.trim();
            if tag.is_empty() || contains_tag(&self.tags, tag) {
                continue;
            }
            self.tags.push(tag.to_owned());
            added += 1;
        }
        added
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|existing| existing != tag);
        self.tags.len() != before
    }

    /// Restores the model invariants on data that came from outside the store.
    pub fn repair(&mut self) {
        let tags = std::mem::take(&mut self.tags);
        self.add_tags(tags);
        if self.updated_at < self.created_at {
            self.updated_at = self.created_at;
        }
    }
}

/// Named optional fields merged by an update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NotePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none() && self.tags.is_none()
    }
}

/// Document written under [`NOTES_KEY`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesSnapshot {
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl NotesSnapshot {
    pub fn new(notes: Vec<Note>) -> Self {
        Self {
            notes,
            last_updated: Some(Utc::now()),
        }
    }
}

pub fn contains_tag(tags: &[String], tag: &str) -> bool {
    let wanted = tag.to_lowercase();
    tags.iter().any(|existing| existing.to_lowercase() == wanted)
}

/// Current time, or one microsecond past `previous` when the clock has not
/// moved beyond it.
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn new_note_has_defaults() {
        let note = Note::new("Groceries", "<p>milk</p>");
        assert_eq!(note.title, "Groceries");
        assert!(!note.is_pinned);
        assert!(!note.is_locked);
        assert!(note.tags.is_empty());
        assert_eq!(note.created_at, note.updated_at);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let note = Note::new("Plan", "");
        let value = serde_json::to_value(&note).expect("serialize");
        let object = value.as_object().expect("object");
        for key in [
            "id",
            "title",
            "content",
            "createdAt",
            "updatedAt",
            "isPinned",
            "isLocked",
            "tags",
        ] {
            assert!(object.contains_key(key), "missing {key}");
        }
    }

    #[test]
    fn deserializes_notes_without_optional_fields() {
        let raw = r#"{
            "id": "1700000000000",
            "title": "Old",
            "content": "<p>x</p>",
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-02T00:00:00.000Z"
        }"#;
        let note: Note = serde_json::from_str(raw).expect("parse");
        assert_eq!(note.id.as_str(), "1700000000000");
        assert!(note.tags.is_empty());
        assert!(!note.is_pinned);
    }

    #[test]
    fn add_tags_skips_case_insensitive_duplicates() {
        let mut note = Note::new("Tags", "");
        assert_eq!(note.add_tags(["rust", "Rust", "  ", "notes"]), 2);
        assert_eq!(note.add_tags(["RUST"]), 0);
        assert_eq!(note.tags, vec!["rust".to_owned(), "notes".to_owned()]);
    }

    #[test]
    fn remove_tag_is_exact_match() {
        let mut note = Note::new("Tags", "");
        note.add_tags(["Work"]);
        assert!(!note.remove_tag("work"));
        assert!(note.remove_tag("Work"));
        assert!(note.tags.is_empty());
    }

    #[test]
    fn apply_patch_refreshes_timestamp() {
        let mut note = Note::new("Draft", "");
        let before = note.updated_at;
        assert!(note.apply(NotePatch::title("Final").with_content("<p>done</p>")));
        assert_eq!(note.title, "Final");
        assert_eq!(note.content, "<p>done</p>");
        assert!(note.updated_at > before);

        assert!(!note.apply(NotePatch::default()));
    }

    #[test]
    fn repair_restores_invariants() {
        let mut note = Note::new("Broken", "");
        note.tags = vec!["a".into(), "A".into(), "b".into()];
        note.updated_at = note.created_at - Duration::days(1);
        note.repair();
        assert_eq!(note.tags, vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(note.updated_at, note.created_at);
    }

    #[test]
    fn next_timestamp_is_strictly_increasing() {
        let future = Utc::now() + Duration::hours(1);
        assert!(next_timestamp(future) > future);
    }

    proptest! {
        #[test]
        fn adding_the_same_tags_twice_changes_nothing(
            tags in prop::collection::vec("[ a-zA-Z]{0,6}", 0..12)
        ) {
            let mut note = Note::new("t", "");
            note.add_tags(tags.clone());
            let first = note.tags.clone();

            let shouted: Vec<String> = tags.iter().map(|tag| tag.to_uppercase()).collect();
            prop_assert_eq!(note.add_tags(tags), 0);
            prop_assert_eq!(note.add_tags(shouted), 0);
            prop_assert_eq!(&note.tags, &first);
            prop_assert!(note.tags.iter().all(|tag| !tag.is_empty() && tag.trim() == tag.as_str()));
        }
    }
}
