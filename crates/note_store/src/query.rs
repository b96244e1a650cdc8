use std::collections::{BTreeMap, HashSet};

use core_types::{Note, SortBy};

/// Pinned notes first; `sort_by` orders each group. The sort is stable, so
/// ties keep collection order.
pub fn sort_notes(notes: &[Note], sort_by: SortBy) -> Vec<&Note> {
    let mut sorted: Vec<&Note> = notes.iter().collect();
    sorted.sort_by(|a, b| {
        b.is_pinned.cmp(&a.is_pinned).then_with(|| match sort_by {
            SortBy::Updated => b.updated_at.cmp(&a.updated_at),
            SortBy::Created => b.created_at.cmp(&a.created_at),
            SortBy::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        })
    });
    sorted
}

/// Case-insensitive substring match on title, content and tags. An empty
/// query matches every note.
pub fn matches_query(note: &Note, query: &str) -> bool {
    let query = query.trim();
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    note.title.to_lowercase().contains(&needle)
        || note.content.to_lowercase().contains(&needle)
        || note
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

/// Tag usage across the collection, grouped case-insensitively, most used
/// first. The first spelling seen names the group.
pub fn tag_counts(notes: &[Note]) -> Vec<(String, usize)> {
    let mut groups: BTreeMap<String, (String, usize)> = BTreeMap::new();
    for tag in notes.iter().flat_map(|note| note.tags.iter()) {
        groups
            .entry(tag.to_lowercase())
            .or_insert_with(|| (tag.clone(), 0))
            .1 += 1;
    }
    let mut counts: Vec<(String, usize)> = groups.into_values().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteStats {
    pub total: usize,
    pub pinned: usize,
    pub locked: usize,
    pub unique_tags: usize,
}

impl NoteStats {
    pub fn collect(notes: &[Note]) -> Self {
        let unique: HashSet<String> = notes
            .iter()
            .flat_map(|note| note.tags.iter().map(|tag| tag.to_lowercase()))
            .collect();
        Self {
            total: notes.len(),
            pinned: notes.iter().filter(|note| note.is_pinned).count(),
            locked: notes.iter().filter(|note| note.is_locked).count(),
            unique_tags: unique.len(),
        }
    }
}
