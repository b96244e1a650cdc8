use std::collections::HashSet;

use chrono::{DateTime, Utc};
use core_types::{
    DEFAULT_NOTE_TITLE, NOTES_KEY, Note, NoteId, NotePatch, NotesSnapshot, Preferences, SortBy,
};
use note_storage::{KeyValueStorage, StorageError};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::query::{self, NoteStats};
use crate::transfer::{self, ImportError, ImportReport};

/// Owns the note collection and writes it through to a key-value medium.
///
/// Operations that reference an unknown id are no-ops. Mutators return
/// whether the collection changed; only changes are persisted.
///
/// When the stored collection could not be read at open time, nothing is
/// written until a later read succeeds; the notes created meanwhile are
/// then merged ahead of the stored ones.
pub struct NoteStore<S> {
    storage: S,
    notes: Vec<Note>,
    unsaved: bool,
    load_failed: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotRef<'a> {
    notes: &'a [Note],
    last_updated: DateTime<Utc>,
}

impl<S: KeyValueStorage> NoteStore<S> {
    /// Loads the collection from `storage`. Missing or malformed data starts
    /// an empty collection; a failed read also starts empty but holds back
    /// writes until [`NoteStore::reload`] succeeds.
    pub fn open(storage: S) -> Self {
        let (notes, load_failed) = match load_notes(&storage) {
            Ok(notes) => (notes, false),
            Err(err) => {
                error!(key = NOTES_KEY, error = %err, "failed to read notes, writes are held back");
                (Vec::new(), true)
            }
        };
        info!(count = notes.len(), load_failed, "note store opened");
        Self {
            storage,
            notes,
            unsaved: false,
            load_failed,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Collection order: most recently created first.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn get(&self, id: &NoteId) -> Option<&Note> {
        self.notes.iter().find(|note| &note.id == id)
    }

    /// True when the last write to storage failed or was held back.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// True while the stored collection has not been read successfully.
    pub fn is_load_pending(&self) -> bool {
        self.load_failed
    }

    /// Retries reading the stored collection after a failed open, merging
    /// notes created in the meantime ahead of the stored ones. Returns
    /// whether the stored collection is now loaded.
    pub fn reload(&mut self) -> bool {
        if !self.load_failed {
            return true;
        }
        let stored = match load_notes(&self.storage) {
            Ok(stored) => stored,
            Err(err) => {
                error!(key = NOTES_KEY, error = %err, "notes are still unreadable");
                return false;
            }
        };
        let known: HashSet<NoteId> = self.notes.iter().map(|note| note.id.clone()).collect();
        let recovered = stored.len();
        self.notes
            .extend(stored.into_iter().filter(|note| !known.contains(&note.id)));
        self.load_failed = false;
        info!(recovered, count = self.notes.len(), "stored notes recovered");
        true
    }

    pub fn create(&mut self, title: Option<&str>, content: Option<&str>) -> Note {
        let mut note = Note::new(
            title.unwrap_or(DEFAULT_NOTE_TITLE),
            content.unwrap_or_default(),
        );
        while self.get(&note.id).is_some() {
            note.id = NoteId::generate();
        }
        debug!(id = %note.id, "note created");
        self.notes.insert(0, note.clone());
        self.persist();
        note
    }

    pub fn update(&mut self, id: &NoteId, patch: NotePatch) -> bool {
        self.mutate(id, |note| note.apply(patch))
    }

    pub fn delete(&mut self, id: &NoteId) -> bool {
        let before = self.notes.len();
        self.notes.retain(|note| &note.id != id);
        if self.notes.len() == before {
            debug!(id = %id, "delete ignored, note not found");
            return false;
        }
        self.persist();
        true
    }

    pub fn toggle_pin(&mut self, id: &NoteId) -> bool {
        self.mutate(id, |note| {
            note.is_pinned = !note.is_pinned;
            true
        })
    }

    /// Sets the lock flag, swapping in `content` when given (the codec
    /// token when locking, the plain content when removing a lock).
    pub fn set_lock(&mut self, id: &NoteId, locked: bool, content: Option<String>) -> bool {
        self.mutate(id, |note| {
            note.is_locked = locked;
            if let Some(content) = content {
                note.content = content;
            }
            note.touch();
            true
        })
    }

    pub fn add_tags<I, T>(&mut self, id: &NoteId, tags: I) -> bool
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.mutate(id, |note| {
            let added = note.add_tags(tags);
            if added > 0 {
                note.touch();
            }
            added > 0
        })
    }

    pub fn remove_tag(&mut self, id: &NoteId, tag: &str) -> bool {
        self.mutate(id, |note| {
            let removed = note.remove_tag(tag);
            if removed {
                note.touch();
            }
            removed
        })
    }

    /// Pinned notes first, then most recently updated. Computed per call.
    pub fn sorted_view(&self) -> Vec<&Note> {
        self.sorted_by(SortBy::Updated)
    }

    pub fn sorted_by(&self, sort_by: SortBy) -> Vec<&Note> {
        query::sort_notes(&self.notes, sort_by)
    }

    /// Notes whose title, content or tags contain `query`, in sorted-view
    /// order.
    pub fn search(&self, query: &str) -> Vec<&Note> {
        self.sorted_view()
            .into_iter()
            .filter(|note| query::matches_query(note, query))
            .collect()
    }

    pub fn notes_with_tag(&self, tag: &str) -> Vec<&Note> {
        self.sorted_view()
            .into_iter()
            .filter(|note| core_types::contains_tag(&note.tags, tag))
            .collect()
    }

    pub fn tag_counts(&self) -> Vec<(String, usize)> {
        query::tag_counts(&self.notes)
    }

    pub fn stats(&self) -> NoteStats {
        NoteStats::collect(&self.notes)
    }

    pub fn clear(&mut self) {
        if self.notes.is_empty() {
            return;
        }
        self.notes.clear();
        self.persist();
    }

    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.notes)
    }

    /// Appends notes from an exported document. Notes whose id already
    /// exists are skipped.
    pub fn import_json(&mut self, text: &str) -> Result<ImportReport, ImportError> {
        let incoming = transfer::parse_import(text)?;
        let mut report = ImportReport::default();
        for note in incoming {
            if self.get(&note.id).is_some() {
                report.skipped += 1;
                continue;
            }
            self.notes.push(note);
            report.imported += 1;
        }
        if report.imported > 0 {
            self.persist();
        }
        info!(imported = report.imported, skipped = report.skipped, "notes imported");
        Ok(report)
    }

    pub fn preferences(&self) -> Preferences {
        crate::load_preferences(&self.storage)
    }

    pub fn save_preferences(&self, preferences: &Preferences) -> Result<(), StorageError> {
        crate::save_preferences(&self.storage, preferences)
    }

    fn mutate(&mut self, id: &NoteId, apply: impl FnOnce(&mut Note) -> bool) -> bool {
        let Some(note) = self.notes.iter_mut().find(|note| &note.id == id) else {
            debug!(id = %id, "operation ignored, note not found");
            return false;
        };
        let changed = apply(note);
        if changed {
            self.persist();
        }
        changed
    }

    fn persist(&mut self) {
        if !self.reload() {
            error!(key = NOTES_KEY, "refusing to overwrite notes that were never loaded");
            self.unsaved = true;
            return;
        }
        let snapshot = SnapshotRef {
            notes: &self.notes,
            last_updated: Utc::now(),
        };
        let text = match serde_json::to_string(&snapshot) {
            Ok(text) => text,
            Err(err) => {
                error!(error = %err, "failed to serialize notes");
                self.unsaved = true;
                return;
            }
        };
        match self.storage.set(NOTES_KEY, &text) {
            Ok(()) => {
                debug!(count = self.notes.len(), bytes = text.len(), "notes persisted");
                self.unsaved = false;
            }
            Err(err) => {
                error!(key = NOTES_KEY, error = %err, "failed to persist notes");
                self.unsaved = true;
            }
        }
    }
}

/// Stored notes; absent or malformed data is an empty collection, a failed
/// read is an error.
fn load_notes(storage: &impl KeyValueStorage) -> Result<Vec<Note>, StorageError> {
    let Some(raw) = storage.get(NOTES_KEY)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<NotesSnapshot>(&raw) {
        Ok(snapshot) => Ok(repair_collection(snapshot.notes)),
        Err(err) => {
            warn!(key = NOTES_KEY, error = %err, "stored notes are malformed, starting empty");
            Ok(Vec::new())
        }
    }
}

/// Drops repeated ids (first occurrence wins) and repairs each note.
pub(crate) fn repair_collection(notes: Vec<Note>) -> Vec<Note> {
    let mut seen = HashSet::new();
    let mut output = Vec::with_capacity(notes.len());
    for mut note in notes {
        if !seen.insert(note.id.clone()) {
            warn!(id = %note.id, "dropping note with duplicate id");
            continue;
        }
        note.repair();
        output.push(note);
    }
    output
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use note_storage::{MemoryStorage, SqliteStorage};
    use proptest::prelude::*;
    use tempfile::tempdir;

    use super::*;

    struct BrokenStorage;

    impl KeyValueStorage for BrokenStorage {
        fn get(&self, _key: &str) -> note_storage::Result<Option<String>> {
            Err(StorageError::Io(std::io::Error::other("unavailable")))
        }

        fn set(&self, key: &str, _value: &str) -> note_storage::Result<()> {
            Err(StorageError::QuotaExceeded {
                key: key.to_owned(),
                needed: 1,
                quota: 0,
            })
        }

        fn remove(&self, _key: &str) -> note_storage::Result<()> {
            Ok(())
        }
    }

    /// Fails the next `failing_reads` reads, then forwards.
    struct FlakyStorage {
        inner: MemoryStorage,
        failing_reads: AtomicUsize,
    }

    impl FlakyStorage {
        fn new() -> Self {
            Self {
                inner: MemoryStorage::new(),
                failing_reads: AtomicUsize::new(0),
            }
        }

        fn fail_next_reads(&self, count: usize) {
            self.failing_reads.store(count, Ordering::SeqCst);
        }

        fn stored_count(&self) -> usize {
            let raw = self.inner.get(NOTES_KEY).expect("get").expect("stored");
            let snapshot: NotesSnapshot = serde_json::from_str(&raw).expect("json");
            snapshot.notes.len()
        }
    }

    impl KeyValueStorage for FlakyStorage {
        fn get(&self, key: &str) -> note_storage::Result<Option<String>> {
            let failing = self.failing_reads.load(Ordering::SeqCst);
            if failing > 0 {
                self.failing_reads.store(failing - 1, Ordering::SeqCst);
                return Err(StorageError::Io(std::io::Error::other("busy")));
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> note_storage::Result<()> {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> note_storage::Result<()> {
            self.inner.remove(key)
        }
    }

    fn seeded_flaky_storage(count: usize) -> Arc<FlakyStorage> {
        let storage = Arc::new(FlakyStorage::new());
        let mut store = NoteStore::open(storage.clone());
        for index in 0..count {
            store.create(Some(format!("seed {index}").as_str()), None);
        }
        storage
    }

    fn titles(notes: &[&Note]) -> Vec<String> {
        notes.iter().map(|note| note.title.clone()).collect()
    }

    #[test]
    fn create_prepends_with_defaults() {
        let mut store = NoteStore::open(MemoryStorage::new());
        let first = store.create(None, None);
        let second = store.create(Some("Plan"), Some("<p>steps</p>"));

        assert_eq!(first.title, DEFAULT_NOTE_TITLE);
        assert_eq!(first.content, "");
        assert_eq!(store.notes()[0].id, second.id);
        assert_eq!(store.notes()[1].id, first.id);
        assert!(!second.is_pinned && !second.is_locked && second.tags.is_empty());
    }

    #[test]
    fn created_ids_are_distinct() {
        let mut store = NoteStore::open(MemoryStorage::new());
        let ids: HashSet<NoteId> = (0..200).map(|_| store.create(None, None).id).collect();
        assert_eq!(ids.len(), 200);
    }

    #[test]
    fn update_merges_fields_and_advances_timestamp() {
        let mut store = NoteStore::open(MemoryStorage::new());
        let note = store.create(Some("Draft"), Some("<p>a</p>"));

        assert!(store.update(&note.id, NotePatch::title("X")));
        let updated = store.get(&note.id).expect("note");
        assert_eq!(updated.title, "X");
        assert_eq!(updated.content, "<p>a</p>");
        assert!(updated.updated_at > note.updated_at);
        assert!(updated.updated_at >= updated.created_at);
    }

    #[test]
    fn operations_on_deleted_note_are_noops() {
        let mut store = NoteStore::open(MemoryStorage::new());
        let note = store.create(Some("Gone"), None);
        let keep = store.create(Some("Keep"), None);

        assert!(store.delete(&note.id));
        assert!(!store.delete(&note.id));
        assert!(!store.update(&note.id, NotePatch::content("x")));
        assert!(!store.toggle_pin(&note.id));
        assert!(!store.set_lock(&note.id, true, Some("token".into())));
        assert!(!store.add_tags(&note.id, ["a"]));
        assert!(!store.remove_tag(&note.id, "a"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.notes()[0].id, keep.id);
    }

    #[test]
    fn pinned_notes_sort_first() {
        let mut store = NoteStore::open(MemoryStorage::new());
        let groceries = store.create(Some("Groceries"), Some("<p>milk</p>"));
        store.toggle_pin(&groceries.id);
        store.create(Some("Plan"), None);

        assert_eq!(titles(&store.sorted_view()), vec!["Groceries", "Plan"]);
    }

    #[test]
    fn sorted_view_orders_groups_by_updated_desc() {
        let mut store = NoteStore::open(MemoryStorage::new());
        let a = store.create(Some("a"), None);
        let b = store.create(Some("b"), None);
        let c = store.create(Some("c"), None);
        store.create(Some("d"), None);
        store.toggle_pin(&a.id);
        store.toggle_pin(&c.id);
        store.update(&a.id, NotePatch::content("touched"));
        store.update(&b.id, NotePatch::content("touched"));

        let view = store.sorted_view();
        assert_eq!(titles(&view), vec!["a", "c", "b", "d"]);

        let pinned_end = view.iter().take_while(|note| note.is_pinned).count();
        assert!(view[pinned_end..].iter().all(|note| !note.is_pinned));
        for pair in view[..pinned_end].windows(2).chain(view[pinned_end..].windows(2)) {
            assert!(pair[0].updated_at >= pair[1].updated_at);
        }
    }

    #[test]
    fn add_tags_is_idempotent() {
        let mut store = NoteStore::open(MemoryStorage::new());
        let note = store.create(None, None);

        assert!(store.add_tags(&note.id, ["work"]));
        assert!(!store.add_tags(&note.id, ["work"]));
        assert!(!store.add_tags(&note.id, ["Work"]));
        assert_eq!(store.get(&note.id).expect("note").tags, vec!["work"]);

        assert!(store.remove_tag(&note.id, "work"));
        assert!(store.get(&note.id).expect("note").tags.is_empty());
    }

    #[test]
    fn toggle_pin_keeps_updated_at() {
        let mut store = NoteStore::open(MemoryStorage::new());
        let note = store.create(None, None);
        store.toggle_pin(&note.id);
        let pinned = store.get(&note.id).expect("note");
        assert!(pinned.is_pinned);
        assert_eq!(pinned.updated_at, note.updated_at);
    }

    #[test]
    fn tag_and_lock_changes_advance_updated_at() {
        let mut store = NoteStore::open(MemoryStorage::new());
        let note = store.create(None, None);

        store.add_tags(&note.id, ["work"]);
        let tagged = store.get(&note.id).expect("note").updated_at;
        assert!(tagged > note.updated_at);

        assert!(!store.add_tags(&note.id, ["WORK"]));
        assert_eq!(store.get(&note.id).expect("note").updated_at, tagged);

        store.set_lock(&note.id, true, Some("nl2.e30".into()));
        assert!(store.get(&note.id).expect("note").updated_at > tagged);
    }

    #[test]
    fn set_lock_swaps_content_only_when_given() {
        let mut store = NoteStore::open(MemoryStorage::new());
        let note = store.create(Some("Secret"), Some("<p>secret</p>"));
        let token = note_lock::lock("<p>secret</p>", "pw123").expect("lock");

        store.set_lock(&note.id, true, Some(token.clone()));
        let locked = store.get(&note.id).expect("note");
        assert!(locked.is_locked);
        assert_eq!(locked.content, token);
        assert_eq!(note_lock::unlock(&locked.content, "wrong"), None);
        assert_eq!(
            note_lock::unlock(&locked.content, "pw123").as_deref(),
            Some("<p>secret</p>")
        );

        store.set_lock(&note.id, false, None);
        let flag_only = store.get(&note.id).expect("note");
        assert!(!flag_only.is_locked);
        assert_eq!(flag_only.content, token);
    }

    #[test]
    fn mutations_persist_and_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = NoteStore::open(storage.clone());
        let note = store.create(Some("Persisted"), Some("<p>body</p>"));
        store.add_tags(&note.id, ["kept"]);
        store.toggle_pin(&note.id);

        let raw = storage.get(NOTES_KEY).expect("get").expect("stored");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert!(value["lastUpdated"].is_string());
        assert_eq!(value["notes"][0]["isPinned"], serde_json::json!(true));

        let reopened = NoteStore::open(storage);
        let loaded = reopened.get(&note.id).expect("reloaded");
        assert_eq!(loaded.title, "Persisted");
        assert_eq!(loaded.tags, vec!["kept"]);
        assert!(loaded.is_pinned);
    }

    #[test]
    fn sqlite_backed_store_survives_restart() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("notes.db");

        let id = {
            let mut store = NoteStore::open(SqliteStorage::open(&path).expect("open"));
            store.create(Some("Durable"), None).id
        };

        let store = NoteStore::open(SqliteStorage::open(&path).expect("reopen"));
        assert_eq!(store.get(&id).expect("note").title, "Durable");
    }

    #[test]
    fn malformed_or_absent_data_loads_empty() {
        let storage = Arc::new(MemoryStorage::new());
        assert!(NoteStore::open(storage.clone()).is_empty());

        storage.set(NOTES_KEY, "{not json").expect("set");
        assert!(NoteStore::open(storage.clone()).is_empty());

        storage
            .set(NOTES_KEY, r#"{"lastUpdated":"2024-01-01T00:00:00Z"}"#)
            .expect("set");
        assert!(NoteStore::open(storage).is_empty());

        assert!(NoteStore::open(BrokenStorage).is_empty());
    }

    #[test]
    fn loading_repairs_duplicates() {
        let storage = MemoryStorage::new();
        let raw = r#"{"notes":[
            {"id":"1","title":"first","content":"","createdAt":"2024-01-02T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z","tags":["a","A"]},
            {"id":"1","title":"dup","content":"","createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}
        ]}"#;
        storage.set(NOTES_KEY, raw).expect("set");

        let store = NoteStore::open(storage);
        assert_eq!(store.len(), 1);
        let note = &store.notes()[0];
        assert_eq!(note.title, "first");
        assert_eq!(note.tags, vec!["a"]);
        assert!(note.updated_at >= note.created_at);
    }

    #[test]
    fn write_failures_keep_memory_state() {
        let mut store = NoteStore::open(BrokenStorage);
        let note = store.create(Some("Unsaved"), None);
        assert!(store.has_unsaved_changes());
        assert!(store.update(&note.id, NotePatch::title("Still here")));
        assert_eq!(store.get(&note.id).expect("note").title, "Still here");
    }

    #[test]
    fn transient_read_error_does_not_overwrite_stored_notes() {
        let storage = seeded_flaky_storage(3);
        storage.fail_next_reads(1);

        let mut store = NoteStore::open(storage.clone());
        assert!(store.is_empty());
        assert!(store.is_load_pending());

        let note = store.create(Some("During outage"), None);
        assert!(!store.is_load_pending());
        assert!(!store.has_unsaved_changes());
        assert_eq!(store.len(), 4);
        assert_eq!(store.notes()[0].id, note.id);
        assert_eq!(storage.stored_count(), 4);
    }

    #[test]
    fn writes_are_held_back_while_reads_keep_failing() {
        let storage = seeded_flaky_storage(2);
        storage.fail_next_reads(usize::MAX);

        let mut store = NoteStore::open(storage.clone());
        let note = store.create(Some("Kept in memory"), None);
        assert!(store.has_unsaved_changes());
        assert!(store.is_load_pending());
        assert!(store.get(&note.id).is_some());

        storage.fail_next_reads(0);
        assert_eq!(storage.stored_count(), 2);
        assert!(store.reload());
        assert_eq!(store.len(), 3);

        store.update(&note.id, NotePatch::content("now saved"));
        assert!(!store.has_unsaved_changes());
        assert_eq!(storage.stored_count(), 3);
    }

    #[test]
    fn quota_failure_recovers_on_next_write() {
        let storage = Arc::new(MemoryStorage::with_quota(600));
        let mut store = NoteStore::open(storage.clone());
        let note = store.create(Some("small"), None);
        assert!(!store.has_unsaved_changes());

        store.update(&note.id, NotePatch::content("x".repeat(1_000)));
        assert!(store.has_unsaved_changes());

        store.update(&note.id, NotePatch::content("short"));
        assert!(!store.has_unsaved_changes());
        let reopened = NoteStore::open(storage);
        assert_eq!(reopened.get(&note.id).expect("note").content, "short");
    }

    #[test]
    fn search_matches_title_content_and_tags() {
        let mut store = NoteStore::open(MemoryStorage::new());
        store.create(Some("Groceries"), Some("<p>milk</p>"));
        let b = store.create(Some("Plan"), Some("<p>Trip to Lisbon</p>"));
        store.add_tags(&b.id, ["travel"]);

        assert_eq!(titles(&store.search("MILK")), vec!["Groceries"]);
        assert_eq!(titles(&store.search("lisbon")), vec!["Plan"]);
        assert_eq!(titles(&store.search("trav")), vec!["Plan"]);
        assert_eq!(store.search("").len(), 2);
        assert!(store.search("nothing").is_empty());
        assert_eq!(titles(&store.notes_with_tag("TRAVEL")), vec!["Plan"]);
    }

    #[test]
    fn export_then_import_into_empty_store() {
        let mut source = NoteStore::open(MemoryStorage::new());
        let note = source.create(Some("Exported"), Some("<p>x</p>"));
        source.add_tags(&note.id, ["one"]);
        let json = source.export_json().expect("export");

        let mut target = NoteStore::open(MemoryStorage::new());
        let report = target.import_json(&json).expect("import");
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(target.get(&note.id).expect("note").tags, vec!["one"]);

        let again = target.import_json(&json).expect("reimport");
        assert_eq!(again.imported, 0);
        assert_eq!(again.skipped, 1);
        assert_eq!(target.len(), 1);
    }

    #[test]
    fn clear_persists_empty_collection() {
        let storage = Arc::new(MemoryStorage::new());
        let mut store = NoteStore::open(storage.clone());
        store.create(None, None);
        store.clear();
        assert!(store.is_empty());
        assert!(NoteStore::open(storage).is_empty());
    }

    #[derive(Debug, Clone)]
    enum Step {
        Create,
        TogglePin(usize),
        Edit(usize),
        Tag(usize),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            Just(Step::Create),
            any::<usize>().prop_map(Step::TogglePin),
            any::<usize>().prop_map(Step::Edit),
            any::<usize>().prop_map(Step::Tag),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn sorted_view_is_pinned_then_most_recent(steps in prop::collection::vec(step(), 1..40)) {
            let mut store = NoteStore::open(MemoryStorage::new());
            for step in steps {
                let ids: Vec<NoteId> = store.notes().iter().map(|note| note.id.clone()).collect();
                let pick = |n: usize| ids.get(n % ids.len().max(1)).cloned();
                match step {
                    Step::Create => {
                        store.create(None, None);
                    }
                    Step::TogglePin(n) => {
                        if let Some(id) = pick(n) {
                            store.toggle_pin(&id);
                        }
                    }
                    Step::Edit(n) => {
                        if let Some(id) = pick(n) {
                            store.update(&id, NotePatch::content(format!("<p>{n}</p>")));
                        }
                    }
                    Step::Tag(n) => {
                        if let Some(id) = pick(n) {
                            store.add_tags(&id, [format!("t{}", n % 5)]);
                        }
                    }
                }
            }

            let view = store.sorted_view();
            prop_assert_eq!(view.len(), store.len());
            for pair in view.windows(2) {
                prop_assert!(pair[0].is_pinned >= pair[1].is_pinned);
                if pair[0].is_pinned == pair[1].is_pinned {
                    prop_assert!(pair[0].updated_at >= pair[1].updated_at);
                }
            }
        }
    }
}
