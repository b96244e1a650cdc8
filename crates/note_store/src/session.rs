use std::collections::HashMap;

use core_types::{DEFAULT_NOTE_TITLE, Note, NoteId, NotePatch};
use note_lock::{DEFAULT_MIN_PASSWORD_LEN, LockError};
use note_storage::KeyValueStorage;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::store::NoteStore;

pub const STARTER_CONTENT: &str = "<p>Start writing...</p>";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no note is selected")]
    NoSelection,

    #[error("note {0} not found")]
    NotFound(NoteId),

    #[error("note is locked")]
    Locked,

    #[error("note is already locked")]
    AlreadyLocked,

    #[error("incorrect password")]
    IncorrectPassword,

    #[error("locked note {0} does not hold a lock token")]
    DamagedLock(NoteId),

    #[error(transparent)]
    Lock(#[from] LockError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Opened,
    PasswordRequired,
    Missing,
}

/// What a front end may show for the selected note.
#[derive(Debug, Clone, Copy)]
pub struct NoteView<'a> {
    pub note: &'a Note,
    /// `None` while the note is locked and has not been unlocked in this
    /// session.
    pub content: Option<&'a str>,
}

impl NoteView<'_> {
    pub fn is_gated(&self) -> bool {
        self.content.is_none()
    }
}

struct Revealed {
    token: String,
    content: String,
}

/// Interactive state layered over a [`NoteStore`]: the selected note and
/// notes unlocked during this session.
///
/// Only the selected id is kept; the note itself is always read back from
/// the store. Unlocked content is tied to the token it was decoded from, so
/// a note locked again with a new token is gated again.
pub struct NoteSession<S> {
    store: NoteStore<S>,
    selected: Option<NoteId>,
    revealed: HashMap<NoteId, Revealed>,
    min_password_len: usize,
}

impl<S: KeyValueStorage> NoteSession<S> {
    pub fn new(store: NoteStore<S>) -> Self {
        Self {
            store,
            selected: None,
            revealed: HashMap::new(),
            min_password_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }

    pub fn with_min_password_len(mut self, min_password_len: usize) -> Self {
        self.min_password_len = min_password_len;
        self
    }

    pub fn store(&self) -> &NoteStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut NoteStore<S> {
        &mut self.store
    }

    pub fn selected_id(&self) -> Option<&NoteId> {
        self.selected.as_ref()
    }

    pub fn create_note(&mut self) -> NoteId {
        let note = self
            .store
            .create(Some(DEFAULT_NOTE_TITLE), Some(STARTER_CONTENT));
        self.selected = Some(note.id.clone());
        note.id
    }

    pub fn select(&mut self, id: &NoteId) -> Selection {
        let Some(note) = self.store.get(id) else {
            return Selection::Missing;
        };
        if note.is_locked && self.revealed_content(note).is_none() {
            return Selection::PasswordRequired;
        }
        self.selected = Some(id.clone());
        Selection::Opened
    }

    /// Selects the first note of the sorted view, if any.
    pub fn select_first(&mut self) -> Selection {
        let Some(id) = self.store.sorted_view().first().map(|note| note.id.clone()) else {
            return Selection::Missing;
        };
        self.select(&id)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// The selected note as it currently exists in the store.
    pub fn current(&self) -> Option<NoteView<'_>> {
        let note = self.store.get(self.selected.as_ref()?)?;
        Some(self.view(note))
    }

    pub fn view<'a>(&'a self, note: &'a Note) -> NoteView<'a> {
        let content = if note.is_locked {
            self.revealed_content(note)
        } else {
            Some(note.content.as_str())
        };
        NoteView { note, content }
    }

    pub fn edit_title(&mut self, title: impl Into<String>) -> Result<bool, SessionError> {
        let id = self.ungated_selection()?;
        Ok(self.store.update(&id, NotePatch::title(title)))
    }

    /// Content edits are refused while the note carries a lock, even if it
    /// was unlocked for viewing.
    pub fn edit_content(&mut self, content: impl Into<String>) -> Result<bool, SessionError> {
        let id = self.editable_selection()?;
        Ok(self.store.update(&id, NotePatch::content(content)))
    }

    pub fn add_tags<I, T>(&mut self, tags: I) -> Result<bool, SessionError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let id = self.ungated_selection()?;
        Ok(self.store.add_tags(&id, tags))
    }

    pub fn remove_tag(&mut self, tag: &str) -> Result<bool, SessionError> {
        let id = self.ungated_selection()?;
        Ok(self.store.remove_tag(&id, tag))
    }

    /// Locks `id` behind `password` after checking the password policy.
    pub fn lock(&mut self, id: &NoteId, password: &str, confirm: &str) -> Result<(), SessionError> {
        note_lock::validate_new_password(password, confirm, self.min_password_len)?;
        let note = self
            .store
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        if note.is_locked {
            return Err(SessionError::AlreadyLocked);
        }
        let token = note_lock::lock(&note.content, password)?;
        self.store.set_lock(id, true, Some(token));
        self.revealed.remove(id);
        info!(id = %id, "note locked");
        Ok(())
    }

    /// Reveals a locked note for the rest of the session and selects it.
    /// The stored note keeps its lock.
    pub fn unlock(&mut self, id: &NoteId, password: &str) -> Result<(), SessionError> {
        let (token, content) = self.decode(id, password)?;
        if let Some(content) = content {
            self.revealed.insert(id.clone(), Revealed { token, content });
        }
        self.selected = Some(id.clone());
        Ok(())
    }

    /// Removes the lock for good, storing the plain content again.
    pub fn remove_lock(&mut self, id: &NoteId, password: &str) -> Result<(), SessionError> {
        let (_, content) = self.decode(id, password)?;
        if let Some(content) = content {
            self.store.set_lock(id, false, Some(content));
            self.revealed.remove(id);
            info!(id = %id, "note lock removed");
        }
        Ok(())
    }

    /// Locked content for `id`, or `None` when the note is not locked.
    fn decode(&self, id: &NoteId, password: &str) -> Result<(String, Option<String>), SessionError> {
        note_lock::validate_password(password, 1)?;
        let note = self
            .store
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;
        if !note.is_locked {
            return Ok((String::new(), None));
        }
        if !note_lock::is_token(&note.content) {
            warn!(id = %id, "locked note content is not a lock token");
            return Err(SessionError::DamagedLock(id.clone()));
        }
        match note_lock::unlock(&note.content, password) {
            Some(content) => Ok((note.content.clone(), Some(content))),
            None => {
                debug!(id = %id, "unlock rejected");
                Err(SessionError::IncorrectPassword)
            }
        }
    }

    fn revealed_content<'a>(&'a self, note: &Note) -> Option<&'a str> {
        self.revealed
            .get(&note.id)
            .filter(|revealed| revealed.token == note.content)
            .map(|revealed| revealed.content.as_str())
    }

    fn selected_note(&self) -> Result<&Note, SessionError> {
        let id = self.selected.as_ref().ok_or(SessionError::NoSelection)?;
        self.store
            .get(id)
            .ok_or_else(|| SessionError::NotFound(id.clone()))
    }

    fn ungated_selection(&self) -> Result<NoteId, SessionError> {
        let note = self.selected_note()?;
        if self.view(note).is_gated() {
            return Err(SessionError::Locked);
        }
        Ok(note.id.clone())
    }

    fn editable_selection(&self) -> Result<NoteId, SessionError> {
        let note = self.selected_note()?;
        if note.is_locked {
            return Err(SessionError::Locked);
        }
        Ok(note.id.clone())
    }
}
