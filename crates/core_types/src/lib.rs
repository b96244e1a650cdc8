pub mod note;
pub mod preferences;
pub mod text;

pub use note::{
    DEFAULT_NOTE_TITLE, NOTES_KEY, Note, NoteId, NotePatch, NotesSnapshot, contains_tag,
    next_timestamp,
};
pub use preferences::{PREFERENCES_KEY, Preferences, SortBy, Theme, ViewMode};
pub use text::{preview, strip_html};
