mod preferences;
mod query;
mod session;
mod store;
mod transfer;

pub use preferences::{load_preferences, save_preferences};
pub use query::{NoteStats, matches_query, sort_notes, tag_counts};
pub use session::{NoteSession, NoteView, STARTER_CONTENT, SessionError, Selection};
pub use store::NoteStore;
pub use transfer::{ImportError, ImportReport, parse_import};
