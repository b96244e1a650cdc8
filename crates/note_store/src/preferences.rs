use core_types::{PREFERENCES_KEY, Preferences};
use note_storage::{KeyValueStorage, StorageError};
use tracing::warn;

/// Stored preferences, or the defaults when nothing usable is stored.
pub fn load_preferences(storage: &impl KeyValueStorage) -> Preferences {
    match storage.get(PREFERENCES_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!(key = PREFERENCES_KEY, error = %err, "stored preferences are malformed");
            Preferences::default()
        }),
        Ok(None) => Preferences::default(),
        Err(err) => {
            warn!(key = PREFERENCES_KEY, error = %err, "failed to read preferences");
            Preferences::default()
        }
    }
}

pub fn save_preferences(
    storage: &impl KeyValueStorage,
    preferences: &Preferences,
) -> Result<(), StorageError> {
    let text = serde_json::to_string(preferences).map_err(|err| StorageError::Encode {
        key: PREFERENCES_KEY.to_owned(),
        message: err.to_string(),
    })?;
    storage.set(PREFERENCES_KEY, &text)
}
