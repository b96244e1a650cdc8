//! Password gate for note content.
//!
//! This is obfuscation, not encryption: the password travels inside the
//! token and anyone holding the token can read both. It only keeps content
//! off the screen until the matching password is typed.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

const TOKEN_PREFIX: &str = "nl2.";
const TOKEN_VERSION: u32 = 2;
const LEGACY_SEPARATOR: &str = "::SEPARATOR::";

pub const DEFAULT_MIN_PASSWORD_LEN: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("password is required")]
    PasswordRequired,

    #[error("password must be at least {min} characters long")]
    PasswordTooShort { min: usize },

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("failed to encode locked content: {0}")]
    Encode(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct LockedRecord {
    v: u32,
    content: String,
    password: String,
}

/// Encodes `content` together with `password` into an opaque token.
pub fn lock(content: &str, password: &str) -> Result<String, LockError> {
    let record = LockedRecord {
        v: TOKEN_VERSION,
        content: content.to_owned(),
        password: password.to_owned(),
    };
    let bytes = serde_json::to_vec(&record).map_err(|e| LockError::Encode(e.to_string()))?;
    Ok(format!("{TOKEN_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes)))
}

/// Returns the embedded content when `password` matches exactly.
///
/// Corrupt tokens and wrong passwords both yield `None`.
pub fn unlock(token: &str, password: &str) -> Option<String> {
    let (content, embedded) = match token.strip_prefix(TOKEN_PREFIX) {
        Some(body) => decode_record(body)?,
        None => decode_legacy(token)?,
    };
    (embedded == password).then_some(content)
}

/// True when `token` has the shape of a lock token. Says nothing about the
/// password.
pub fn is_token(token: &str) -> bool {
    match token.strip_prefix(TOKEN_PREFIX) {
        Some(body) => decode_record(body).is_some(),
        None => decode_legacy(token).is_some(),
    }
}

fn decode_record(body: &str) -> Option<(String, String)> {
    let bytes = URL_SAFE_NO_PAD
        .decode(body)
        .map_err(|err| debug!(error = %err, "lock token is not base64"))
        .ok()?;
    let record: LockedRecord = serde_json::from_slice(&bytes)
        .map_err(|err| debug!(error = %err, "lock token payload is malformed"))
        .ok()?;
    if record.v != TOKEN_VERSION {
        debug!(version = record.v, "unsupported lock token version");
        return None;
    }
    Some((record.content, record.password))
}

/// Tokens written before structured framing: base64 of the URI-encoded
/// `content::SEPARATOR::password`. Content that itself contained the
/// separator was never recoverable from these and still is not.
fn decode_legacy(token: &str) -> Option<(String, String)> {
    let bytes = BASE64.decode(token.trim()).ok()?;
    let encoded = String::from_utf8(bytes).ok()?;
    let joined = urlencoding::decode(&encoded).ok()?;
    let mut parts = joined.split(LEGACY_SEPARATOR);
    let content = parts.next()?.to_owned();
    let password = parts.next()?.to_owned();
    Some((content, password))
}

/// Policy applied before unlocking.
pub fn validate_password(password: &str, min_len: usize) -> Result<(), LockError> {
    if password.is_empty() {
        return Err(LockError::PasswordRequired);
    }
    if password.chars().count() < min_len {
        return Err(LockError::PasswordTooShort { min: min_len });
    }
    Ok(())
}

/// Policy applied when a note is locked: length plus confirmation.
pub fn validate_new_password(password: &str, confirm: &str, min_len: usize) -> Result<(), LockError> {
    validate_password(password, min_len)?;
    if password != confirm {
        return Err(LockError::PasswordMismatch);
    }
    Ok(())
}
