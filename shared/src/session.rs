//! Session persistence of the in-progress document
//!
//! The host provides a string key/value store; this module owns the parse,
//! validate and write steps around it so the rest of the crate only ever sees
//! a well-formed [`Document`].

use std::collections::HashMap;

use crate::error::{SessionError, StaleReason};
use crate::models::Document;
use crate::types::WizardKind;

/// String blob storage scoped to the current user session
pub trait SessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&mut self, key: &str) -> Result<(), SessionError>;
}

/// In-memory store, used by tests and hosts without session storage
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    entries: HashMap<String, String>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// How a wizard's document was obtained on open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A valid document of the same user was resumed
    Resumed,
    /// Nothing was stored; a new document was created
    Created,
    /// The stored blob was stale and has been discarded; notify the user
    Reinitialized(StaleReason),
}

/// Parse and validate the stored document of `kind` for `username`
pub fn load_document<S: SessionStore + ?Sized>(
    store: &S,
    kind: WizardKind,
    username: &str,
) -> Result<Document, SessionError> {
    let blob = store
        .get(kind.storage_key())?
        .ok_or(SessionError::Stale(StaleReason::Missing))?;

    let value: serde_json::Value = serde_json::from_str(&blob)
        .map_err(|e| SessionError::Stale(StaleReason::Malformed(e.to_string())))?;
    let document = Document::from_value(kind, value).map_err(SessionError::Stale)?;

    if document.username != username {
        return Err(SessionError::Stale(StaleReason::ForeignUser {
            expected: username.to_string(),
            found: document.username,
        }));
    }
    Ok(document)
}

/// Serialize the document and write it under the wizard's key
///
/// Returns the written JSON.
pub fn save_document<S: SessionStore + ?Sized>(
    store: &mut S,
    kind: WizardKind,
    document: &Document,
) -> Result<String, SessionError> {
    let blob = serde_json::to_string(&document.to_value(kind)?)?;
    store.set(kind.storage_key(), &blob)?;
    Ok(blob)
}

pub fn discard_document<S: SessionStore + ?Sized>(
    store: &mut S,
    kind: WizardKind,
) -> Result<(), SessionError> {
    store.remove(kind.storage_key())
}

/// Resume the stored document, or start a fresh one when there is none or it
/// is stale
pub fn load_or_init<S: SessionStore + ?Sized>(
    store: &mut S,
    kind: WizardKind,
    username: &str,
) -> Result<(Document, LoadOutcome), SessionError> {
    if username.trim().is_empty() {
        return Err(SessionError::MissingUsername);
    }
    match load_document(store, kind, username) {
        Ok(document) => {
            tracing::debug!("Resumed {} document for {}", kind, username);
            Ok((document, LoadOutcome::Resumed))
        }
        Err(SessionError::Stale(StaleReason::Missing)) => {
            Ok((Document::new(username), LoadOutcome::Created))
        }
        Err(SessionError::Stale(reason)) => {
            tracing::warn!("Discarding stale {} document: {}", kind, reason);
            discard_document(store, kind)?;
            Ok((Document::new(username), LoadOutcome::Reinitialized(reason)))
        }
        Err(err) => Err(err),
    }
}
