//! Session store backed by the browser's `window.sessionStorage`

use stock_wizard_shared::{SessionError, SessionStore};
use wasm_bindgen::JsValue;
use web_sys::Storage;

fn storage_error(err: JsValue) -> SessionError {
    SessionError::Storage(
        err.as_string()
            .unwrap_or_else(|| "session storage unavailable".to_string()),
    )
}

/// Wraps the tab-scoped session storage of the current window
pub struct BrowserSessionStore {
    storage: Storage,
}

impl BrowserSessionStore {
    /// Session storage of the current window
    pub fn from_window() -> Result<Self, SessionError> {
        let window = web_sys::window()
            .ok_or_else(|| SessionError::Storage("no window".to_string()))?;
        let storage = window
            .session_storage()
            .map_err(storage_error)?
            .ok_or_else(|| SessionError::Storage("session storage disabled".to_string()))?;
        Ok(Self { storage })
    }
}

impl SessionStore for BrowserSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        self.storage.get_item(key).map_err(storage_error)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SessionError> {
        self.storage.set_item(key, value).map_err(storage_error)
    }

    fn remove(&mut self, key: &str) -> Result<(), SessionError> {
        self.storage.remove_item(key).map_err(storage_error)
    }
}
