//! Client-held session state.
//!
//! A session is a string-keyed mapping of JSON-serializable values,
//! carried by the client in a signed cookie. It is opened lazily at
//! request entry and written back only when mutated. Without a
//! configured secret key the request gets a read-only null session and
//! every mutation fails with `SessionUnavailable`.

mod cookie;

pub use cookie::{SessionStore, SignedCookieStore};

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::HttpError;

/// Key controlling whether the outgoing cookie carries an expiry.
pub const PERMANENT_KEY: &str = "_permanent";

/// Per-visitor key-value state, mutation-tracked.
#[derive(Debug, Clone, Default)]
pub struct Session {
    data: BTreeMap<String, Value>,
    modified: bool,
    null: bool,
}

impl Session {
    /// Fresh, empty, writable session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session restored from a verified cookie payload.
    pub fn from_data(data: BTreeMap<String, Value>) -> Self {
        Self {
            data,
            modified: false,
            null: false,
        }
    }

    /// The read-only fallback used when no secret key is configured.
    pub fn null() -> Self {
        Self {
            data: BTreeMap::new(),
            modified: false,
            null: true,
        }
    }

    pub fn is_null(&self) -> bool {
        self.null
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> Result<(), HttpError> {
        self.check_writable()?;
        self.data.insert(key.to_string(), value.into());
        self.modified = true;
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<Value>, HttpError> {
        self.check_writable()?;
        let removed = self.data.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) -> Result<(), HttpError> {
        self.check_writable()?;
        if !self.data.is_empty() {
            self.data.clear();
            self.modified = true;
        }
        Ok(())
    }

    /// Whether this session outlives the browser session.
    pub fn permanent(&self) -> bool {
        self.data
            .get(PERMANENT_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_permanent(&mut self, permanent: bool) -> Result<(), HttpError> {
        self.insert(PERMANENT_KEY, Value::Bool(permanent))
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    fn check_writable(&self) -> Result<(), HttpError> {
        if self.null {
            return Err(HttpError::SessionUnavailable);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_marks_modified() {
        let mut session = Session::new();
        assert!(!session.is_modified());
        session.insert("user", "admin").unwrap();
        assert!(session.is_modified());
        assert_eq!(session.get_str("user"), Some("admin"));
    }

    #[test]
    fn test_restored_session_starts_unmodified() {
        let mut data = BTreeMap::new();
        data.insert("user".to_string(), Value::from("admin"));
        let session = Session::from_data(data);
        assert!(!session.is_modified());
        assert_eq!(session.get_str("user"), Some("admin"));
    }

    #[test]
    fn test_remove_missing_key_does_not_mark_modified() {
        let mut session = Session::new();
        assert!(session.remove("absent").unwrap().is_none());
        assert!(!session.is_modified());
    }

    #[test]
    fn test_null_session_rejects_mutation() {
        let mut session = Session::null();
        assert_eq!(
            session.insert("user", "admin").unwrap_err(),
            HttpError::SessionUnavailable
        );
        assert_eq!(session.clear().unwrap_err(), HttpError::SessionUnavailable);
        // Read access is still allowed
        assert!(session.get("user").is_none());
        assert!(!session.permanent());
    }

    #[test]
    fn test_permanent_flag() {
        let mut session = Session::new();
        assert!(!session.permanent());
        session.set_permanent(true).unwrap();
        assert!(session.permanent());
        assert!(session.is_modified());
    }
}
