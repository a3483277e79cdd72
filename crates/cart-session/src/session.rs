//! Session handle with typed JSON values.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::trace;

use crate::{KeyValueStore, SessionError};

/// A unique session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Create a new session ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new cryptographically secure session ID.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; 18] = rand::thread_rng().gen();
        Self(format!("sess_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Get the session ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The state of one user session.
///
/// Every key is scoped to the session ID before it reaches the backing
/// store, so several sessions can share one store without colliding.
///
/// # Example
///
/// ```rust,ignore
/// use cart_session::{MemoryStore, Session, SessionId};
///
/// let session = Session::new(SessionId::from("abc123"), MemoryStore::new());
/// session.put("cart._instance", &"cart.default")?;
/// let instance: Option<String> = session.get("cart._instance")?;
/// ```
pub struct Session {
    id: SessionId,
    store: Box<dyn KeyValueStore>,
}

impl Session {
    /// Create a session handle over a store.
    pub fn new(id: SessionId, store: impl KeyValueStore + 'static) -> Self {
        Self {
            id,
            store: Box::new(store),
        }
    }

    /// The session this handle addresses.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Get a value, or `None` if the key is not set.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SessionError> {
        match self.store.get(&self.scoped_key(key))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Store a value, replacing the previous one.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SessionError> {
        let bytes = serde_json::to_vec(value)?;
        trace!(session = %self.id, key, len = bytes.len(), "session put");
        self.store.set(&self.scoped_key(key), &bytes)
    }

    /// Check whether a key is set.
    pub fn has(&self, key: &str) -> Result<bool, SessionError> {
        self.store.exists(&self.scoped_key(key))
    }

    /// Remove a key.
    pub fn remove(&self, key: &str) -> Result<(), SessionError> {
        trace!(session = %self.id, key, "session remove");
        self.store.delete(&self.scoped_key(key))
    }

    /// List this session's keys that start with `prefix`.
    ///
    /// Returned keys are unscoped, ready to pass back to [`Session::get`].
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, SessionError> {
        let scope = self.scoped_key("");
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter_map(|k| k.strip_prefix(&scope).map(str::to_string))
            .filter(|k| k.starts_with(prefix))
            .collect())
    }

    fn scoped_key(&self, key: &str) -> String {
        format!("session:{}:{}", self.id, key)
    }
}
