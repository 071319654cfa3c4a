use std::collections::HashMap;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::api::ProfileApi;
use super::{ClientError, ClientResult};
use crate::dto::user_dto::UserResponse;

/// Storage key the session is persisted under.
pub const AUTH_STORAGE_KEY: &str = "auth-storage";

/// Key/value persistence for the session, in the manner of browser local
/// storage.
pub trait SessionStorage: Send + Sync {
    fn load(&self, key: &str) -> io::Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// One `<key>.json` file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SessionStorage for FileStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-process storage. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStorage for MemoryStorage {
    fn load(&self, key: &str) -> io::Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> io::Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user: Option<UserResponse>,
    pub token: Option<String>,
    pub is_authenticated: bool,
}

#[derive(Serialize, Deserialize)]
struct Persisted {
    state: SessionState,
    version: u32,
}

/// The client's authentication state.
///
/// Every mutation is computed in full, written to storage, and only then
/// committed, so a failed write or merge leaves the current state as it was.
pub struct SessionStore {
    state: SessionState,
    storage: Box<dyn SessionStorage>,
}

impl SessionStore {
    /// Restores the persisted session, if any. A corrupt copy is discarded.
    pub fn open(storage: impl SessionStorage + 'static) -> Self {
        let state = match storage.load(AUTH_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Persisted>(&raw) {
                Ok(persisted) => persisted.state,
                Err(e) => {
                    tracing::warn!("Discarding unreadable persisted session: {}", e);
                    SessionState::default()
                }
            },
            Ok(None) => SessionState::default(),
            Err(e) => {
                tracing::warn!("Failed to read persisted session: {}", e);
                SessionState::default()
            }
        };
        Self {
            state,
            storage: Box::new(storage),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&UserResponse> {
        self.state.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated
    }

    pub fn login(&mut self, user: UserResponse, token: impl Into<String>) -> ClientResult<()> {
        self.commit(SessionState {
            user: Some(user),
            token: Some(token.into()),
            is_authenticated: true,
        })
    }

    pub fn logout(&mut self) -> ClientResult<()> {
        self.state = SessionState::default();
        self.storage.remove(AUTH_STORAGE_KEY)?;
        Ok(())
    }

    /// Shallow-merges the top-level fields of `patch` into the current user.
    pub fn update_user<P: Serialize + ?Sized>(&mut self, patch: &P) -> ClientResult<()> {
        let user = self.merged(serde_json::to_value(patch)?)?;
        let next = SessionState {
            user: Some(user),
            ..self.state.clone()
        };
        self.commit(next)
    }

    /// Fetches the authoritative user, merges it into the session and
    /// returns it. On any failure the session is left unchanged.
    pub async fn refresh_user<A>(&mut self, api: &A) -> ClientResult<UserResponse>
    where
        A: ProfileApi + ?Sized,
    {
        let fetched = match api.current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!("Failed to refresh user: {}", e);
                return Err(e);
            }
        };
        self.update_user(&fetched)?;
        Ok(fetched)
    }

    fn merged(&self, patch: Value) -> ClientResult<UserResponse> {
        let Value::Object(patch) = patch else {
            return Err(ClientError::Validation(
                "User update must be an object".to_string(),
            ));
        };
        let mut base = match &self.state.user {
            Some(user) => match serde_json::to_value(user)? {
                Value::Object(map) => map,
                _ => Map::new(),
            },
            None => Map::new(),
        };
        for (key, value) in patch {
            base.insert(key, value);
        }
        Ok(serde_json::from_value(Value::Object(base))?)
    }

    fn commit(&mut self, next: SessionState) -> ClientResult<()> {
        let raw = serde_json::to_string(&Persisted {
            state: next.clone(),
            version: 0,
        })?;
        self.storage.save(AUTH_STORAGE_KEY, &raw)?;
        self.state = next;
        Ok(())
    }
}
