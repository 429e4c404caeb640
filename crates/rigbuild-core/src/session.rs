//! Session context shared by every part of the workflow.
//!
//! The storefront kept the build, customer and token identifiers in browser
//! local storage and read them ad hoc. Here they live behind [`Session`],
//! which callers receive explicitly. Each accessor goes back to the store,
//! so two processes sharing a [`FileStore`] observe each other's writes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::{BuildId, CustomerId, StoreError};

/// Everything the client persists between runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pc_assembly_id: Option<BuildId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_token: Option<String>,
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<SessionData, StoreError>;
    fn save(&self, data: &SessionData) -> Result<(), StoreError>;
}

/// JSON file store (`session.json` in the data directory).
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Result<SessionData, StoreError> {
        if !self.path.exists() {
            return Ok(SessionData::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(SessionData::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, data: &SessionData) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(data)?;
        crate::write_atomic(&self.path, &json)
    }
}

#[derive(Default)]
pub struct MemoryStore(Mutex<SessionData>);

impl MemoryStore {
    pub fn new(data: SessionData) -> Self {
        Self(Mutex::new(data))
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<SessionData, StoreError> {
        self.0
            .lock()
            .map(|d| d.clone())
            .map_err(|_| StoreError::Poisoned)
    }

    fn save(&self, data: &SessionData) -> Result<(), StoreError> {
        let mut guard = self.0.lock().map_err(|_| StoreError::Poisoned)?;
        *guard = data.clone();
        Ok(())
    }
}

/// Typed handle over a [`SessionStore`]. Cheap to clone.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn in_memory(data: SessionData) -> Self {
        Self::new(Arc::new(MemoryStore::new(data)))
    }

    pub fn customer_id(&self) -> Result<Option<CustomerId>, StoreError> {
        Ok(self.store.load()?.customer_id)
    }

    pub fn build_id(&self) -> Result<Option<BuildId>, StoreError> {
        Ok(self.store.load()?.pc_assembly_id)
    }

    pub fn token(&self) -> Result<Option<String>, StoreError> {
        Ok(self.store.load()?.user_token)
    }

    pub fn set_build_id(&self, id: BuildId) -> Result<(), StoreError> {
        self.update(|d| d.pc_assembly_id = Some(id))
    }

    /// Record a login. A build id handed out by the login response is cached too.
    pub fn sign_in(
        &self,
        customer_id: CustomerId,
        token: Option<String>,
        build_id: Option<BuildId>,
    ) -> Result<(), StoreError> {
        self.update(|d| {
            d.customer_id = Some(customer_id);
            d.user_token = token;
            if build_id.is_some() {
                d.pc_assembly_id = build_id;
            }
        })
    }

    /// Forget everything. The only place the cached build id is cleared.
    pub fn logout(&self) -> Result<(), StoreError> {
        self.store.save(&SessionData::default())
    }

    fn update(&self, f: impl FnOnce(&mut SessionData)) -> Result<(), StoreError> {
        let mut data = self.store.load()?;
        f(&mut data);
        self.store.save(&data)
    }
}
