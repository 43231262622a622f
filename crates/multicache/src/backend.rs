//! Backend identifiers and the registry that validates and dispatches them

use std::{fmt, str::FromStr, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    storage::{MemoryStorage, SessionStorage, StorageArea},
    CacheError, Result,
};

/// Known backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Durable storage
    #[serde(rename = "localStorage")]
    Local,
    /// Session-lifetime storage
    #[serde(rename = "sessionStorage")]
    Session,
    /// Process-lifetime in-memory storage
    #[serde(rename = "memoryStorage")]
    Memory,
    /// Virtual read-only backend backed by the page query string
    #[serde(rename = "urlSearch")]
    UrlSearch,
}

impl BackendKind {
    /// Backends accepted by write operations
    pub const WRITABLE: [BackendKind; 3] =
        [BackendKind::Local, BackendKind::Session, BackendKind::Memory];

    /// Backends accepted by read operations
    pub const READABLE: [BackendKind; 4] = [
        BackendKind::Local,
        BackendKind::Session,
        BackendKind::Memory,
        BackendKind::UrlSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "localStorage",
            BackendKind::Session => "sessionStorage",
            BackendKind::Memory => "memoryStorage",
            BackendKind::UrlSearch => "urlSearch",
        }
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, BackendKind::UrlSearch)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        BackendKind::READABLE
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// Unvalidated backend identifier as supplied by a caller
///
/// Identifiers stay plain strings until an operation validates them against
/// the accepted read or write set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackendId(String);

impl BackendId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BackendId {
    fn default() -> Self {
        BackendKind::Session.into()
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<BackendKind> for BackendId {
    fn from(kind: BackendKind) -> Self {
        Self(kind.as_str().to_string())
    }
}

impl From<&str> for BackendId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BackendId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The storage areas a facade dispatches to
#[derive(Clone)]
pub struct StorageBackends {
    pub local: Arc<dyn StorageArea>,
    pub session: Arc<dyn StorageArea>,
    pub memory: Arc<MemoryStorage>,
}

impl StorageBackends {
    pub fn new(
        local: Arc<dyn StorageArea>,
        session: Arc<dyn StorageArea>,
        memory: Arc<MemoryStorage>,
    ) -> Self {
        Self {
            local,
            session,
            memory,
        }
    }

    /// Volatile backends only, sharing the given memory store
    ///
    /// The durable slot is a second in-memory store, which is what tests and
    /// ephemeral pages want.
    pub fn ephemeral(memory: Arc<MemoryStorage>) -> Self {
        Self {
            local: Arc::new(MemoryStorage::new()),
            session: Arc::new(SessionStorage::new()),
            memory,
        }
    }
}

impl fmt::Debug for StorageBackends {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageBackends")
            .field("memory_entries", &self.memory.len())
            .finish_non_exhaustive()
    }
}

/// Validates backend identifiers and maps them to storage areas
#[derive(Debug, Clone)]
pub struct BackendRegistry {
    backends: StorageBackends,
}

impl BackendRegistry {
    pub fn new(backends: StorageBackends) -> Self {
        Self { backends }
    }

    /// Identifiers accepted by write operations
    pub fn write_ids() -> Vec<&'static str> {
        BackendKind::WRITABLE.iter().map(BackendKind::as_str).collect()
    }

    /// Identifiers accepted by read operations
    pub fn read_ids() -> Vec<&'static str> {
        BackendKind::READABLE.iter().map(BackendKind::as_str).collect()
    }

    pub fn is_valid_for_write(id: &str) -> bool {
        id.parse::<BackendKind>()
            .map(|kind| kind.is_writable())
            .unwrap_or(false)
    }

    pub fn is_valid_for_read(id: &str) -> bool {
        id.parse::<BackendKind>().is_ok()
    }

    /// Validate an identifier for a write operation
    pub fn check_for_write(id: &BackendId) -> Result<BackendKind> {
        match id.as_str().parse::<BackendKind>() {
            Ok(kind) if kind.is_writable() => Ok(kind),
            _ => Err(CacheError::invalid_backend(
                "setItem",
                id.as_str(),
                &Self::write_ids(),
            )),
        }
    }

    /// Validate an identifier for a read operation
    pub fn check_for_read(id: &BackendId) -> Result<BackendKind> {
        id.as_str().parse::<BackendKind>().map_err(|_| {
            CacheError::invalid_backend("getItem", id.as_str(), &Self::read_ids())
        })
    }

    /// Storage area for a writable kind; `None` for the virtual URL backend
    pub fn area(&self, kind: BackendKind) -> Option<&dyn StorageArea> {
        match kind {
            BackendKind::Local => Some(self.backends.local.as_ref()),
            BackendKind::Session => Some(self.backends.session.as_ref()),
            BackendKind::Memory => Some(self.backends.memory.as_ref() as &dyn StorageArea),
            BackendKind::UrlSearch => None,
        }
    }

    pub fn backends(&self) -> &StorageBackends {
        &self.backends
    }
}
