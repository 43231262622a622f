//! # multicache
//!
//! Scoped, namespaced key-value caching over page storage backends, with
//! optional mirroring of cached values into the page URL query string.
//!
//! ## Features
//!
//! - **Scopes**: `"page/subpath"` scopes map every page to one bucket and fold
//!   the subpath into the item key; the `global` scope is flat
//! - **Namespaces**: several facades share backends without collisions
//! - **Backends**: durable (disk), session and a shared in-memory store, plus
//!   the read-only `urlSearch` pseudo-backend
//! - **Strict mode**: reject scopes and global keys missing from a template
//! - **Fallback reads**: try several backends in order with a default
//!
//! ```ignore
//! use multicache::{BackendKind, Cache, GetOptions, MemoryStorage, SetOptions, StorageBackends};
//!
//! let memory = MemoryStorage::shared();
//! let cache = Cache::builder()
//!     .namespace("shop")
//!     .backends(StorageBackends::ephemeral(memory))
//!     .build()?;
//!
//! cache.set_item("city", "beijing", &SetOptions::new().scope("home/hotel"))?;
//! let city = cache.get_item(
//!     "city",
//!     &GetOptions::new()
//!         .scope("home/hotel")
//!         .chain([BackendKind::Memory, BackendKind::Session]),
//! )?;
//! ```

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod location;
pub mod options;
pub mod scope;
pub mod storage;
pub mod strict;

pub use backend::{BackendId, BackendKind, BackendRegistry, StorageBackends};
pub use cache::{Bucket, Cache, CacheBuilder, DEFAULT_PAGE, NAMESPACE_PREFIX};
pub use config::{CacheConfig, EnvOverrides};
pub use error::CacheError;
pub use location::{HistoryEntry, PageLocation};
pub use options::{
    BackendSelector, DefaultValue, ErrorCallback, GetOptions, LookupTarget, ScopeOptions,
    SetOptions, UrlSearchSource,
};
pub use scope::{resolve, ResolvedKey, GLOBAL_PAGE};
pub use storage::{DiskStorage, MemoryStorage, SessionStorage, StorageArea};
pub use strict::Template;

/// Re-export commonly used types
pub type Result<T> = std::result::Result<T, CacheError>;
