//! Scoped cache facade
//!
//! A [`Cache`] turns a logical `(scope, key)` into a bucket in one of the
//! storage backends. Each page of a namespace owns one bucket, a JSON object
//! stored under `"$zMultiCachePrefix$-<namespace>-<page>"`, and every item of
//! that page lives inside it.

use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::{
    backend::{BackendId, BackendKind, BackendRegistry, StorageBackends},
    config::CacheConfig,
    location::PageLocation,
    options::{BackendSelector, ErrorCallback, GetOptions, ScopeOptions, SetOptions, UrlSearchSource},
    scope::ResolvedKey,
    storage::StorageArea,
    strict::{self, Template},
    CacheError, Result,
};

/// Fixed prefix of every bucket key
pub const NAMESPACE_PREFIX: &str = "$zMultiCachePrefix$";

/// Page used when a scope names no page
pub const DEFAULT_PAGE: &str = "$page$";

/// Contents of one page bucket
pub type Bucket = Map<String, Value>;

/// Scoped, namespaced cache over several storage backends
#[derive(Debug, Clone)]
pub struct Cache {
    config: CacheConfig,
    template: Template,
    registry: BackendRegistry,
    location: PageLocation,
}

impl Cache {
    /// Create a cache from a configuration
    ///
    /// Fails when strict mode is enabled without a template or the scope
    /// separator is empty.
    pub fn new(config: CacheConfig, backends: StorageBackends, location: PageLocation) -> Result<Self> {
        config.validate()?;
        info!(
            namespace = %config.namespace,
            strict = config.strict,
            "Cache facade created"
        );
        Ok(Self {
            template: config.template.clone().unwrap_or_default(),
            config,
            registry: BackendRegistry::new(backends),
            location,
        })
    }

    /// Start building a facade
    pub fn builder() -> CacheBuilder {
        CacheBuilder::new()
    }

    /// Get cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Page location whose query string mirrors cached values
    pub fn location(&self) -> &PageLocation {
        &self.location
    }

    /// Storage areas behind the writable backend identifiers
    pub fn backends(&self) -> &StorageBackends {
        self.registry.backends()
    }

    /// Backend identifiers accepted by `get_item`
    pub fn types(&self) -> Vec<&'static str> {
        BackendRegistry::read_ids()
    }

    /// Physical key of the bucket holding `page`
    pub fn bucket_key(&self, page: &str) -> String {
        format!("{}-{}-{}", NAMESPACE_PREFIX, self.config.namespace, page)
    }

    /// Store a value
    ///
    /// Invalid backends, scopes and strict-mode violations are returned.
    /// Failures to encode or persist the bucket go to `opts.on_error` instead.
    pub fn set_item<T>(&self, key: &str, value: &T, opts: &SetOptions) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let kind = BackendRegistry::check_for_write(&opts.backend)?;
        let resolved = self.resolve(&opts.scope, key)?;
        let page = resolved.page_or(DEFAULT_PAGE);
        strict::check(self.config.strict, &self.template, page, &resolved.item_key)?;

        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                report(opts.on_error.as_ref(), CacheError::from(e));
                return Ok(());
            }
        };

        let area = self.writable_area(kind, &opts.backend)?;
        let bucket_key = self.bucket_key(page);
        let mut bucket = load_bucket(area, &bucket_key);
        bucket.insert(resolved.item_key.clone(), value.clone());
        if let Err(e) = store_bucket(area, &bucket_key, &bucket) {
            report(opts.on_error.as_ref(), e);
        } else {
            debug!("Stored {} in {} ({})", resolved.item_key, bucket_key, kind);
        }

        if let Some(url_key) = &opts.update_url_search_key {
            self.mirror_to_url(url_key, value, opts.update_url_search_delay);
        }
        Ok(())
    }

    /// Read a value
    ///
    /// Returns the stored value, else the configured default, else `None`.
    pub fn get_item(&self, key: &str, opts: &GetOptions) -> Result<Option<Value>> {
        let found = match &opts.backend {
            BackendSelector::Single(id) => {
                let kind = BackendRegistry::check_for_read(id)?;
                self.lookup(key, kind, &opts.scope)?
            }
            BackendSelector::Override(target) => {
                let kind = BackendRegistry::check_for_read(&target.backend)?;
                self.lookup(target.key.as_deref().unwrap_or(key), kind, &opts.scope)?
            }
            BackendSelector::Chain(targets) => {
                let kinds = targets
                    .iter()
                    .map(|target| BackendRegistry::check_for_read(&target.backend))
                    .collect::<Result<Vec<_>>>()?;
                let mut hit = None;
                for (target, kind) in targets.iter().zip(kinds) {
                    let value = self.lookup(target.key.as_deref().unwrap_or(key), kind, &opts.scope)?;
                    if let Some(value) = value.filter(|v| !is_blank(v)) {
                        hit = Some(value);
                        break;
                    }
                }
                hit
            }
        };

        let value = found.or_else(|| opts.default.as_ref().map(|d| d.resolve()));

        if let Some(url_key) = &opts.update_url_search_key {
            self.mirror_to_url(
                url_key,
                value.clone().unwrap_or(Value::Null),
                opts.update_url_search_delay,
            );
        }
        Ok(value)
    }

    /// Read a value and decode it into `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str, opts: &GetOptions) -> Result<Option<T>> {
        self.get_item(key, opts)?
            .map(|value| serde_json::from_value(value).map_err(CacheError::from))
            .transpose()
    }

    /// Delete one item from its page bucket
    pub fn remove_item(&self, key: &str, opts: &ScopeOptions) -> Result<()> {
        let kind = BackendRegistry::check_for_write(&opts.backend)?;
        let resolved = self.resolve(&opts.scope, key)?;
        let page = resolved.page_or(DEFAULT_PAGE);
        strict::check(self.config.strict, &self.template, page, &resolved.item_key)?;

        let area = self.writable_area(kind, &opts.backend)?;
        let bucket_key = self.bucket_key(page);
        let mut bucket = load_bucket(area, &bucket_key);
        bucket.remove(&resolved.item_key);
        if let Err(e) = store_bucket(area, &bucket_key, &bucket) {
            report(opts.on_error.as_ref(), e);
        }
        Ok(())
    }

    /// Empty the bucket of the page named by `opts.scope`
    ///
    /// Buckets of other pages in the same backend are untouched.
    pub fn clear(&self, opts: &ScopeOptions) -> Result<()> {
        let kind = BackendRegistry::check_for_write(&opts.backend)?;
        let resolved = self.resolve(&opts.scope, "")?;
        let page = resolved.page_or(DEFAULT_PAGE);
        strict::check_page(self.config.strict, &self.template, page)?;

        let area = self.writable_area(kind, &opts.backend)?;
        let bucket_key = self.bucket_key(page);
        if let Err(e) = store_bucket(area, &bucket_key, &Bucket::new()) {
            report(opts.on_error.as_ref(), e);
        } else {
            debug!("Cleared {} ({})", bucket_key, kind);
        }
        Ok(())
    }

    /// Push values into the page query string in one update
    ///
    /// Lookups are evaluated first; any failure aborts before the URL is
    /// touched.
    pub fn update_url_search<I, K>(&self, entries: I, title: Option<&str>, delay: Option<Duration>) -> Result<()>
    where
        I: IntoIterator<Item = (K, UrlSearchSource)>,
        K: Into<String>,
    {
        let mut params = Map::new();
        for (param, source) in entries {
            let value = match source {
                UrlSearchSource::Value(value) => value,
                UrlSearchSource::Lookup { key, options } => {
                    self.get_item(&key, &options)?.unwrap_or(Value::Null)
                }
            };
            params.insert(param.into(), value);
        }
        self.location.write_params(params, title, delay);
        Ok(())
    }

    /// Push literal values into the page query string
    pub fn update_url_search_by_value(&self, params: Map<String, Value>, title: Option<&str>, delay: Option<Duration>) {
        self.location.write_params(params, title, delay);
    }

    /// Read one query parameter of the page
    pub fn url_param(&self, key: &str) -> Option<String> {
        self.location.param(key)
    }

    /// Read all query parameters of the page
    pub fn url_params(&self) -> Vec<(String, String)> {
        self.location.params()
    }

    fn resolve(&self, scope: &str, key: &str) -> Result<ResolvedKey> {
        crate::scope::resolve(scope, key, &self.config.scope_separator)
    }

    fn writable_area(&self, kind: BackendKind, id: &BackendId) -> Result<&dyn StorageArea> {
        self.registry.area(kind).ok_or_else(|| {
            CacheError::invalid_backend("setItem", id.as_str(), &BackendRegistry::write_ids())
        })
    }

    fn lookup(&self, key: &str, kind: BackendKind, scope: &str) -> Result<Option<Value>> {
        if kind == BackendKind::UrlSearch {
            return Ok(self
                .location
                .param(key)
                .filter(|v| !v.is_empty())
                .map(Value::String));
        }

        let resolved = self.resolve(scope, key)?;
        let page = resolved.page_or(DEFAULT_PAGE);
        if self.config.getter_strict {
            strict::check(self.config.strict, &self.template, page, &resolved.item_key)?;
        }

        let area = match self.registry.area(kind) {
            Some(area) => area,
            None => return Ok(None),
        };
        let bucket_key = self.bucket_key(page);
        let value = load_bucket(area, &bucket_key)
            .remove(&resolved.item_key)
            .filter(|v| !v.is_null());
        if value.is_none() {
            debug!("Cache miss for {} in {} ({})", resolved.item_key, bucket_key, kind);
        }
        Ok(value)
    }

    fn mirror_to_url(&self, param: &str, value: Value, delay: Option<Duration>) {
        let mut params = Map::new();
        params.insert(param.to_string(), value);
        self.location.write_params(params, None, delay);
    }
}

/// Read a bucket, treating a missing or unreadable one as empty
fn load_bucket(area: &dyn StorageArea, bucket_key: &str) -> Bucket {
    let raw = match area.get_raw(bucket_key) {
        Some(raw) => raw,
        None => return Bucket::new(),
    };
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(bucket)) => bucket,
        Ok(Value::Null) => Bucket::new(),
        Ok(other) => {
            debug!("Bucket {} is not an object ({}), treating as empty", bucket_key, other);
            Bucket::new()
        }
        Err(e) => {
            debug!("Bucket {} is corrupt ({}), treating as empty", bucket_key, e);
            Bucket::new()
        }
    }
}

fn store_bucket(area: &dyn StorageArea, bucket_key: &str, bucket: &Bucket) -> Result<()> {
    let raw = serde_json::to_string(bucket)?;
    area.set_raw(bucket_key, raw)
}

fn report(callback: Option<&ErrorCallback>, err: CacheError) {
    warn!("Cache write failed: {}", err);
    if let Some(callback) = callback {
        callback(&err);
    }
}

/// Null and empty strings do not count as chain hits
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Builder pattern for cache construction
pub struct CacheBuilder {
    config: CacheConfig,
    backends: Option<StorageBackends>,
    location: Option<PageLocation>,
}

impl CacheBuilder {
    /// Create a new cache builder
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
            backends: None,
            location: None,
        }
    }

    /// Set cache configuration
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Namespace isolating this facade's buckets
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Enable strict mode with `template`
    pub fn strict(mut self, template: Template) -> Self {
        self.config = self.config.strict(template);
        self
    }

    /// Separator between page and subpath in a scope
    pub fn scope_separator(mut self, separator: impl Into<String>) -> Self {
        self.config.scope_separator = separator.into();
        self
    }

    /// Whether reads are checked against the strict template too
    pub fn getter_strict(mut self, getter_strict: bool) -> Self {
        self.config.getter_strict = getter_strict;
        self
    }

    /// Set storage backends (required)
    pub fn backends(mut self, backends: StorageBackends) -> Self {
        self.backends = Some(backends);
        self
    }

    /// Set the page location; defaults to `about:blank`
    pub fn location(mut self, location: PageLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Build the cache
    pub fn build(self) -> Result<Cache> {
        let backends = self
            .backends
            .ok_or_else(|| CacheError::config("Storage backends are required"))?;
        let location = match self.location {
            Some(location) => location,
            None => PageLocation::parse("about:blank")
                .map_err(|e| CacheError::config(format!("invalid default location: {}", e)))?,
        };
        Cache::new(self.config, backends, location)
    }
}

impl Default for CacheBuilder {
    fn default() -> Self {
        Self::new()
    }
}
