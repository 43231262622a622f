//! Per-call options for the cache facade

use std::{fmt, sync::Arc, time::Duration};

use serde_json::Value;

use crate::{
    backend::{BackendId, BackendKind},
    scope::GLOBAL_PAGE,
    CacheError, Result,
};

/// Callback receiving write failures that are not returned to the caller
pub type ErrorCallback = Arc<dyn Fn(&CacheError) + Send + Sync>;

fn global_scope() -> String {
    GLOBAL_PAGE.to_string()
}

/// Options for `set_item`
#[derive(Clone)]
pub struct SetOptions {
    pub backend: BackendId,
    pub scope: String,
    pub on_error: Option<ErrorCallback>,
    /// Mirror the written value into this query parameter
    pub update_url_search_key: Option<String>,
    pub update_url_search_delay: Option<Duration>,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            backend: BackendId::default(),
            scope: global_scope(),
            on_error: None,
            update_url_search_key: None,
            update_url_search_delay: None,
        }
    }
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn backend(mut self, backend: impl Into<BackendId>) -> Self {
        self.backend = backend.into();
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CacheError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    #[must_use]
    pub fn update_url_search_key(mut self, key: impl Into<String>) -> Self {
        self.update_url_search_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn update_url_search_delay(mut self, delay: Duration) -> Self {
        self.update_url_search_delay = Some(delay);
        self
    }
}

impl fmt::Debug for SetOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetOptions")
            .field("backend", &self.backend)
            .field("scope", &self.scope)
            .field("on_error", &self.on_error.is_some())
            .field("update_url_search_key", &self.update_url_search_key)
            .field("update_url_search_delay", &self.update_url_search_delay)
            .finish()
    }
}

/// Options for `remove_item` and `clear`
#[derive(Clone)]
pub struct ScopeOptions {
    pub backend: BackendId,
    pub scope: String,
    pub on_error: Option<ErrorCallback>,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            backend: BackendId::default(),
            scope: global_scope(),
            on_error: None,
        }
    }
}

impl ScopeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn backend(mut self, backend: impl Into<BackendId>) -> Self {
        self.backend = backend.into();
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CacheError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for ScopeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeOptions")
            .field("backend", &self.backend)
            .field("scope", &self.scope)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// A backend to read from, optionally under a different key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTarget {
    /// Key to read instead of the one passed to `get_item`
    pub key: Option<String>,
    pub backend: BackendId,
}

impl LookupTarget {
    pub fn new(backend: impl Into<BackendId>) -> Self {
        Self {
            key: None,
            backend: backend.into(),
        }
    }

    pub fn with_key(key: impl Into<String>, backend: impl Into<BackendId>) -> Self {
        Self {
            key: Some(key.into()),
            backend: backend.into(),
        }
    }
}

impl From<BackendKind> for LookupTarget {
    fn from(kind: BackendKind) -> Self {
        Self::new(kind)
    }
}

impl From<&str> for LookupTarget {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<BackendId> for LookupTarget {
    fn from(id: BackendId) -> Self {
        Self::new(id)
    }
}

/// Where `get_item` looks for a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSelector {
    /// One backend
    Single(BackendId),
    /// Backends tried in order; the first non-blank value wins
    Chain(Vec<LookupTarget>),
    /// One backend, with the key optionally replaced for this lookup
    Override(LookupTarget),
}

impl Default for BackendSelector {
    fn default() -> Self {
        BackendSelector::Single(BackendId::default())
    }
}

impl From<BackendKind> for BackendSelector {
    fn from(kind: BackendKind) -> Self {
        BackendSelector::Single(kind.into())
    }
}

impl From<&str> for BackendSelector {
    fn from(id: &str) -> Self {
        BackendSelector::Single(id.into())
    }
}

impl From<BackendId> for BackendSelector {
    fn from(id: BackendId) -> Self {
        BackendSelector::Single(id)
    }
}

/// Value substituted when a lookup finds nothing
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    /// Evaluated only on a miss
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn resolve(&self) -> Value {
        match self {
            DefaultValue::Value(value) => value.clone(),
            DefaultValue::Producer(produce) => produce(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Options for `get_item`
#[derive(Debug, Clone)]
pub struct GetOptions {
    pub backend: BackendSelector,
    pub scope: String,
    pub default: Option<DefaultValue>,
    /// Mirror the returned value into this query parameter
    pub update_url_search_key: Option<String>,
    pub update_url_search_delay: Option<Duration>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            backend: BackendSelector::default(),
            scope: global_scope(),
            default: None,
            update_url_search_key: None,
            update_url_search_delay: None,
        }
    }
}

impl GetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn backend(mut self, backend: impl Into<BackendSelector>) -> Self {
        self.backend = backend.into();
        self
    }

    /// Try each target in order
    #[must_use]
    pub fn chain<I, T>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<LookupTarget>,
    {
        self.backend = BackendSelector::Chain(targets.into_iter().map(Into::into).collect());
        self
    }

    /// Read `key` from `backend` instead of the key passed to `get_item`
    #[must_use]
    pub fn override_key(mut self, key: impl Into<String>, backend: impl Into<BackendId>) -> Self {
        self.backend = BackendSelector::Override(LookupTarget::with_key(key, backend));
        self
    }

    #[must_use]
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    #[must_use]
    pub fn default_with<F>(mut self, produce: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(produce)));
        self
    }

    #[must_use]
    pub fn update_url_search_key(mut self, key: impl Into<String>) -> Self {
        self.update_url_search_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn update_url_search_delay(mut self, delay: Duration) -> Self {
        self.update_url_search_delay = Some(delay);
        self
    }

    /// Decode options from loosely typed JSON
    ///
    /// Recognises `type` (string, array of strings or `{key, type}` objects,
    /// or a single `{key, type}` object), `scope`, `default`,
    /// `updateUrlSearchKey` and `updateUrlSearchKeyTime` (milliseconds).
    /// `null` yields the defaults.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(object) => object,
            other => {
                return Err(CacheError::schema(format!(
                    "options need to be an object, got {}.",
                    other
                )))
            }
        };

        let mut options = Self::default();
        if let Some(backend) = object.get("type") {
            options.backend = selector_from_value(backend)?;
        }
        match object.get("scope") {
            None => {}
            Some(Value::String(scope)) => options.scope = scope.clone(),
            Some(other) => {
                return Err(CacheError::invalid_scope(format!(
                    "scope need to be a string, got {}.",
                    other
                )))
            }
        }
        match object.get("default") {
            None | Some(Value::Null) => {}
            Some(default) => options.default = Some(DefaultValue::Value(default.clone())),
        }
        if let Some(Value::String(key)) = object.get("updateUrlSearchKey") {
            options.update_url_search_key = Some(key.clone());
        }
        if let Some(ms) = object.get("updateUrlSearchKeyTime").and_then(Value::as_u64) {
            options.update_url_search_delay = Some(Duration::from_millis(ms));
        }
        Ok(options)
    }
}

fn selector_from_value(value: &Value) -> Result<BackendSelector> {
    match value {
        Value::String(id) => Ok(BackendSelector::Single(id.as_str().into())),
        Value::Array(items) => items
            .iter()
            .map(target_from_value)
            .collect::<Result<Vec<_>>>()
            .map(BackendSelector::Chain),
        Value::Object(_) => target_from_value(value).map(BackendSelector::Override),
        other => Err(unknown_backend(other)),
    }
}

fn target_from_value(value: &Value) -> Result<LookupTarget> {
    match value {
        Value::String(id) => Ok(LookupTarget::new(id.as_str())),
        Value::Object(object) => {
            let backend = match object.get("type") {
                Some(Value::String(id)) => BackendId::from(id.as_str()),
                Some(other) => return Err(unknown_backend(other)),
                None => return Err(unknown_backend(&Value::Null)),
            };
            let key = object
                .get("key")
                .and_then(Value::as_str)
                .filter(|k| !k.is_empty())
                .map(str::to_string);
            Ok(LookupTarget { key, backend })
        }
        other => Err(unknown_backend(other)),
    }
}

fn unknown_backend(value: &Value) -> CacheError {
    CacheError::invalid_backend(
        "getItem",
        value.to_string(),
        &crate::backend::BackendRegistry::read_ids(),
    )
}

/// One entry of an `update_url_search` map
#[derive(Debug, Clone)]
pub enum UrlSearchSource {
    /// Written as is
    Value(Value),
    /// Result of a nested `get_item`
    Lookup { key: String, options: GetOptions },
}

impl UrlSearchSource {
    pub fn lookup(key: impl Into<String>, options: GetOptions) -> Self {
        UrlSearchSource::Lookup {
            key: key.into(),
            options,
        }
    }

    /// Decode an entry: `[key, options]` is a lookup, anything else a value
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Array(items) => {
                let key = match items.first() {
                    Some(Value::String(key)) => key.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                let options = GetOptions::from_value(items.get(1).unwrap_or(&Value::Null))?;
                Ok(UrlSearchSource::Lookup { key, options })
            }
            other => Ok(UrlSearchSource::Value(other.clone())),
        }
    }
}

impl From<Value> for UrlSearchSource {
    fn from(value: Value) -> Self {
        UrlSearchSource::Value(value)
    }
}
