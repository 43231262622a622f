//! Page location and its query string
//!
//! [`PageLocation`] stands in for the page address bar: it holds the current
//! URL and document title and the history state last put in place by a
//! query update. Query updates merge into the existing parameters and never
//! navigate.

use std::{sync::Arc, time::Duration};

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::debug;
use url::{form_urlencoded, Url};

/// History state installed by a `replaceState`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub href: String,
    pub title: String,
}

#[derive(Debug)]
struct LocationState {
    url: Url,
    title: String,
    current: Option<HistoryEntry>,
    replacements: u64,
}

/// Shared handle to the current page location
#[derive(Debug, Clone)]
pub struct PageLocation {
    state: Arc<RwLock<LocationState>>,
}

impl PageLocation {
    pub fn new(url: Url) -> Self {
        Self {
            state: Arc::new(RwLock::new(LocationState {
                url,
                title: String::new(),
                current: None,
                replacements: 0,
            })),
        }
    }

    /// Parse `href` as the current location
    pub fn parse(href: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(href)?))
    }

    #[must_use]
    pub fn with_title(self, title: impl Into<String>) -> Self {
        self.state.write().title = title.into();
        self
    }

    pub fn href(&self) -> String {
        self.state.read().url.to_string()
    }

    /// Query string including the leading `?`, or empty
    pub fn search(&self) -> String {
        search_of(&self.state.read().url)
    }

    /// Current document title
    pub fn title(&self) -> String {
        self.state.read().title.clone()
    }

    /// History state installed by the latest query update, if any
    pub fn current_state(&self) -> Option<HistoryEntry> {
        self.state.read().current.clone()
    }

    /// Number of history replacements performed so far
    pub fn replace_count(&self) -> u64 {
        self.state.read().replacements
    }

    /// All query parameters in order, last duplicate wins
    pub fn params(&self) -> Vec<(String, String)> {
        collapse(self.state.read().url.query_pairs().into_owned())
    }

    /// Value of one query parameter
    pub fn param(&self, key: &str) -> Option<String> {
        self.params()
            .into_iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Merge `params` into the query string
    ///
    /// With a `delay` the update runs as a detached task on the current tokio
    /// runtime and cannot be cancelled; without a runtime it applies at once.
    pub fn write_params(&self, params: Map<String, Value>, title: Option<&str>, delay: Option<Duration>) {
        let title = title.map(str::to_string);
        match delay {
            None => self.apply(&params, title.as_deref()),
            Some(delay) => match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let location = self.clone();
                    handle.spawn(async move {
                        tokio::time::sleep(delay).await;
                        location.apply(&params, title.as_deref());
                    });
                }
                Err(_) => {
                    debug!("No async runtime for delayed query update, applying now");
                    self.apply(&params, title.as_deref());
                }
            },
        }
    }

    fn apply(&self, params: &Map<String, Value>, title: Option<&str>) {
        let mut state = self.state.write();

        let mut merged = collapse(state.url.query_pairs().into_owned());
        if merged.is_empty() {
            debug!("Page has no query parameters, skipping update");
            return;
        }
        for (key, value) in params {
            let value = query_value(value);
            match merged.iter_mut().find(|(k, _)| k == key) {
                Some(slot) => slot.1 = value,
                None => merged.push((key.clone(), value)),
            }
        }

        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(merged.iter())
            .finish();
        if search_of(&state.url) == format!("?{}", query) {
            return;
        }

        state.url.set_query(Some(&query));
        let title = title.map_or_else(|| state.title.clone(), str::to_string);
        let href = state.url.to_string();
        debug!("Replacing history state with {}", href);
        state.current = Some(HistoryEntry { href, title });
        state.replacements += 1;
    }
}

fn search_of(url: &Url) -> String {
    match url.query() {
        Some(query) if !query.is_empty() => format!("?{}", query),
        _ => String::new(),
    }
}

fn collapse(pairs: impl Iterator<Item = (String, String)>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for (key, value) in pairs {
        match out.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => out.push((key, value)),
        }
    }
    out
}

/// Render a JSON value the way it appears in a query string
pub fn query_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
