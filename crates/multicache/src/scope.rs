//! Scope parsing
//!
//! A scope such as `"home/hotel"` names a page (`home`) and an optional
//! subpath (`hotel`). All keys of one page share a bucket; the subpath is
//! folded into the item key as `"hotel>city"`. The `global` page never
//! prefixes keys.

use crate::{CacheError, Result};

/// Page name that opts out of subpath prefixing
pub const GLOBAL_PAGE: &str = "global";

/// Separator between subpath and key inside an item key
pub const SUBPATH_DELIMITER: char = '>';

/// Result of resolving a scope and key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedKey {
    /// Page part of the scope, `None` when the scope was empty
    pub page: Option<String>,
    /// Key of the item inside the page bucket
    pub item_key: String,
}

impl ResolvedKey {
    /// Page name with `default_page` substituted for an empty scope
    pub fn page_or<'a>(&'a self, default_page: &'a str) -> &'a str {
        self.page.as_deref().unwrap_or(default_page)
    }
}

/// Whether `page` is the flat global page
pub fn is_global_page(page: &str) -> bool {
    page == GLOBAL_PAGE
}

/// Resolve `scope` and `key` into a page and an item key
pub fn resolve(scope: &str, key: &str, separator: &str) -> Result<ResolvedKey> {
    if separator.is_empty() {
        return Err(CacheError::invalid_scope("scope separator must not be empty."));
    }

    let mut trimmed = scope.trim_end();
    if let Some(stripped) = trimmed.strip_suffix(separator) {
        trimmed = stripped.trim_end();
    }

    let (page, subpath) = match trimmed.find(separator) {
        Some(idx) => (
            trimmed[..idx].trim(),
            trimmed[idx + separator.len()..].trim(),
        ),
        None => (trimmed.trim(), ""),
    };

    let item_key = if is_global_page(page) || subpath.is_empty() {
        key.to_string()
    } else {
        format!("{}{}{}", subpath, SUBPATH_DELIMITER, key)
    };

    Ok(ResolvedKey {
        page: (!page.is_empty()).then(|| page.to_string()),
        item_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(page: Option<&str>, item_key: &str) -> ResolvedKey {
        ResolvedKey {
            page: page.map(str::to_string),
            item_key: item_key.to_string(),
        }
    }

    #[test]
    fn test_global_scope_never_prefixes() {
        assert_eq!(resolve("global", "age", "/").unwrap(), resolved(Some("global"), "age"));
        assert_eq!(
            resolve("global/flight", "age", "/").unwrap(),
            resolved(Some("global"), "age")
        );
    }

    #[test]
    fn test_page_with_subpath() {
        assert_eq!(
            resolve("home/hotel", "city", "/").unwrap(),
            resolved(Some("home"), "hotel>city")
        );
        assert_eq!(
            resolve("home/hotel/rooms", "city", "/").unwrap(),
            resolved(Some("home"), "hotel/rooms>city")
        );
    }

    #[test]
    fn test_page_without_subpath() {
        assert_eq!(resolve("home", "city", "/").unwrap(), resolved(Some("home"), "city"));
        assert_eq!(resolve("home/", "city", "/").unwrap(), resolved(Some("home"), "city"));
    }

    #[test]
    fn test_whitespace_and_trailing_separator_are_trimmed() {
        assert_eq!(
            resolve("  home / hotel /  ", "city", "/").unwrap(),
            resolved(Some("home"), "hotel>city")
        );
    }

    #[test]
    fn test_empty_scope_has_no_page() {
        assert_eq!(resolve("", "city", "/").unwrap(), resolved(None, "city"));
        assert_eq!(resolve("  / ", "city", "/").unwrap(), resolved(None, "city"));
        assert_eq!(resolved(None, "city").page_or("$page$"), "$page$");
    }

    #[test]
    fn test_multi_char_separator() {
        assert_eq!(
            resolve("home::hotel", "city", "::").unwrap(),
            resolved(Some("home"), "hotel>city")
        );
        assert_eq!(
            resolve("home/hotel", "city", "::").unwrap(),
            resolved(Some("home/hotel"), "city")
        );
    }

    #[test]
    fn test_empty_separator_is_rejected() {
        let err = resolve("home", "city", "").unwrap_err();
        assert!(matches!(err, CacheError::InvalidScope { .. }));
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let first = resolve("home/hotel", "city", "/").unwrap();
        let second = resolve("home/hotel", "city", "/").unwrap();
        assert_eq!(first, second);
    }
}
