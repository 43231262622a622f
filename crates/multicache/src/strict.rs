//! Strict-mode validation against a declared template

use serde::{Deserialize, Serialize};

use crate::{scope::is_global_page, CacheError, Result};

/// Keys and pages a strict facade accepts
///
/// Both lists are optional so that a template decoded from configuration can
/// omit one; using the missing list in strict mode is a schema error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Item keys allowed under the `global` scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_keys: Option<Vec<String>>,
    /// Pages allowed for every other scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<String>>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn global_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.global_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn pages<I, S>(mut self, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pages = Some(pages.into_iter().map(Into::into).collect());
        self
    }
}

/// Check an access against the template
///
/// Only the page is constrained for ordinary scopes, and only the exact item
/// key for the global scope. Subpaths are never checked.
pub fn check(strict: bool, template: &Template, page: &str, item_key: &str) -> Result<()> {
    if !strict {
        return Ok(());
    }
    if is_global_page(page) {
        let global_keys = global_keys(template)?;
        if !global_keys.iter().any(|k| k == item_key) {
            return Err(CacheError::schema(format!(
                "key \"{}\" should be defined in globalKeys firstly.",
                item_key
            )));
        }
    } else {
        check_page(strict, template, page)?;
    }
    Ok(())
}

/// Check a whole-page access, as done by `clear`
///
/// For the global page this only requires `globalKeys` to be declared.
pub fn check_page(strict: bool, template: &Template, page: &str) -> Result<()> {
    if !strict {
        return Ok(());
    }
    if is_global_page(page) {
        global_keys(template)?;
        return Ok(());
    }
    let pages = template
        .pages
        .as_ref()
        .ok_or_else(|| CacheError::schema("pages need to be an array."))?;
    if !pages.iter().any(|p| p == page) {
        return Err(CacheError::schema(format!(
            "the page part of scope \"{}\" should be defined in pages firstly.",
            page
        )));
    }
    Ok(())
}

fn global_keys(template: &Template) -> Result<&[String]> {
    template
        .global_keys
        .as_deref()
        .ok_or_else(|| CacheError::schema("globalKeys need to be an array."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> Template {
        Template::new().global_keys(["age"]).pages(["home"])
    }

    #[test]
    fn test_not_strict_accepts_everything() {
        assert!(check(false, &Template::new(), "office", "x").is_ok());
        assert!(check_page(false, &Template::new(), "global").is_ok());
    }

    #[test]
    fn test_global_key_must_be_declared() {
        assert!(check(true, &template(), "global", "age").is_ok());
        let err = check(true, &template(), "global", "name").unwrap_err();
        assert_eq!(
            err,
            CacheError::schema("key \"name\" should be defined in globalKeys firstly.")
        );
    }

    #[test]
    fn test_page_must_be_declared() {
        assert!(check(true, &template(), "home", "hotel>city").is_ok());
        let err = check(true, &template(), "office", "x").unwrap_err();
        assert!(matches!(err, CacheError::Schema { .. }));
    }

    #[test]
    fn test_missing_lists_are_schema_errors() {
        let only_pages = Template::new().pages(["home"]);
        assert_eq!(
            check(true, &only_pages, "global", "age").unwrap_err(),
            CacheError::schema("globalKeys need to be an array.")
        );

        let only_keys = Template::new().global_keys(["age"]);
        assert_eq!(
            check(true, &only_keys, "home", "city").unwrap_err(),
            CacheError::schema("pages need to be an array.")
        );
    }

    #[test]
    fn test_default_page_is_checked_against_pages() {
        assert!(check(true, &template(), "$page$", "x").is_err());
    }

    #[test]
    fn test_check_page_for_global_only_needs_declared_keys() {
        assert!(check_page(true, &template(), "global").is_ok());
        assert!(check_page(true, &Template::new().pages(["home"]), "global").is_err());
    }

    #[test]
    fn test_template_from_json() {
        let template: Template =
            serde_json::from_str(r#"{"globalKeys":["age"],"pages":["home","hotel"]}"#).unwrap();
        assert_eq!(template.global_keys, Some(vec!["age".to_string()]));
        assert_eq!(
            template.pages,
            Some(vec!["home".to_string(), "hotel".to_string()])
        );
    }
}
