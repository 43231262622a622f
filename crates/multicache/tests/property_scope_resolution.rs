//! Property-based tests for scope resolution
//!
//! Resolution is a pure function of `(scope, key, separator)`, the global
//! page never prefixes keys, and subpaths always land in the item key.

use multicache::{resolve, ResolvedKey};
use proptest::prelude::*;

/// Strategy for generating scope segments without separators or whitespace
fn segment_strategy() -> impl Strategy<Value = String> {
    r"[a-zA-Z0-9_\-]{1,12}"
}

/// Strategy for generating item keys
fn key_strategy() -> impl Strategy<Value = String> {
    r"[a-zA-Z0-9_]{0,12}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_resolution_is_idempotent(
        scope in r"[ a-z/]{0,20}",
        key in key_strategy(),
    ) {
        let first = resolve(&scope, &key, "/").unwrap();
        let second = resolve(&scope, &key, "/").unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_global_never_prefixes(
        subpath in prop::option::of(segment_strategy()),
        key in key_strategy(),
    ) {
        let scope = match &subpath {
            Some(sub) => format!("global/{}", sub),
            None => "global".to_string(),
        };
        let resolved = resolve(&scope, &key, "/").unwrap();
        prop_assert_eq!(resolved.page.as_deref(), Some("global"));
        prop_assert_eq!(resolved.item_key, key);
    }

    #[test]
    fn prop_subpath_prefixes_item_key(
        page in segment_strategy().prop_filter("not global", |p| p != "global"),
        subpath in segment_strategy(),
        key in key_strategy(),
    ) {
        let resolved = resolve(&format!("{}/{}/", page, subpath), &key, "/").unwrap();
        prop_assert_eq!(
            resolved,
            ResolvedKey {
                page: Some(page),
                item_key: format!("{}>{}", subpath, key),
            }
        );
    }

    #[test]
    fn prop_surrounding_whitespace_is_ignored(
        page in segment_strategy(),
        pad_left in r" {0,3}",
        pad_right in r" {0,3}",
        key in key_strategy(),
    ) {
        let plain = resolve(&page, &key, "/").unwrap();
        let padded = resolve(&format!("{}{}{}", pad_left, page, pad_right), &key, "/").unwrap();
        prop_assert_eq!(plain, padded);
    }
}
