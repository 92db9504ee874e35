//! Source post descriptors.
//!
//! [`RawItem`] is the record exactly as the source API delivers it, [`Item`] is the
//! validated value the rest of the pipeline works with.

use serde::Deserialize;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// One post as returned by `GET {source_endpoint}/{account}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawItem {
    pub full_text: String,
    /// Canonical link to the post on the source service.
    pub ext_urlstatus: String,
    /// Numeric post id, string-encoded by the source.
    pub id_str: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("invalid item id '{0}'")]
    InvalidId(String),
}

/// Immutable descriptor of one source post. Ids grow with post recency.
///
/// Equality, hashing and ordering look at the id only.
#[derive(Debug, Clone)]
pub struct Item {
    text: String,
    source_url: String,
    id: u64,
}

impl Item {
    pub fn new(text: impl Into<String>, source_url: impl Into<String>, id: u64) -> Self {
        Self {
            text: text.into(),
            source_url: source_url.into(),
            id,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for Item {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Item {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl TryFrom<RawItem> for Item {
    type Error = ItemError;

    fn try_from(raw: RawItem) -> Result<Self, Self::Error> {
        let id = raw
            .id_str
            .trim()
            .parse::<u64>()
            .map_err(|_| ItemError::InvalidId(raw.id_str.clone()))?;
        Ok(Item {
            text: raw.full_text,
            source_url: raw.ext_urlstatus,
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: &str) -> RawItem {
        RawItem {
            full_text: "hello".into(),
            ext_urlstatus: format!("https://twitter.com/acc/status/{id}"),
            id_str: id.into(),
        }
    }

    #[test]
    fn items_with_same_fields_are_equal() {
        let a = Item::new("text", "https://twitter.com/a/status/1", 1);
        let b = Item::new("text", "https://twitter.com/a/status/1", 1);
        assert_eq!(a, b);
    }

    #[test]
    fn items_with_same_id_are_equal_whatever_the_text() {
        let a = Item::new("original", "https://twitter.com/a/status/9", 9);
        let b = Item::new("edited", "https://twitter.com/a/status/9", 9);
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
        assert_ne!(a, Item::new("original", "https://twitter.com/a/status/10", 10));
    }

    #[test]
    fn items_order_by_id() {
        let older = Item::new("zzz", "https://twitter.com/a/status/5", 5);
        let newer = Item::new("aaa", "https://twitter.com/a/status/7", 7);
        assert!(older < newer);

        let mut items = vec![newer.clone(), older.clone()];
        items.sort();
        assert_eq!(items, vec![older, newer]);
    }

    #[test]
    fn raw_item_converts_with_parsed_id() {
        let item = Item::try_from(raw("1599999999999999999")).unwrap();
        assert_eq!(item.id(), 1_599_999_999_999_999_999);
        assert_eq!(item.text(), "hello");
        assert_eq!(
            item.source_url(),
            "https://twitter.com/acc/status/1599999999999999999"
        );
    }

    #[test]
    fn raw_item_with_non_numeric_id_is_rejected() {
        let err = Item::try_from(raw("abc")).unwrap_err();
        assert_eq!(err, ItemError::InvalidId("abc".into()));
    }

    #[test]
    fn raw_item_deserializes_ignoring_extra_fields() {
        let raw: RawItem = serde_json::from_value(serde_json::json!({
            "full_text": "hi",
            "ext_urlstatus": "https://twitter.com/a/status/3",
            "id_str": "3",
            "favorite_count": 12
        }))
        .unwrap();
        assert_eq!(raw.id_str, "3");
    }
}
