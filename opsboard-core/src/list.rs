//! Canonical list results and the response normalizer.
//!
//! The backend has used two contracts for list endpoints over time. Both are
//! mapped onto [`ListResult`] here so nothing above this layer needs to know
//! which one a given route speaks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Pagination metadata reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: u64,
    pub page_size: Option<u64>,
    pub total_pages: u64,
    pub total_count: Option<u64>,
}

impl PageMeta {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Canonical shape of a list response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListResult {
    /// Records in server order.
    pub items: Vec<Value>,
    /// `None` means a single page without pagination controls.
    pub meta: Option<PageMeta>,
    pub links: Option<Value>,
    /// The payload as received.
    pub raw: Value,
}

impl ListResult {
    /// An empty result, used when a read endpoint is not available yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Normalizes a successful payload. See [`normalize`].
    pub fn from_payload(payload: Value) -> Self {
        normalize(payload)
    }

    /// Keeps only the items matching `keep`; metadata is left as reported.
    pub fn retain(mut self, keep: impl Fn(&Value) -> bool) -> Self {
        self.items.retain(keep);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Known item-sequence layouts, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListShape {
    /// `{"items": [...], "meta": {...}}`
    Items,
    /// `{"results": [...]}`
    Results,
}

impl ListShape {
    const PRIORITY: [ListShape; 2] = [ListShape::Items, ListShape::Results];

    fn field(self) -> &'static str {
        match self {
            ListShape::Items => "items",
            ListShape::Results => "results",
        }
    }

    fn extract(self, payload: &Value) -> Option<&Vec<Value>> {
        payload.get(self.field()).and_then(Value::as_array)
    }
}

/// Maps an arbitrary success payload onto a [`ListResult`]. Never fails.
pub fn normalize(payload: Value) -> ListResult {
    let items = ListShape::PRIORITY
        .iter()
        .find_map(|shape| shape.extract(&payload))
        .cloned()
        .unwrap_or_default();

    let meta = payload
        .get("meta")
        .and_then(Value::as_object)
        .and_then(parse_meta);

    let links = payload.get("links").filter(|v| !v.is_null()).cloned();

    ListResult {
        items,
        meta,
        links,
        raw: payload,
    }
}

fn parse_meta(meta: &Map<String, Value>) -> Option<PageMeta> {
    if meta.is_empty() {
        return None;
    }

    let page = lenient_u64(meta, &["page", "current_page", "currentPage"]).unwrap_or(1);
    let page_size = lenient_u64(meta, &["page_size", "pageSize", "per_page"]);
    let total_count = lenient_u64(meta, &["total_count", "totalCount", "count"]);
    let total_pages = lenient_u64(meta, &["total_pages", "totalPages"])
        .or_else(|| match (total_count, page_size) {
            (Some(count), Some(size)) if size > 0 => Some(count.div_ceil(size)),
            _ => None,
        })
        .unwrap_or(1)
        .max(1);

    Some(PageMeta {
        page,
        page_size,
        total_pages,
        total_count,
    })
}

fn lenient_u64(obj: &Map<String, Value>, names: &[&str]) -> Option<u64> {
    names.iter().find_map(|name| match obj.get(*name)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_items_without_meta() {
        let items: Vec<Value> = (1..=12).map(|id| json!({ "id": id })).collect();
        let result = normalize(json!({ "items": items }));

        assert_eq!(result.items.len(), 12);
        assert_eq!(result.items[0], json!({ "id": 1 }));
        assert_eq!(result.items[11], json!({ "id": 12 }));
        assert!(result.meta.is_none());
        assert!(result.links.is_none());
    }

    #[test]
    fn test_results_shape() {
        let result = normalize(json!({ "results": [{ "id": 3 }, { "id": 1 }], "count": 2 }));
        assert_eq!(result.items, vec![json!({ "id": 3 }), json!({ "id": 1 })]);
        assert_eq!(result.raw["count"], json!(2));
    }

    #[test]
    fn test_items_preferred_over_results() {
        let result = normalize(json!({ "items": [{ "id": 1 }], "results": [{ "id": 2 }] }));
        assert_eq!(result.items, vec![json!({ "id": 1 })]);
    }

    #[test]
    fn test_null_items_falls_through_to_results() {
        let result = normalize(json!({ "items": null, "results": [{ "id": 2 }] }));
        assert_eq!(result.items, vec![json!({ "id": 2 })]);
    }

    #[test]
    fn test_unknown_payload_is_empty() {
        assert!(normalize(json!({ "data": [1, 2] })).is_empty());
        assert!(normalize(json!([1, 2, 3])).is_empty());
        assert!(normalize(Value::Null).is_empty());
        assert!(normalize(json!({ "items": "nope" })).is_empty());
    }

    #[test]
    fn test_meta_parsed() {
        let result = normalize(json!({
            "items": [],
            "meta": { "page": 2, "page_size": 20, "total_pages": 5, "total_count": 93 },
            "links": { "next": "?page=3" }
        }));
        let meta = result.meta.unwrap();
        assert_eq!(
            meta,
            PageMeta {
                page: 2,
                page_size: Some(20),
                total_pages: 5,
                total_count: Some(93),
            }
        );
        assert!(meta.has_next());
        assert!(meta.has_previous());
        assert_eq!(result.links, Some(json!({ "next": "?page=3" })));
    }

    #[test]
    fn test_meta_lenient_numbers_and_derived_pages() {
        let result = normalize(json!({
            "items": [],
            "meta": { "page": "3", "page_size": 10, "total_count": 41 }
        }));
        let meta = result.meta.unwrap();
        assert_eq!(meta.page, 3);
        assert_eq!(meta.total_pages, 5);
        assert!(meta.has_next());
    }

    #[test]
    fn test_empty_meta_is_none() {
        assert!(normalize(json!({ "items": [], "meta": {} })).meta.is_none());
        assert!(normalize(json!({ "items": [], "meta": null })).meta.is_none());
    }

    #[test]
    fn test_retain_keeps_meta() {
        let result = normalize(json!({
            "items": [{ "id": 1, "ok": true }, { "id": 2, "ok": false }],
            "meta": { "page": 1, "total_pages": 1 }
        }))
        .retain(|item| item["ok"] == json!(true));
        assert_eq!(result.items, vec![json!({ "id": 1, "ok": true })]);
        assert!(result.meta.is_some());
    }
}
