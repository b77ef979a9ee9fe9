//! Query spec model for list views.
//!
//! A [`QuerySpec`] is the filter/sort/page state of one list view. It is always
//! stored in normalized form: keys whose value is null or an empty string are
//! dropped, so two specs compare equal exactly when they would produce the same
//! request.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Key holding the 1-based page number.
pub const PAGE_KEY: &str = "page";
/// Key holding the page size.
pub const PAGE_SIZE_KEY: &str = "page_size";
/// Key holding the free-text search term.
pub const SEARCH_KEY: &str = "search";
/// Key holding the sort-order token.
pub const ORDERING_KEY: &str = "ordering";

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl Scalar {
    fn is_blank(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.is_empty())
    }

    /// Reads the scalar as a non-negative integer, accepting numeric text.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Scalar::Int(n) => u64::try_from(*n).ok(),
            Scalar::Text(s) => s.trim().parse().ok(),
            Scalar::Bool(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// A query parameter: absent (null), one scalar, or a list of scalars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Null,
    One(Scalar),
    Many(Vec<Scalar>),
}

impl QueryValue {
    /// Returns the value with blank members stripped, or `None` if nothing is left.
    fn normalized(self) -> Option<QueryValue> {
        match self {
            QueryValue::Null => None,
            QueryValue::One(scalar) if scalar.is_blank() => None,
            QueryValue::One(scalar) => Some(QueryValue::One(scalar)),
            QueryValue::Many(list) => {
                let list: Vec<Scalar> = list.into_iter().filter(|s| !s.is_blank()).collect();
                if list.is_empty() {
                    None
                } else {
                    Some(QueryValue::Many(list))
                }
            }
        }
    }

    /// Returns the single scalar, if this is one.
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            QueryValue::One(scalar) => Some(scalar),
            _ => None,
        }
    }
}

impl From<Scalar> for QueryValue {
    fn from(value: Scalar) -> Self {
        QueryValue::One(value)
    }
}

macro_rules! query_value_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for QueryValue {
                fn from(value: $ty) -> Self {
                    QueryValue::One(value.into())
                }
            }

            impl From<Vec<$ty>> for QueryValue {
                fn from(values: Vec<$ty>) -> Self {
                    QueryValue::Many(values.into_iter().map(Into::into).collect())
                }
            }

            impl From<Option<$ty>> for QueryValue {
                fn from(value: Option<$ty>) -> Self {
                    value.map_or(QueryValue::Null, |v| QueryValue::One(v.into()))
                }
            }
        )*
    };
}

query_value_from!(&str, String, i64, i32, u32, bool);

/// A partial update to a [`QuerySpec`].
///
/// Unlike a spec, a patch keeps null and empty values: they mean "remove this
/// filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPatch {
    entries: Vec<(String, QueryValue)>,
}

impl QueryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key to the patch. Later entries for the same key win.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Adds a key whose value should be removed from the spec.
    pub fn clear(self, key: impl Into<String>) -> Self {
        self.set(key, QueryValue::Null)
    }

    /// Returns true if the patch explicitly mentions `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalized filter/sort/page state of one list view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuerySpec {
    entries: BTreeMap<String, QueryValue>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`QuerySpec::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Inserts `value` only when `key` is not already present.
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        let key = key.into();
        if !self.entries.contains_key(&key) {
            self.set(key, value);
        }
        self
    }

    /// Sets a single key. Blank values remove the key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let key = key.into();
        match value.into().normalized() {
            Some(value) => {
                self.entries.insert(key, value);
            }
            None => {
                self.entries.remove(&key);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current page number, if one is set and numeric.
    pub fn page(&self) -> Option<u64> {
        self.get(PAGE_KEY)
            .and_then(QueryValue::as_scalar)
            .and_then(Scalar::as_u64)
    }

    /// Merges `partial` over this spec.
    ///
    /// Unless the patch sets `page` to a value, the page resets to 1. Returns
    /// true if the normalized spec changed.
    pub fn patch(&mut self, partial: QueryPatch) -> bool {
        let before = self.clone();
        let explicit_page = partial.contains(PAGE_KEY);

        for (key, value) in partial.entries {
            self.set(key, value);
        }
        if !explicit_page || !self.contains(PAGE_KEY) {
            self.set(PAGE_KEY, 1u32);
        }

        *self != before
    }

    /// Moves to page `page`, leaving every other key untouched. Returns true if
    /// the page changed.
    pub fn set_page(&mut self, page: u32) -> bool {
        let before = self.get(PAGE_KEY).cloned();
        self.set(PAGE_KEY, page);
        before.as_ref() != self.get(PAGE_KEY)
    }

    /// Returns a copy of this spec with `key` removed.
    pub fn without(&self, key: &str) -> QuerySpec {
        let mut spec = self.clone();
        spec.entries.remove(key);
        spec
    }

    /// Returns the normalized form of this spec.
    pub fn normalize(&self) -> QuerySpec {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Flattens the spec into request parameters; list values repeat their key.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in &self.entries {
            match value {
                QueryValue::Null => {}
                QueryValue::One(scalar) => pairs.push((key.clone(), scalar.to_string())),
                QueryValue::Many(list) => {
                    pairs.extend(list.iter().map(|s| (key.clone(), s.to_string())));
                }
            }
        }
        pairs
    }

    /// Percent-encoded query string including the leading `?`, or an empty
    /// string when there are no parameters.
    pub fn to_query_string(&self) -> String {
        let encoded: Vec<String> = self
            .to_pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        if encoded.is_empty() {
            String::new()
        } else {
            format!("?{}", encoded.join("&"))
        }
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for QuerySpec {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut spec = QuerySpec::new();
        for (key, value) in iter {
            spec.set(key, value);
        }
        spec
    }
}

impl<'de> Deserialize<'de> for QuerySpec {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, QueryValue>::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}

impl fmt::Display for QuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let qs = self.to_query_string();
        write!(f, "{}", qs.trim_start_matches('?'))
    }
}
