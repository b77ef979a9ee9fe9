//! Error envelope: the single failure shape that reaches list views and forms.
//!
//! Backend failures arrive as a bare message, a field-level validation map, or
//! a business-rule conflict listing the components that are short. All of them
//! are folded into an [`ErrorEnvelope`] here.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// What a failed request was trying to do. Decides how a 404 is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Per-field validation messages.
    Validation,
    /// Structurally valid request rejected by a business rule.
    Conflict,
    /// 404 on a read.
    NotFoundOnRead,
    /// 404 on a mutation.
    NotFoundOnWrite,
    /// 405: the route exists but not for this verb.
    RouteUnsupported,
    /// 401: the session is no longer valid.
    Unauthorized,
    /// The request was abandoned by its owner.
    Cancelled,
    /// Anything without a structured payload.
    Unknown,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFoundOnRead => "not_found_on_read",
            ErrorKind::NotFoundOnWrite => "not_found_on_write",
            ErrorKind::RouteUnsupported => "route_unsupported",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A component the operation needed more of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingResource {
    pub component: String,
    pub required: Option<Number>,
    pub available: Option<Number>,
    pub unit: Option<String>,
}

impl MissingResource {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(obj) => Self {
                component: first_text(obj, &["component", "raw_material", "element", "name"])
                    .unwrap_or_else(|| "component".to_string()),
                required: first_number(obj, &["required", "need"]),
                available: first_number(obj, &["available", "balance"]),
                unit: first_text(obj, &["unit"]),
            },
            Value::String(s) => Self::named(s.clone()),
            other => Self::named(other.to_string()),
        }
    }

    fn named(component: String) -> Self {
        Self {
            component,
            required: None,
            available: None,
            unit: None,
        }
    }
}

impl std::fmt::Display for MissingResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = self
            .unit
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| format!(" {}", u))
            .unwrap_or_default();
        let required = self
            .required
            .as_ref()
            .map_or_else(|| "?".to_string(), Number::to_string);
        let available = self
            .available
            .as_ref()
            .map_or_else(|| "0".to_string(), Number::to_string);
        write!(
            f,
            "{}: required {}{}, available {}{}",
            self.component, required, unit, available, unit
        )
    }
}

/// Raw failure as seen by a transport, before classification.
#[derive(Debug, Clone, Default)]
pub struct Failure {
    pub status: Option<u16>,
    pub body: Option<Value>,
    pub message: String,
}

/// Canonical error shape.
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("{message}")]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    pub message: String,
    /// Backend error code, when one was sent.
    pub code: Option<String>,
    pub field_errors: Option<BTreeMap<String, Vec<String>>>,
    pub missing_resources: Option<Vec<MissingResource>>,
    pub http_status: Option<u16>,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            field_errors: None,
            missing_resources: None,
            http_status: None,
        }
    }

    /// Transport-level failure without a payload; the message passes through.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "request cancelled")
    }

    /// Classifies a raw failure.
    pub fn from_failure(failure: Failure, access: Access) -> Self {
        let Failure {
            status,
            body,
            message,
        } = failure;

        let obj = body.as_ref().and_then(Value::as_object);
        let text = obj.and_then(|o| first_text(o, &["error", "message", "detail"]));
        let code = obj.and_then(|o| first_text(o, &["code"]));
        let field_errors = obj.and_then(parse_field_errors);
        let missing_resources = obj.and_then(parse_missing);

        let kind = match status {
            Some(401) => ErrorKind::Unauthorized,
            Some(404) => match access {
                Access::Read => ErrorKind::NotFoundOnRead,
                Access::Write => ErrorKind::NotFoundOnWrite,
            },
            Some(405) => ErrorKind::RouteUnsupported,
            Some(409) => ErrorKind::Conflict,
            _ if missing_resources.is_some() => ErrorKind::Conflict,
            Some(400) | Some(422) => ErrorKind::Validation,
            _ if field_errors.is_some() => ErrorKind::Validation,
            _ => ErrorKind::Unknown,
        };

        Self {
            kind,
            message: text.unwrap_or(message),
            code,
            field_errors,
            missing_resources,
            http_status: status,
        }
    }

    /// True for the structural failures that let a fallback route be tried.
    pub fn is_route_missing(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::NotFoundOnRead | ErrorKind::NotFoundOnWrite | ErrorKind::RouteUnsupported
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }

    /// Multi-line description with field errors and missing components.
    pub fn summary(&self) -> String {
        let mut out = match &self.code {
            Some(code) => format!("[{}] {}", code, self.message),
            None => self.message.clone(),
        };
        if let Some(fields) = &self.field_errors {
            for (field, messages) in fields {
                let _ = write!(out, "\n  {}: {}", field, messages.join(", "));
            }
        }
        if let Some(missing) = &self.missing_resources {
            for item in missing {
                let _ = write!(out, "\n  {}", item);
            }
        }
        out
    }
}

fn first_text(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match obj.get(*name)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn first_number(obj: &Map<String, Value>, names: &[&str]) -> Option<Number> {
    names.iter().find_map(|name| match obj.get(*name)? {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => serde_json::from_str::<Number>(s.trim()).ok(),
        _ => None,
    })
}

fn parse_field_errors(obj: &Map<String, Value>) -> Option<BTreeMap<String, Vec<String>>> {
    let details = obj.get("details")?.as_object()?;
    let fields: BTreeMap<String, Vec<String>> = details
        .iter()
        .map(|(field, messages)| {
            let messages = match messages {
                Value::Array(list) => list.iter().map(value_text).collect(),
                other => vec![value_text(other)],
            };
            (field.clone(), messages)
        })
        .collect();
    (!fields.is_empty()).then_some(fields)
}

fn parse_missing(obj: &Map<String, Value>) -> Option<Vec<MissingResource>> {
    let list = obj.get("missing")?.as_array()?;
    if list.is_empty() {
        return None;
    }
    Some(list.iter().map(MissingResource::from_value).collect())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
