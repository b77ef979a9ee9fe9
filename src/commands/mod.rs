mod analytics;
mod config_cmd;
mod lines;
mod list;
mod materials;
mod otk;
mod output;
mod production;
mod resource;
mod users;

pub use analytics::AnalyticsCommand;
pub use config_cmd::ConfigCommand;
pub use lines::LinesCommand;
pub use list::ListCommand;
use list::ViewArgs;
pub use materials::MaterialsCommand;
pub use otk::OtkCommand;
pub use production::ProductionCommand;
pub use resource::{ActionCommand, CreateCommand, DeleteCommand, ShowCommand, UpdateCommand};
pub use users::UsersCommand;

use std::time::Duration;

use clap::{Args, ValueEnum};
use opsboard_core::{
    ApiClient, ErrorEnvelope, HttpTransport, QuerySpec, ORDERING_KEY, PAGE_KEY, PAGE_SIZE_KEY,
    SEARCH_KEY,
};

use crate::config::Config;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Builds the API client described by the configuration.
pub fn api_client(config: &Config) -> ApiClient {
    let mut transport = HttpTransport::new(config.server_url.value.clone())
        .with_timeout(Duration::from_secs(config.timeout_secs.value))
        .on_unauthorized(|_| {
            eprintln!("The server rejected the API token. Set api_token in the config file or OPSBOARD_API_TOKEN.");
        });
    if let Some(token) = &config.api_token.value {
        transport = transport.with_token(token.clone());
    }
    ApiClient::new(transport)
}

/// Search, sort, paging and filter options shared by list-style commands.
#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    /// Free-text search
    #[arg(long)]
    pub search: Option<String>,

    /// Sort order, e.g. "-created_at"
    #[arg(long)]
    pub ordering: Option<String>,

    /// Page number (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Items per page (defaults to the configured page_size)
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Extra filter (can be repeated)
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_filter)]
    pub filters: Vec<(String, String)>,
}

impl QueryArgs {
    /// Query for a list view. `page_size` falls back to `default_page_size`
    /// when given; `None` leaves it to the server or the operation.
    pub fn to_query(&self, default_page_size: Option<u32>) -> QuerySpec {
        let mut query = QuerySpec::new()
            .with(PAGE_KEY, self.page)
            .with(PAGE_SIZE_KEY, self.page_size.or(default_page_size))
            .with(SEARCH_KEY, self.search.clone())
            .with(ORDERING_KEY, self.ordering.clone());
        for (key, value) in &self.filters {
            query.set(key.as_str(), value.as_str());
        }
        query
    }
}

/// Parses a `KEY=VALUE` filter. An empty value is allowed and clears the key.
pub fn parse_filter(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{}'", raw)),
    }
}

/// Parses a JSON request body given on the command line. `-` reads stdin.
pub fn parse_body(raw: &str) -> Result<serde_json::Value, CommandError> {
    let text = if raw == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        raw.to_string()
    };
    serde_json::from_str(&text)
        .map_err(|e| CommandError::InvalidInput(format!("invalid JSON body: {}", e)))
}

/// Errors from commands that talk to the API
#[derive(Debug)]
pub enum CommandError {
    Api(ErrorEnvelope),
    InvalidInput(String),
    Io(std::io::Error),
    Output(serde_json::Error),
    ViewClosed,
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Api(e) => write!(f, "{}", e.summary()),
            CommandError::InvalidInput(msg) => write!(f, "{}", msg),
            CommandError::Io(e) => write!(f, "I/O error: {}", e),
            CommandError::Output(e) => write!(f, "Failed to render output: {}", e),
            CommandError::ViewClosed => write!(f, "List view stopped before a result arrived"),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<ErrorEnvelope> for CommandError {
    fn from(e: ErrorEnvelope) -> Self {
        CommandError::Api(e)
    }
}

impl From<std::io::Error> for CommandError {
    fn from(e: std::io::Error) -> Self {
        CommandError::Io(e)
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(e: serde_json::Error) -> Self {
        CommandError::Output(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(filters: &[&str]) -> QueryArgs {
        QueryArgs {
            search: Some(String::new()),
            ordering: Some("-created_at".to_string()),
            page: 2,
            page_size: None,
            filters: filters.iter().map(|f| parse_filter(f).unwrap()).collect(),
        }
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(
            parse_filter("status=in_progress").unwrap(),
            ("status".to_string(), "in_progress".to_string())
        );
        assert_eq!(
            parse_filter("line=").unwrap(),
            ("line".to_string(), String::new())
        );
        assert!(parse_filter("=x").is_err());
        assert!(parse_filter("status").is_err());
    }

    #[test]
    fn test_query_args_normalize() {
        let query = args(&["status=open", "line="]).to_query(Some(20));
        assert_eq!(
            query,
            QuerySpec::new()
                .with(PAGE_KEY, 2u32)
                .with(PAGE_SIZE_KEY, 20u32)
                .with(ORDERING_KEY, "-created_at")
                .with("status", "open")
        );
        assert!(!query.contains(SEARCH_KEY));
    }

    #[test]
    fn test_query_args_without_default_page_size() {
        let query = args(&[]).to_query(None);
        assert!(!query.contains(PAGE_SIZE_KEY));
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(
            parse_body(r#"{"name": "Линия 2"}"#).unwrap(),
            serde_json::json!({ "name": "Линия 2" })
        );
        assert!(matches!(
            parse_body("{broken").unwrap_err(),
            CommandError::InvalidInput(_)
        ));
    }

    #[test]
    fn test_api_error_display_uses_summary() {
        let err = CommandError::from(ErrorEnvelope::unknown("connection refused"));
        assert_eq!(err.to_string(), "connection refused");
    }
}
