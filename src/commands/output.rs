//! Terminal rendering of list results, records and list view states.

use opsboard_core::{ListResult, ListState};
use serde_json::Value;

use super::{CommandError, OutputFormat};

const LABEL_WIDTH: usize = 36;
const LABEL_FIELDS: [&str; 6] = ["name", "title", "number", "code", "batch_number", "username"];
const STATUS_FIELDS: [&str; 2] = ["status", "otk_status"];

pub fn print_list(result: &ListResult, format: OutputFormat) -> Result<(), CommandError> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        OutputFormat::Text => {
            if result.is_empty() {
                println!("No items found");
            } else {
                println!("{:<8}  {:<36}  STATUS", "ID", "NAME");
                println!("{}", "-".repeat(60));
                for item in &result.items {
                    println!(
                        "{:<8}  {:<36}  {}",
                        field(item, &["id"]),
                        truncate(&field(item, &LABEL_FIELDS), LABEL_WIDTH),
                        field(item, &STATUS_FIELDS)
                    );
                }
            }
            println!();
            println!("{}", footer(result));
        }
    }
    Ok(())
}

pub fn print_value(value: &Value, format: OutputFormat) -> Result<(), CommandError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(value)?),
        OutputFormat::Text => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// Prints a settled view state. Errors go to stderr; data from the last
/// successful fetch is still shown under them.
pub fn print_state(state: &ListState, format: OutputFormat) -> Result<(), CommandError> {
    if let Some(error) = &state.error {
        eprintln!("Error: {}", error.summary());
        if state.data.is_some() {
            eprintln!("(showing previous results)");
        }
    }
    if let Some(data) = &state.data {
        print_list(data, format)?;
    }
    Ok(())
}

fn footer(result: &ListResult) -> String {
    match &result.meta {
        Some(meta) => {
            let mut line = format!("Page {} of {}", meta.page, meta.total_pages);
            if let Some(total) = meta.total_count {
                line.push_str(&format!(" ({} total)", total));
            }
            line
        }
        None => format!("Total: {} item(s)", result.len()),
    }
}

fn field(item: &Value, names: &[&str]) -> String {
    names
        .iter()
        .find_map(|name| match item.get(*name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() > width {
        let kept: String = text.chars().take(width - 3).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}
