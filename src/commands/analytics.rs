//! `opsboard analytics`: sales, shipment and stock reports.

use clap::{Args, Subcommand};
use opsboard_core::{ApiClient, QuerySpec};
use serde_json::Value;

use super::output::print_value;
use super::{parse_filter, CommandError, OutputFormat};

/// Sales and stock analytics
#[derive(Debug, Args)]
pub struct AnalyticsCommand {
    #[command(subcommand)]
    command: AnalyticsSubcommand,

    /// Report parameter, e.g. date_from=2024-01-01 (can be repeated)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_filter, global = true)]
    params: Vec<(String, String)>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text", global = true)]
    format: OutputFormat,
}

#[derive(Debug, Subcommand)]
enum AnalyticsSubcommand {
    /// Totals for sales, shipments and finished-goods stock
    Summary,

    /// Revenue breakdown
    Revenue,

    /// Expense breakdown
    Expenses,
}

impl AnalyticsCommand {
    pub async fn run(&self, client: &ApiClient) -> Result<(), CommandError> {
        let analytics = client.analytics();
        let query = self.query();

        match self.command {
            AnalyticsSubcommand::Summary => {
                let summary = analytics.summary(query).await?;
                match self.format {
                    OutputFormat::Json => print_value(&summary, OutputFormat::Json),
                    OutputFormat::Text => {
                        for line in summary_lines(&summary) {
                            println!("{}", line);
                        }
                        Ok(())
                    }
                }
            }
            AnalyticsSubcommand::Revenue => {
                print_value(&analytics.revenue_details(query).await?, self.format)
            }
            AnalyticsSubcommand::Expenses => {
                print_value(&analytics.expense_details(query).await?, self.format)
            }
        }
    }

    fn query(&self) -> QuerySpec {
        let mut query = QuerySpec::new();
        for (key, value) in &self.params {
            query.set(key.as_str(), value.as_str());
        }
        query
    }
}

/// Text rendering of the summary cards. Sections missing from the report are
/// skipped.
fn summary_lines(summary: &Value) -> Vec<String> {
    let section = |name: &str| summary.get(name).filter(|v| !v.is_null());
    let amount = |block: &Value, key: &str| match block.get(key) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        _ => "0".to_string(),
    };

    let mut lines = Vec::new();
    if let Some(sales) = section("sales") {
        lines.push(format!("Sales:      {}", amount(sales, "total_quantity")));
    }
    if let Some(shipments) = section("shipments") {
        lines.push(format!("Shipments:  {}", amount(shipments, "total_quantity")));
    }
    if let Some(warehouse) = section("warehouse") {
        lines.push(format!(
            "Warehouse:  {} available, {} reserved",
            amount(warehouse, "available"),
            amount(warehouse, "reserved")
        ));
    }
    if lines.is_empty() {
        lines.push("No data to display".to_string());
    }
    lines
}
