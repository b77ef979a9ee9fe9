//! Single-record commands: show, create, update, delete and actions.

use clap::Args;
use opsboard_core::{ApiClient, Resource};

use super::output::print_value;
use super::{parse_body, CommandError, OutputFormat};

/// Show one record
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Collection name
    resource: Resource,

    /// Record ID
    id: String,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl ShowCommand {
    pub async fn run(&self, client: &ApiClient) -> Result<(), CommandError> {
        let record = client.resource(self.resource).get(&self.id).await?;
        print_value(&record, self.format)
    }
}

/// Create a record from a JSON body
#[derive(Debug, Args)]
pub struct CreateCommand {
    /// Collection name
    resource: Resource,

    /// JSON body, or "-" to read it from stdin
    #[arg(long)]
    data: String,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl CreateCommand {
    pub async fn run(&self, client: &ApiClient) -> Result<(), CommandError> {
        let body = parse_body(&self.data)?;
        let created = client.resource(self.resource).create(body).await?;
        println!("Created {} record:", self.resource);
        print_value(&created, self.format)
    }
}

/// Update fields of a record from a JSON body
#[derive(Debug, Args)]
pub struct UpdateCommand {
    /// Collection name
    resource: Resource,

    /// Record ID
    id: String,

    /// JSON body with the fields to change, or "-" to read it from stdin
    #[arg(long)]
    data: String,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl UpdateCommand {
    pub async fn run(&self, client: &ApiClient) -> Result<(), CommandError> {
        let body = parse_body(&self.data)?;
        if body.as_object().is_some_and(|fields| fields.is_empty()) {
            return Err(CommandError::InvalidInput(
                "Nothing to update. Provide at least one field.".to_string(),
            ));
        }
        let updated = client.resource(self.resource).update(&self.id, body).await?;
        println!("Updated {} {}:", self.resource, self.id);
        print_value(&updated, self.format)
    }
}

/// Delete a record
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Collection name
    resource: Resource,

    /// Record ID
    id: String,
}

impl DeleteCommand {
    pub async fn run(&self, client: &ApiClient) -> Result<(), CommandError> {
        client.resource(self.resource).delete(&self.id).await?;
        println!("Deleted {} {}", self.resource, self.id);
        Ok(())
    }
}

/// Run a named action on a record, e.g. ship or deliver a shipment, or
/// confirm a chemistry task
#[derive(Debug, Args)]
pub struct ActionCommand {
    /// Collection name
    resource: Resource,

    /// Record ID
    id: String,

    /// Action name, e.g. ship, deliver, confirm
    name: String,

    /// JSON body, or "-" to read it from stdin
    #[arg(long)]
    data: Option<String>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

impl ActionCommand {
    pub async fn run(&self, client: &ApiClient) -> Result<(), CommandError> {
        let body = self.data.as_deref().map(parse_body).transpose()?;
        let result = client
            .resource(self.resource)
            .action(&self.id, &self.name, body)
            .await?;
        println!("{} {} {}: done", self.resource, self.id, self.name);
        print_value(&result, self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        action: ActionCommand,
    }

    #[test]
    fn test_action_args() {
        let cli = Cli::try_parse_from(["opsboard", "shipments", "8", "deliver"]).unwrap();
        assert_eq!(cli.action.resource, Resource::Shipments);
        assert_eq!(cli.action.id, "8");
        assert_eq!(cli.action.name, "deliver");
        assert!(cli.action.data.is_none());

        let cli = Cli::try_parse_from([
            "opsboard",
            "chemistry-tasks",
            "12",
            "confirm",
            "--data",
            "{}",
        ])
        .unwrap();
        assert_eq!(cli.action.resource, Resource::ChemistryTasks);
        assert_eq!(cli.action.data.as_deref(), Some("{}"));
    }

    #[test]
    fn test_action_requires_name() {
        assert!(Cli::try_parse_from(["opsboard", "shipments", "8"]).is_err());
    }
}
