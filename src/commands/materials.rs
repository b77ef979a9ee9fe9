//! `opsboard materials`: stock balances.

use clap::{Args, Subcommand};
use opsboard_core::ApiClient;

use super::output::print_value;
use super::{CommandError, OutputFormat};

/// Material and chemistry stock
#[derive(Debug, Args)]
pub struct MaterialsCommand {
    #[command(subcommand)]
    command: MaterialsSubcommand,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text", global = true)]
    format: OutputFormat,
}

#[derive(Debug, Subcommand)]
enum MaterialsSubcommand {
    /// Raw-material balances
    Balances,

    /// Chemistry element balances
    Chemistry,

    /// Check whether stock covers a recipe
    Availability {
        /// Recipe ID
        recipe_id: String,
    },
}

impl MaterialsCommand {
    pub async fn run(&self, client: &ApiClient) -> Result<(), CommandError> {
        let materials = client.materials();

        let value = match &self.command {
            MaterialsSubcommand::Balances => materials.balances().await?,
            MaterialsSubcommand::Chemistry => materials.chemistry_balances().await?,
            MaterialsSubcommand::Availability { recipe_id } => {
                materials.recipe_availability(recipe_id).await?
            }
        };
        print_value(&value, self.format)
    }
}
