//! `opsboard production`: orders in work, batches and releasing orders.

use clap::{Args, Subcommand};
use opsboard_core::ApiClient;

use super::output::print_value;
use super::{CommandError, OutputFormat, ViewArgs};
use crate::config::Config;

/// Production planning
#[derive(Debug, Args)]
pub struct ProductionCommand {
    #[command(subcommand)]
    command: ProductionSubcommand,
}

#[derive(Debug, Subcommand)]
enum ProductionSubcommand {
    /// List orders currently in production
    Orders(ViewArgs),

    /// List production batches
    Batches(ViewArgs),

    /// Release part of an order into production
    Release {
        /// Order ID
        order_id: u64,

        /// Quantity to release
        #[arg(long, short)]
        quantity: u64,
    },
}

impl ProductionCommand {
    pub async fn run(&self, client: &ApiClient, config: &Config) -> Result<(), CommandError> {
        let production = client.production();

        match &self.command {
            ProductionSubcommand::Orders(view) => {
                // The legacy route picks its own page size when none is given.
                view.open(production.orders_source(), None).await
            }
            ProductionSubcommand::Batches(view) => {
                view.open(production.batches_source(), Some(config.page_size.value))
                    .await
            }
            ProductionSubcommand::Release { order_id, quantity } => {
                if *quantity == 0 {
                    return Err(CommandError::InvalidInput(
                        "Quantity must be a positive number".to_string(),
                    ));
                }
                let released = production.release_order(*order_id, *quantity).await?;
                println!("Released {} unit(s) of order {}", quantity, order_id);
                print_value(&released, OutputFormat::Text)
            }
        }
    }
}
