//! `opsboard lines`: shift control for production lines.

use clap::{Args, Subcommand};
use opsboard_core::{ApiClient, Resource};

use super::output::print_value;
use super::{CommandError, OutputFormat};

/// Production line shifts
#[derive(Debug, Args)]
pub struct LinesCommand {
    #[command(subcommand)]
    command: LinesSubcommand,
}

#[derive(Debug, Subcommand)]
enum LinesSubcommand {
    /// Open a shift on a line
    Open {
        /// Line ID
        id: String,
    },

    /// Close the current shift on a line
    Close {
        /// Line ID
        id: String,
    },

    /// Show the shift history of a line
    History {
        /// Line ID
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl LinesCommand {
    pub async fn run(&self, client: &ApiClient) -> Result<(), CommandError> {
        let lines = client.resource(Resource::Lines);

        match &self.command {
            LinesSubcommand::Open { id } => {
                let line = lines.action(id, "open", None).await?;
                println!("Shift opened on line {}", id);
                print_value(&line, OutputFormat::Text)
            }
            LinesSubcommand::Close { id } => {
                let line = lines.action(id, "close", None).await?;
                println!("Shift closed on line {}", id);
                print_value(&line, OutputFormat::Text)
            }
            LinesSubcommand::History { id, format } => {
                let history = lines.view(id, "history").await?;
                print_value(&history, *format)
            }
        }
    }
}
