//! `opsboard otk`: quality control inspections.

use clap::{Args, Subcommand};
use opsboard_core::{ApiClient, Inspection};

use super::output::print_value;
use super::{CommandError, OutputFormat, ViewArgs};

/// Quality control (OTK)
#[derive(Debug, Args)]
pub struct OtkCommand {
    #[command(subcommand)]
    command: OtkSubcommand,
}

#[derive(Debug, Subcommand)]
enum OtkSubcommand {
    /// Batches waiting for inspection
    Awaiting(ViewArgs),

    /// Inspected batches
    History(ViewArgs),

    /// Record the inspection result of a batch
    Accept {
        /// Batch ID
        batch_id: u64,

        /// Accepted quantity
        #[arg(long)]
        accepted: u64,

        /// Defective quantity
        #[arg(long, default_value_t = 0)]
        defect: u64,

        /// Reason for the defect
        #[arg(long)]
        reason: Option<String>,

        /// Free-form comment
        #[arg(long)]
        comment: Option<String>,

        /// Inspector name
        #[arg(long)]
        inspector: Option<String>,
    },
}

impl OtkCommand {
    pub async fn run(&self, client: &ApiClient) -> Result<(), CommandError> {
        let otk = client.otk();

        match &self.command {
            OtkSubcommand::Awaiting(view) => view.open(otk.awaiting_source(), None).await,
            OtkSubcommand::History(view) => view.open(otk.history_source(), None).await,
            OtkSubcommand::Accept {
                batch_id,
                accepted,
                defect,
                reason,
                comment,
                inspector,
            } => {
                let inspection = Inspection {
                    accepted: *accepted,
                    defect: *defect,
                    defect_reason: reason.clone(),
                    comment: comment.clone(),
                    inspector: inspector.clone(),
                };
                let updated = otk.accept_batch(*batch_id, &inspection).await?;
                println!(
                    "Batch {} inspected: {}",
                    batch_id,
                    inspection.verdict().as_str()
                );
                print_value(&updated, OutputFormat::Text)
            }
        }
    }
}
