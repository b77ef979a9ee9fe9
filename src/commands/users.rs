//! `opsboard users`: access management.

use clap::{Args, Subcommand};
use opsboard_core::ApiClient;

use super::output::print_value;
use super::{CommandError, OutputFormat};

/// User administration
#[derive(Debug, Args)]
pub struct UsersCommand {
    #[command(subcommand)]
    command: UsersSubcommand,
}

#[derive(Debug, Subcommand)]
enum UsersSubcommand {
    /// Replace the access keys granted to a user
    Access {
        /// User ID
        id: String,

        /// Access keys, e.g. otk production (none revokes all access)
        keys: Vec<String>,
    },
}

impl UsersCommand {
    pub async fn run(&self, client: &ApiClient) -> Result<(), CommandError> {
        match &self.command {
            UsersSubcommand::Access { id, keys } => {
                let user = client.users().update_access(id, keys).await?;
                println!("Access updated for user {}", id);
                print_value(&user, OutputFormat::Text)
            }
        }
    }
}
