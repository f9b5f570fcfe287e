pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::types::Role;

#[derive(Parser)]
#[command(name = "wavy")]
#[command(about = "Wavy CLI - maintenance tasks for the Wavy Services API database")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Apply pending database migrations")]
    Migrate,

    #[command(about = "Create an account with the admin role")]
    CreateAdmin {
        #[arg(long, help = "Login email")]
        email: String,
        #[arg(long, help = "Initial password (6 characters minimum)")]
        password: String,
    },

    #[command(about = "Grant a role to an existing account")]
    GrantRole {
        #[arg(long, help = "Account email")]
        email: String,
        #[arg(long, value_parser = parse_role, help = "admin, user_cra or user")]
        role: Role,
    },

    #[command(about = "Delete expired OTP codes and reset tokens, expire stale invitations")]
    CleanupTokens,

    #[command(about = "Show the effective configuration with secrets redacted")]
    Config,
}

fn parse_role(value: &str) -> Result<Role, String> {
    value.parse()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = crate::config::config().clone();

    match cli.command {
        Commands::Migrate => commands::database::migrate(&config, output_format).await,
        Commands::CreateAdmin { email, password } => {
            commands::accounts::create_admin(&config, &email, &password, output_format).await
        }
        Commands::GrantRole { email, role } => {
            commands::accounts::grant_role(&config, &email, role, output_format).await
        }
        Commands::CleanupTokens => commands::database::cleanup_tokens(&config, output_format).await,
        Commands::Config => commands::config::show(&config, output_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grant_role() {
        let cli = Cli::try_parse_from(["wavy", "--json", "grant-role", "--email", "a@b.fr", "--role", "user_cra"])
            .unwrap();
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
        assert!(matches!(cli.command, Commands::GrantRole { role: Role::UserCra, .. }));
    }

    #[test]
    fn rejects_unknown_role() {
        assert!(Cli::try_parse_from(["wavy", "grant-role", "--email", "a@b.fr", "--role", "root"]).is_err());
    }
}
