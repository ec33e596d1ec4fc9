use clap::{Parser, Subcommand};

use crate::commands::{create_user::CreateUserCmd, recompute::RecomputeRatingsCmd};

#[derive(Parser)]
#[command(
    version,
    about,
    long_about = "CLI for bookrev - administrative commands working directly with the server database."
)]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    CreateUser(CreateUserCmd),
    RecomputeRatings(RecomputeRatingsCmd),
}

impl crate::commands::Executor for Command {
    async fn run(self) -> anyhow::Result<()> {
        match self {
            Command::CreateUser(cmd) => cmd.run().await,
            Command::RecomputeRatings(cmd) => cmd.run().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let config = CliConfig::try_parse_from([
            "bookrev-cli",
            "create-user",
            "--data-dir",
            "/tmp/bookrev",
            "--username",
            "bilbo",
            "--email",
            "bilbo@shire.me",
            "--password",
            "precious",
        ])
        .unwrap();
        assert!(matches!(config.command, Command::CreateUser(_)));

        let config =
            CliConfig::try_parse_from(["bookrev-cli", "recompute-ratings", "--book-id", "7"])
                .unwrap();
        assert!(matches!(config.command, Command::RecomputeRatings(_)));
    }

    #[test]
    fn test_invalid_email_rejected() {
        let res = CliConfig::try_parse_from([
            "bookrev-cli",
            "create-user",
            "--username",
            "bilbo",
            "--email",
            "not-an-email",
            "--password",
            "precious",
        ]);
        assert!(res.is_err());
    }
}
