use bookrev_types::{
    config::BackendConfig,
    general::{ValidEmail, ValidUsername},
};
use clap::Parser;
use garde::Validate as _;

use crate::commands::{open_pool, Executor};

#[derive(Parser, Debug)]
pub struct CreateUserCmd {
    #[command(flatten)]
    backend: BackendConfig,
    #[arg(short, long, help = "User name - letters, digits and underscore")]
    username: ValidUsername,
    #[arg(short, long, help = "User email, used for login")]
    email: ValidEmail,
    #[arg(short, long, help = "User password, at least 6 characters")]
    password: String,
}

impl Executor for CreateUserCmd {
    async fn run(self) -> anyhow::Result<()> {
        let new_user = bookrev_dal::user::CreateUser {
            username: self.username,
            email: self.email,
            password: self.password,
        };
        new_user.validate()?;
        let pool = open_pool(&self.backend).await?;
        let repository = bookrev_dal::user::UserRepository::new(pool);
        let user = repository.create(new_user).await?;
        println!("Created user {} with id {}", user.username, user.id);

        Ok(())
    }
}
