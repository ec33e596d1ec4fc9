use bookrev_types::config::BackendConfig;

pub mod create_user;
pub mod recompute;

#[allow(async_fn_in_trait)]
pub trait Executor {
    async fn run(self) -> anyhow::Result<()>;
}

/// Opens server database, schema is migrated if needed
async fn open_pool(backend: &BackendConfig) -> anyhow::Result<bookrev_dal::Pool> {
    let pool = bookrev_dal::new_pool(&backend.database_url()).await?;
    Ok(pool)
}
