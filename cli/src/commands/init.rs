use anyhow::Context;
use load::config::Config;
use load::database::State;
use load::ingest;

/// Applies the schema migrations and seeds the reference vocabularies.
/// Always runs against `DATABASE_URL`; routing does not apply to schema
/// management.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let url = config.require_database_url()?;
    let state = State::from_url(url)
        .await
        .context("failed to connect to the database")?;

    state
        .migrate()
        .await
        .context("failed to apply migrations")?;
    ingest::seed_reference_data(&state)
        .await
        .context("failed to seed reference data")?;

    println!("database initialized at {}", state.endpoint);
    Ok(())
}
