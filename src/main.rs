use anyhow::Result;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use restaurant_ops::{
    app_state::AppState,
    auth::JwtService,
    bootstrap, config, db, routes,
};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let config = config::load()?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let pool = db::create_pool(&config.database).await?;
    let state = AppState::new(
        pool,
        JwtService::with_config(config.jwt.clone()),
        config.booking.default_restaurant_id,
    );

    tracing::info!(
        booking_restaurant_id = config.booking.default_restaurant_id,
        "Bootstrapping..."
    );
    bootstrap::serve("Restaurant Ops", routes::app(state), &config.server).await
}
