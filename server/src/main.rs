//! Service shell: reads settings from the environment (and `.env`), opens the
//! pool, makes sure the tables exist and serves the command endpoint.
//!
//! Run from repo root: `cargo run -p eventreg-server`

use eventreg_sdk::{app, ensure_tables, AppState, ServiceSettings};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("eventreg_sdk=info,eventreg_server=info")),
        )
        .init();

    let settings = ServiceSettings::from_env()?;
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(settings.connect_options()?)
        .await?;
    ensure_tables(&pool).await?;

    let state = AppState {
        pool,
        default_organization_id: settings.default_organization_id,
    };

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("eventreg listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state)).await?;
    Ok(())
}
