// region:    --- Imports
use restoration_auction::config::Config;
use restoration_auction::database::DatabaseManager;
use restoration_auction::routes;
use restoration_auction::state::AppState;
use tokio::net::TcpListener;
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("{:<12} --> Configuration error: {}", "Main", e);
            return Err(e.into());
        }
    };

    let db_manager = DatabaseManager::connect(&config).await?;

    if let Err(e) = db_manager.initialize_database(config.reset_database).await {
        error!("{:<12} --> Database initialization failed: {:?}", "Main", e);
        return Err(e.into());
    }
    info!("{:<12} --> Database initialized", "Main");

    let port = config.port;
    let routes_all = routes::app(AppState::new(db_manager, config));

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
