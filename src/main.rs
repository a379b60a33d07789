use anyhow::Context;
use axum::Router;
use clap::Parser;
use jokeshop::{
    AppState, app, auth,
    cli::{Args, Command},
    config::Config,
    db,
};
use tokio::{net::TcpListener, signal::ctrl_c};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::SameSite};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::load()?;

    let db_pool = db::connect(&config.database_url, config.max_connections)
        .await
        .with_context(|| format!("opening {}", config.database_url))?;

    match args.command.unwrap_or_default() {
        Command::Serve => {
            let session_layer = SessionManagerLayer::new(MemoryStore::default())
                .with_secure(config.secure_cookies)
                .with_same_site(SameSite::Lax)
                .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
                    config.session_inactivity_minutes,
                )));

            serve(app(AppState { db_pool }, session_layer), config.port).await
        }
        Command::InitModerator { email, password } => {
            let user = auth::init_moderator(&db_pool, &email, &password).await?;
            info!(user_id = %user.id, email = %user.email, "moderator ready");
            Ok(())
        }
    }
}

async fn serve(app: Router, port: u16) -> anyhow::Result<()> {
    let address = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                error!("Failed to install Ctrl+C handler: {err}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                error!("Failed to install signal handler: {err}");
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
