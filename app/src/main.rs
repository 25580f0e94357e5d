//! DrivePicz web server.

use auth::{session_secret_from_env, GoogleOAuth, OAuthSettings, SessionCodec};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use web::{router, AppState, ThumbnailMode};

mod config;
mod logging;

#[derive(Parser)]
#[command(name = "drivepicz", author, version, about = "DrivePicz gallery server")]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override log level (e.g. info, debug)
    #[arg(long)]
    log_level: Option<String>,
    /// Address to listen on, e.g. 0.0.0.0:3000
    #[arg(long)]
    listen_addr: Option<String>,
    /// Public base URL used to build the OAuth redirect
    #[arg(long)]
    public_url: Option<String>,
    /// Serve previews through the server (proxy) or redirect to them
    #[arg(long)]
    thumbnail_mode: Option<ThumbnailMode>,
    /// Directory for logs and local state
    #[arg(long)]
    data_path: Option<PathBuf>,
    /// Mark cookies Secure (required behind HTTPS)
    #[arg(long)]
    secure_cookies: bool,
    /// Write the effective configuration back to the config file and exit
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let overrides = config::AppConfigOverrides {
        log_level: cli.log_level.clone(),
        listen_addr: cli.listen_addr.clone(),
        public_url: cli.public_url.clone(),
        thumbnail_mode: cli.thumbnail_mode,
        data_path: cli.data_path.clone(),
        server_url: None,
        secure_cookies: cli.secure_cookies,
    };
    let cfg = config::AppConfig::load_from(cli.config.clone()).apply_overrides(&overrides);

    if cli.save_config {
        cfg.save_to(cli.config.clone())?;
        println!("Configuration saved");
        return Ok(());
    }

    let _guard = logging::init(
        &cfg.log_level,
        &cfg.data_path,
        "drivepicz.log",
        logging::Console::Stdout,
    )?;

    let mut settings = cfg.web_settings();
    if let Ok(url) = std::env::var("DRIVE_API_URL") {
        settings.drive_api_url = url;
    }

    let oauth = OAuthSettings::from_env(settings.redirect_url())
        .and_then(|s| GoogleOAuth::new(&s))
        .map(|o| o.with_timeout(settings.request_timeout));

    let (secret, generated) = session_secret_from_env();
    if generated {
        tracing::warn!(
            target: "config",
            "SESSION_SECRET is not set; using a random secret, sessions end on restart"
        );
    }

    let state = Arc::new(AppState::new(
        oauth,
        SessionCodec::new(secret.as_bytes()),
        settings,
    ));

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        public_url = %cfg.public_url,
        mode = ?cfg.thumbnail_mode,
        "DrivePicz listening"
    );
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
