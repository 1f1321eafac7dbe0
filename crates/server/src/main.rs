mod api;
mod cli;
mod router;
mod startup;
mod state;

use clap::Parser;
use tracing::info;

use cli::{Cli, Command};

fn load_config() -> examly_core::Config {
    examly_core::config::load_dotenv();
    examly_core::Config::from_env()
}

async fn serve(mut config: examly_core::Config, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config.log_summary();

    let state = startup::build_app_state(&config).await?;
    let app = router::build_router(state, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config();

    match cli.command {
        Some(Command::Extract { path, summary }) => cli::extract(&path, summary),
        Some(Command::Serve { host, port }) => serve(config, host, port).await,
        None => serve(config, None, None).await,
    }
}
