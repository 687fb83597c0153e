mod bucket_details;
mod cli;
mod config;
mod dashboard;
mod error;
mod handlers;
mod instances;
mod models;
mod pagination;
mod regions;
mod storage;
#[cfg(test)]
mod test_support;

use std::sync::Arc;
use axum::Router;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::error::AppError;
use crate::instances::InstanceRegistry;
use crate::regions::Catalog;
use crate::storage::StorageEngine;

pub struct AppState {
    pub storage: StorageEngine,
    pub instances: InstanceRegistry,
    pub catalog: Catalog,
    pub config: Config,
}

impl AppState {
    pub fn open(config: Config) -> Result<Self, AppError> {
        Ok(Self {
            storage: StorageEngine::new(&config.data_dir)?,
            instances: InstanceRegistry::new(&config.data_dir)?,
            catalog: Catalog,
            config,
        })
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Console pages
        .merge(dashboard::routes())
        // JSON API
        .nest("/api", handlers::api_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloudshelf=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = Config::default();
    if let Some(data_dir) = cli.data_dir.clone() {
        config.data_dir = data_dir;
    }

    match cli.command {
        None => serve(config).await,
        Some(Commands::Serve { host, port }) => {
            config.host = host;
            config.port = port;
            serve(config).await
        }
        Some(command) => cli::run_cli(command, config),
    }
}

async fn serve(config: Config) {
    let state = match AppState::open(config.clone()) {
        Ok(state) => Arc::new(state),
        Err(e) => {
            tracing::error!("Failed to open data directory '{}': {}", config.data_dir, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Data directory: {}", config.data_dir);
    tracing::info!("Default page size: {}", config.default_page_size);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Console:  http://{}/", addr);
    tracing::info!("API:      http://{}/api", addr);

    if let Err(e) = axum::serve(listener, app(state)).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
