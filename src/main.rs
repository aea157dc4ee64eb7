use std::{net::SocketAddr, process};

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tokio::{net::TcpListener, signal::ctrl_c};
use once_cell::sync::Lazy;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod controllers;
mod db;
mod middleware;
mod models;
mod routes;
mod state;
mod store;
mod utils;
mod voting;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    Lazy::force(&controllers::health::START_TIME);

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            process::exit(1);
        }
    };

    let origin = match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(_) => {
            error!("Failed to parse CORS origin: {}", config.cors_origin);
            process::exit(1);
        }
    };
    let addr = config.server_addr;

    info!("Initializing state...");
    let app_state = match AppState::connect(config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize poll store: {e}");
            process::exit(1);
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            header::COOKIE,
        ])
        .allow_credentials(true);

    let app = Router::new()
        .route("/", get(controllers::health::root))
        .with_state(app_state.clone())
        .nest("/api/polls", routes::poll_routes::poll_routes(app_state.clone()))
        .merge(routes::poll_routes::creator_routes(app_state.clone()))
        .nest("/api/feedback", routes::feedback_routes::feedback_routes(app_state.clone()))
        .merge(routes::live_routes::live_routes(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to address {addr}: {e}");
            process::exit(1);
        }
    };

    info!("Server running at http://{addr}");

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        error!("Server error: {e}");
        process::exit(1);
    }

    info!("Server shut down");
}

async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
