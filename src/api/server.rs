//! REST API Server implementation

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, info};

use super::routes::{self, AppState};
use crate::config::WardenConfig;
use crate::heartbeat::HeartbeatScheduler;
use crate::supervisor::{SnapshotWriter, Supervisor};

/// Run the REST API server (blocking)
pub async fn start_server(config: WardenConfig) -> Result<()> {
    info!("Starting Warden API server");
    info!("Host: {}", config.server.host);
    info!("Port: {}", config.server.port);
    info!("Launch program: {}", config.launch.program);
    info!(
        "Snapshot file: {}",
        config.persistence.snapshot_path.display()
    );

    let writer = SnapshotWriter::new(config.persistence.snapshot_path.clone());
    let supervisor = Supervisor::new(config.launch_spec(), writer);
    let heartbeat = HeartbeatScheduler::new(config.heartbeat_interval());

    let app_state = AppState {
        supervisor,
        heartbeat,
        kill_timeout: config.kill_timeout(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    let api_routes = routes::create_routes(app_state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let app = Router::new()
        .nest("/api", api_routes)
        .fallback(|| async { (axum::http::StatusCode::NOT_FOUND, "Not found") });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Warden API server listening on http://{addr}");
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
