use tracing_subscriber::EnvFilter;

use covenant_core::AppConfig;
use covenant_server::{build_app, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                "covenant=info"
                    .parse()
                    .expect("static tracing directive is valid"),
            ),
        )
        .init();

    let config = AppConfig::load().expect("Invalid configuration");
    let host = config.server_host.clone();
    let port = config.server_port;

    let state = AppState::from_config(config).expect("Failed to initialize classifiers");
    let app = build_app(state);

    let addr = format!("{host}:{port}");
    tracing::info!("Contract classifier listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app).await.expect("Server error");
}
