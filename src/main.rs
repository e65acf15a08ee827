use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser; // for cli
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use storefront_api::{AppState, Args, MemoryCounterStore, MemoryStore, router};

// this is main async function with tokio
#[tokio::main]
async fn main() -> std::io::Result<()> {
    // parse cli arguments
    let args = Args::parse();
    init_tracing();

    let rate_limits = args.rate_limit_config();
    info!(?rate_limits, "rate limits loaded");

    // creating shared state
    let state = Arc::new(AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryCounterStore::new()),
        rate_limits,
        args.trust_proxy_headers,
    ));

    let app = router(state);

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("storefront api running on http://{addr}");
    // peer address feeds the per-ip rate limiter
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
