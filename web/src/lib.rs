//! Axum storefront for Printworks.
//!
//! The web layer is a thin consumer of the store and checkout crates: it
//! parses requests, resolves the visitor's session, calls one operation,
//! and renders HTML, JSON, XML, or image bytes. All state is constructed
//! once at startup in [`AppState`] and shared behind an `Arc`; the only
//! background work is the session expiry sweep.

pub mod config;
pub mod error;
pub mod handlers;
pub mod images;
pub mod state;
pub mod templates;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post, put};
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt};

pub use config::Config;
pub use error::{AppError, PageError};
pub use state::{AppState, SharedState};

/// Assemble the full route table over a prepared state.
pub fn router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config);
    let static_dir = state.config.static_dir.clone();

    Router::new()
        // Pages
        .route("/", get(handlers::pages::home))
        .route("/shop/:title", get(handlers::pages::product))
        .route("/cart", get(handlers::pages::cart_page))
        .route("/checkout", get(handlers::pages::checkout_page))
        // Cart API
        .route("/cart/items", post(handlers::cart::add_item))
        .route("/cart/increase", post(handlers::cart::increase))
        .route("/cart/decrease", post(handlers::cart::decrease))
        .route("/cart/delete", post(handlers::cart::delete_item))
        .route("/cart/quantity", get(handlers::cart::quantity))
        .route("/cart/validate_total", post(handlers::cart::validate_total))
        // Checkout handoff
        .route("/checkout/session", post(handlers::checkout::create_checkout))
        // Session bootstrap
        .route("/session/bootstrap", get(handlers::session::bootstrap))
        // Feed and images
        .route("/feed/google", get(handlers::feed::google_feed))
        .route("/images/:title", get(handlers::images::hosted_image))
        // Mailing list
        .route("/subscribe", post(handlers::subscribe::subscribe))
        // Admin portal
        .route("/portal", get(handlers::portal::login_page))
        .route("/portal/login", post(handlers::portal::login))
        .route("/portal/logout", post(handlers::portal::logout))
        .route("/portal/admin", get(handlers::portal::admin_page))
        .route("/portal/images", post(handlers::portal::add_image))
        .route("/portal/images/:title", put(handlers::portal::swap_image))
        // Static assets
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
        .allow_origin(AllowOrigin::list(origins))
}

/// Boot the storefront: configuration, state, sweep task, listener.
///
/// # Errors
///
/// Fails on bad configuration or when the listener cannot bind.
pub async fn start_server() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::from_env()?;
    let bootstrap_store = printworks_store::TableStore::new(
        &config.table_store_url,
        &config.table_store_token,
    );
    let config = config.overlay_keys(&bootstrap_store).await?;
    config.ensure_secrets()?;
    let state = AppState::new(config)?;

    tracing::info!(
        ttl_minutes = state.config.session_ttl.num_minutes(),
        interval_secs = state.config.sweep_interval.as_secs(),
        "starting session sweep"
    );
    tokio::spawn(printworks_store::sweep::run(
        Arc::clone(&state.sessions),
        state.config.session_ttl,
        state.config.sweep_interval,
    ));

    // App-wide request rate limit, keyed by peer address.
    let governor = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(5)
            .burst_size(20)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate-limit configuration"))?,
    );
    let app = router(Arc::clone(&state)).layer(GovernorLayer { config: governor });

    let listener = tokio::net::TcpListener::bind(&state.config.bind_address).await?;
    tracing::info!(address = %state.config.bind_address, "storefront listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("storefront shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received Ctrl+C, shutting down");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!("received terminate signal, shutting down");
            }
            Err(error) => {
                tracing::error!(%error, "could not install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
