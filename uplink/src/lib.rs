//! # uplink: Upload and Model Gateway for LLM Chat Frontends
//!
//! `uplink` is a self-hostable backend gateway for LLM chat applications. It sits between a
//! chat frontend and the services the frontend cannot talk to directly: hosted model
//! providers and the blob store that holds user uploads. The frontend keeps the session and
//! conversation state; this service handles everything that needs server-held credentials.
//!
//! ## Overview
//!
//! Chat frontends need three things from their backend: streaming completions from model
//! providers (whose API keys must not reach the browser), a catalog of models the user can
//! pick from, and a way to accept file uploads without proxying file bytes through the app
//! server. `uplink` provides all three behind a small authenticated API, verifying the
//! session tokens the frontend's auth layer mints with a shared secret.
//!
//! ### What It Does
//!
//! When a client requests a chat completion, the service resolves the requested catalog model
//! to a hosted provider model, opens a streaming completion against the provider's
//! OpenAI-compatible endpoint, and re-encodes the response as server-sent events. Reasoning
//! models get their thinking split out of the answer text into separate reasoning deltas.
//!
//! For file uploads, the service brokers direct-to-store uploads: the browser asks for a
//! scoped client token, uploads straight to the blob store, and the store calls back with an
//! HMAC-signed completion notification. Upload size and content-type policy is embedded in
//! the token, so the store enforces it even though the bytes never pass through here.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for the HTTP layer
//! and is deliberately stateless: sessions are verified (never created) here, conversation
//! history lives with the frontend, and uploaded files live in the blob store. Nothing needs
//! a database.
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) exposes the chat, model catalog, and upload endpoints under
//! `/api/*`, with interactive documentation served at `/docs`.
//!
//! The **authentication layer** ([`auth`]) validates the session JWT on every request, read
//! from the `Authorization` bearer header or from the session cookie.
//!
//! The **AI layer** ([`ai`]) maps stable catalog model ids to provider-backed models and
//! adapts provider streams, including reasoning extraction for thinking models.
//!
//! The **storage layer** ([`storage`]) mints scoped client tokens for direct-to-store
//! uploads and authenticates the store's signed completion callbacks.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use uplink::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Parse CLI arguments and load configuration
//!     let args = uplink::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     // Initialize telemetry (structured logging and optional OpenTelemetry)
//!     uplink::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     // Create and start the application
//!     let app = Application::new(config)?;
//!
//!     // Run with graceful shutdown on Ctrl+C
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod ai;
pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
mod openapi;
pub mod storage;
pub mod telemetry;
mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use crate::ai::catalog::ModelRegistry;
use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use crate::storage::StorageProvider;
use axum::http::HeaderValue;
use axum::{
    Router, http,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use types::UserId;

/// Application state shared across all request handlers.
///
/// This struct contains all the shared resources needed by the API handlers:
/// configuration, the model registry, and the storage provider.
///
/// # Fields
///
/// - `config`: Application configuration loaded from environment/files
/// - `registry`: Catalog of models the service exposes, resolved to provider backends
/// - `storage`: Blob store used to broker client uploads
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .registry(registry)
///     .storage(storage)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub registry: Arc<ModelRegistry>,
    pub storage: Arc<dyn StorageProvider>,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .allow_headers(vec![http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// This function constructs the complete Axum router with:
/// - Chat completion streaming (`/api/chat`)
/// - Model catalog listing (`/api/models`)
/// - Upload brokering (`/api/files/upload`)
/// - Interactive API documentation at `/docs`
/// - CORS configuration
/// - Tracing middleware
///
/// # Errors
///
/// Returns an error if the CORS configuration is invalid.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .route("/api/chat", post(api::handlers::chat::chat))
        .route("/api/models", get(api::handlers::models::list_models))
        .route("/api/files/upload", post(api::handlers::uploads::upload))
        .with_state(state.clone())
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    // Create CORS layer from config
    let cors_layer = create_cors_layer(&state.config)?;
    let router = router.layer(cors_layer);

    // Add tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] builds the model registry and storage provider from
///    configuration and assembles the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal resolves, in-flight requests drain and
///    telemetry is flushed
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting gateway with configuration: {:#?}", config);

        let registry = Arc::new(ModelRegistry::from_config(&config.providers));
        let storage = storage::create_provider(&config.storage)?;

        let state = AppState::builder()
            .config(config.clone())
            .registry(registry)
            .storage(storage)
            .build();

        let router = build_router(state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Gateway listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // Shutdown telemetry
        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
