//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the page shells
//! - Wire up middleware (CSP, hardening headers, limits, request ID, tracing)
//! - Bind server to listener and drain on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GateConfig;
use crate::http::middleware::content_security_policy;
use crate::http::pages;
use crate::lifecycle::Shutdown;
use crate::security::{headers::hardening_headers, SecurityHeaderBuilder};

/// HTTP server for the gate's pages.
pub struct HttpServer {
    router: Router,
    config: GateConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GateConfig) -> Self {
        let router = Self::build_router(&config);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &GateConfig) -> Router {
        let mut router = Router::new()
            .route("/", get(pages::login_page))
            .route("/dashboard", get(pages::dashboard_page))
            .route("/health", get(pages::health));

        if config.security.enable_headers {
            let builder = Arc::new(SecurityHeaderBuilder::from_config(&config.backend));
            router = router.layer(from_fn_with_state(builder, content_security_policy));
            for (name, value) in hardening_headers() {
                router = router.layer(SetResponseHeaderLayer::overriding(name, value));
            }
        } else {
            tracing::warn!("Security headers disabled");
        }

        router
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.security.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut rx = shutdown.subscribe();
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
                tracing::info!("Draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GateConfig {
        &self.config
    }
}
