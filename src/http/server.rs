//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up the request pipeline (rate limit → soul → compression)
//! - Wire up ambient middleware (tracing, timeouts, body limit, request ID)
//! - Own the rate limiter and its sweeper
//! - Bind server to listener with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, Request},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::http::handlers::{
    get_my_soul, healthz, list_pixels, list_souls, paint_pixel, register_pixels, AppState,
};
use crate::http::response::cache_rule;
use crate::observability::metrics;
use crate::security::{rate_limit_middleware, RateLimitState, RateLimiter};
use crate::souls::{soul_middleware, SoulState};
use crate::storage::Database;

/// HTTP server for the pixel grid.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    limiter: Option<Arc<RateLimiter>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and database.
    pub fn new(config: ServerConfig, db: Database) -> Self {
        let limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiter::from_config(&config.rate_limit)));

        let state = AppState::new(db.clone(), config.grid.clone(), config.caches.clone());
        let router = Self::build_router(&config, state, db, limiter.clone());

        Self {
            router,
            config,
            limiter,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers added later wrap the earlier ones, so the pipeline order is
    /// read bottom-up.
    #[allow(deprecated)]
    fn build_router(
        config: &ServerConfig,
        state: AppState,
        db: Database,
        limiter: Option<Arc<RateLimiter>>,
    ) -> Router {
        let mut router = Router::new()
            .route("/healthz", get(healthz))
            .route("/api/pixels", get(list_pixels))
            .route("/api/pixels/paint", post(paint_pixel))
            .route("/api/pixels/register", post(register_pixels))
            .route("/api/souls", get(list_souls))
            .route("/api/souls/me", get(get_my_soul))
            .with_state(state);

        if let Some(dir) = &config.static_files.dir {
            let serve_dir = ServeDir::new(dir);
            router = if config.caches.static_files_secs > 0 {
                let cache = cache_rule(Duration::from_secs(config.caches.static_files_secs));
                router.fallback_service(
                    ServiceBuilder::new()
                        .layer(SetResponseHeaderLayer::if_not_present(header::CACHE_CONTROL, cache))
                        .service(serve_dir),
                )
            } else {
                router.fallback_service(serve_dir)
            };
        }

        if config.compression.enabled {
            router = router.layer(CompressionLayer::new());
        }

        router = router.layer(middleware::from_fn_with_state(
            SoulState {
                db,
                trust_forwarded: config.listener.trust_forwarded,
            },
            soul_middleware,
        ));

        if let Some(limiter) = limiter {
            router = router.layer(middleware::from_fn_with_state(
                RateLimitState {
                    limiter,
                    trust_forwarded: config.listener.trust_forwarded,
                },
                rate_limit_middleware,
            ));
        }

        router
            .layer(DefaultBodyLimit::max(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(middleware::from_fn(track_metrics))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            trust_forwarded = self.config.listener.trust_forwarded,
            "HTTP server starting"
        );

        if let Some(limiter) = &self.limiter {
            limiter.spawn_sweeper(shutdown.resubscribe());
            tracing::info!(
                limit = limiter.limit(),
                window_secs = limiter.window().as_secs(),
                "Rate limiter enabled"
            );
        }

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
