//! HTTP routes for the product gateway.
//!
//! Defines the Axum router and application state.

use crate::auth::{Gate, JwksClient, KeySource};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::services::ProductService;
use axum::{
    http::Method,
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowHeaders, Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// JWKS client shared by the token gate and the readiness probe.
    pub jwks_client: Arc<JwksClient>,

    /// Downstream product operations.
    pub product_service: Arc<dyn ProductService>,
}

impl AppState {
    /// Build state from configuration, creating the JWKS client.
    pub fn new(config: Config, product_service: Arc<dyn ProductService>) -> Self {
        let jwks_client = Arc::new(JwksClient::with_options(
            config.jwks_url.clone(),
            config.jwks_options(),
        ));

        Self {
            config,
            jwks_client,
            product_service,
        }
    }
}

/// CORS policy: any origin, GET/POST, requested headers echoed back.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(AllowHeaders::mirror_request())
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/` - Landing page from the views directory - public
/// - `/static/*` - Static assets - public
/// - `/status` - Liveness ("API is up and running") - public
/// - `/ready` - Readiness probe (JWKS loadable) - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/products` - Product listing - requires authentication
/// - `/products/:slug/feedback` - Feedback submission - requires authentication
/// - CORS, TraceLayer, 30 second request timeout and HTTP metrics on every route
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let key_source: Arc<dyn KeySource> = state.jwks_client.clone();
    let gate = Arc::new(Gate::new(
        Arc::new(state.config.validation_context()),
        key_source,
    ));
    let auth_state = Arc::new(AuthState { gate });

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/status", get(handlers::status_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let static_routes = Router::new()
        .route_service("/", ServeDir::new(&state.config.views_dir))
        .nest_service("/static", ServeDir::new(&state.config.static_dir));

    // Protected routes (authentication required). The auth layer sits on each
    // method router so a wrong method is answered 405 without a token.
    let auth = middleware::from_fn_with_state(auth_state, require_auth);
    let protected_routes = Router::new()
        .route(
            "/products",
            get(handlers::list_products).route_layer(auth.clone()),
        )
        .route(
            "/products/:slug/feedback",
            post(handlers::add_feedback).route_layer(auth),
        )
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. CorsLayer - Answer preflights before routing
    // 4. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(static_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .layer(middleware::from_fn(http_metrics_middleware))
}
