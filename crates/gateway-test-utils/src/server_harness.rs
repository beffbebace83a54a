//! Test server harness for E2E testing
//!
//! Provides `TestGatewayServer` for spawning real gateway instances in tests.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use product_gateway::config::Config;
use product_gateway::observability::metrics::init_metrics_recorder;
use product_gateway::routes::{self, AppState};
use product_gateway::services::product_service::mock::MockProductService;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Global metrics handle for test servers
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics handle shared by every test server in the process.
///
/// Installs the real recorder once; if another recorder is already
/// installed, falls back to a detached handle.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Repository root, where `views/` and `static/` live.
pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Test harness for spawning the product gateway in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_status() -> Result<()> {
///     let jwks = TestJwksServer::start(&[&TestSigningKey::primary()]).await;
///     let server = TestGatewayServer::spawn(&jwks.jwks_url()).await?;
///
///     let response = reqwest::get(format!("{}/status", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGatewayServer {
    addr: SocketAddr,
    config: Config,
    product_service: Arc<MockProductService>,
    _handle: JoinHandle<()>,
}

impl TestGatewayServer {
    /// Spawn a gateway validating against `jwks_url`, with an accepting
    /// mock product service.
    pub async fn spawn(jwks_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with(
            jwks_url,
            HashMap::new(),
            Arc::new(MockProductService::accepting()),
        )
        .await
    }

    /// Spawn a gateway with extra configuration variables and a specific
    /// product service.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Serve `views/` and `static/` from the repository root
    /// - Start the HTTP server in the background
    pub async fn spawn_with(
        jwks_url: &str,
        overrides: HashMap<String, String>,
        product_service: Arc<MockProductService>,
    ) -> Result<Self, anyhow::Error> {
        let root = workspace_root();
        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWKS_URL".to_string(), jwks_url.to_string()),
            (
                "VIEWS_DIR".to_string(),
                root.join("views").to_string_lossy().into_owned(),
            ),
            (
                "STATIC_DIR".to_string(),
                root.join("static").to_string_lossy().into_owned(),
            ),
        ]);
        vars.extend(overrides);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::new(config.clone(), product_service.clone()));
        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            product_service,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The mock downstream service, for asserting what reached it.
    pub fn product_service(&self) -> &MockProductService {
        &self.product_service
    }
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        // Abort the server task so the port is released when the test ends
        self._handle.abort();
    }
}
