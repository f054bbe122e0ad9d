//! HTTP surface of the POS peripheral gateway.
//!
//! Wires a [`DeviceRegistry`] built from a [`GatewayConfig`] into an axum
//! router exposing the `/v1` device endpoints, the live-weight event stream
//! and, when enabled, the `/v1/simulator` control routes.
//!
//! ```no_run
//! use posgate_server::{AppState, GatewayConfig, build_router};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GatewayConfig::default();
//! let state = AppState::from_config(&config);
//! let listener = tokio::net::TcpListener::bind(&config.server.bind_addr).await?;
//! axum::serve(listener, build_router(state)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod simulator;

pub use config::{ConfigError, GatewayConfig};
pub use error::{ApiError, ApiResult};
pub use logging::setup_logging;
pub use routes::build_router;
pub use simulator::Simulator;

use posgate_devices::DeviceRegistry;
use std::sync::Arc;

/// Shared state of every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub registry: Arc<DeviceRegistry>,

    /// Present when the simulator control routes are enabled.
    pub simulator: Option<Arc<Simulator>>,
}

impl AppState {
    /// Build the registry and simulated devices for `config`. Must run inside
    /// a Tokio runtime.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let (registry, simulator) = simulator::build_devices(config);
        Self {
            registry: Arc::new(registry),
            simulator: config.simulator.enabled.then(|| Arc::new(simulator)),
        }
    }
}
