pub mod v1;

use crate::AppState;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Create the gateway router.
pub fn build_router(state: AppState) -> Router {
    let mut api = v1::create_v1_router();
    if state.simulator.is_some() {
        api = api.nest("/simulator", v1::create_simulator_router());
    }

    Router::new()
        .nest("/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
