use std::sync::Arc;

use axum::{Router, middleware, routing::get};

use crate::handlers::api::health_check;
use crate::middleware::connection_limit_middleware;
use crate::state::AppState;

pub mod api;
pub mod ws;

/// All application routes with state applied.
///
/// The listener socket sits behind the connection limit middleware, which
/// needs `ConnectInfo<SocketAddr>`; serve with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let ws_routes = ws::create_ws_router().layer(middleware::from_fn_with_state(
        app_state.clone(),
        connection_limit_middleware,
    ));

    Router::new()
        .route("/", get(health_check))
        .merge(api::create_api_router())
        .merge(ws_routes)
        .with_state(app_state)
}
