use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{auth, devices, health, savings, users, AppState};
use super::middleware::require_auth;

pub fn create_router(state: AppState) -> Router {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/login", post(auth::login))
        .route("/register", post(auth::register));

    // Protected routes (require Bearer JWT)
    let protected_routes = Router::new()
        .route(
            "/devices",
            get(devices::get_all_devices).post(devices::create_device),
        )
        .route(
            "/device/{name}",
            get(devices::get_device)
                .put(devices::update_device)
                .delete(devices::delete_device),
        )
        .route("/device/{name}/savings", get(savings::get_savings))
        .route("/users", get(users::get_all_users).post(users::create_user))
        .route("/users/{username}", delete(users::delete_user))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
