//! Shared application state and the HTTP router.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    config::Config,
    handlers,
    middleware,
    services::{token::TokenMaker, user_service::TokenDurations},
    store::Store,
};

/// State handed to every handler.
///
/// The store is injected as a trait object so the same router runs against
/// PostgreSQL in production and the in-memory store in tests.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenMaker>,
    pub durations: TokenDurations,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, tokens: TokenMaker, config: &Config) -> Self {
        Self {
            store,
            tokens: Arc::new(tokens),
            durations: TokenDurations {
                access: config.access_token_duration(),
                refresh: config.refresh_token_duration(),
            },
        }
    }
}

/// Build the router with all routes and middleware.
///
/// Requests that exceed `request_timeout` get `408 Request Timeout`. The
/// handler future is dropped, which rolls back any transfer still in flight.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let authenticated_routes = Router::new()
        .route(
            "/accounts",
            post(handlers::accounts::create_account).get(handlers::accounts::list_accounts),
        )
        .route(
            "/accounts/{id}",
            get(handlers::accounts::get_account).delete(handlers::accounts::delete_account),
        )
        .route(
            "/accounts/{id}/entries",
            get(handlers::accounts::list_entries),
        )
        .route("/transfers", post(handlers::transfers::create_transfer))
        .route("/transfers/{id}", get(handlers::transfers::get_transfer))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/users", post(handlers::users::create_user))
        .route("/users/login", post(handlers::users::login_user))
        .route(
            "/tokens/renew_access",
            post(handlers::users::renew_access_token),
        )
        .merge(authenticated_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    request_timeout,
                )),
        )
        .with_state(state)
}
