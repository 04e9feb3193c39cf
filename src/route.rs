//! Route definitions for the share domain and intake API

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::handler::{create_share_link, intake, open_playlist_link, open_share_link};
use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Creates the Axum router with all routes
///
/// # Route Definitions
///
/// - `GET /s/{token}` - Opens a share link (public)
/// - `GET /p/{id}` - Opens a playlist in the app (public)
/// - `POST /api/share` - Issues a share link
/// - `POST /api/intake` - Runs one delivery through intake
///
/// Routes under `/api` go through [`auth_middleware`].
///
/// # Example Usage
///
/// ```no_run
/// # use std::sync::Arc;
/// # use unitune::config::AppConfig;
/// # use unitune::resolver::OdesliResolver;
/// # use unitune::route::create_app;
/// # use unitune::state::init_state;
/// let config = AppConfig::default();
/// let resolver = OdesliResolver::new(&config.resolver_url, &config.user_country).unwrap();
/// let app = create_app(init_state(config, Arc::new(resolver)));
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/share", post(create_share_link))
        .route("/intake", post(intake))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/s/{token}", get(open_share_link))
        .route("/p/{id}", get(open_playlist_link))
        .nest("/api", api_routes)
        .with_state(state)
}
