//! API router.
//!
//! Two groups under `/api`: protected routes behind the identity
//! middleware, and the unprotected registration route. Health probes are
//! mounted at the root for orchestrators.
//!
//! Middleware uses `Extension<ApiContext>` (injected as the outermost
//! layer); endpoint handlers use `State<ApiContext>` via `with_state`.

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

/// Build the full application router, CORS included.
pub fn app(ctx: ApiContext) -> Router {
    let origins: Vec<HeaderValue> = ctx
        .state
        .settings
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    api_router(ctx).layer(cors)
}

/// Routes without the CORS layer (composable for tests).
pub fn api_router(ctx: ApiContext) -> Router {
    let protected = Router::new()
        .route(
            "/users/me",
            get(endpoints::users::me)
                .put(endpoints::users::update_me)
                .delete(endpoints::users::delete_me),
        )
        .route(
            "/conversations",
            post(endpoints::conversations::start).get(endpoints::conversations::list),
        )
        .route(
            "/conversations/:id",
            get(endpoints::conversations::detail).delete(endpoints::conversations::delete),
        )
        .route(
            "/conversations/:id/messages",
            post(endpoints::conversations::send_message),
        )
        .route(
            "/conversations/:id/complete",
            put(endpoints::conversations::complete),
        )
        .route(
            "/conversations/:id/archive",
            put(endpoints::conversations::archive),
        )
        .route(
            "/conversations/:id/title",
            put(endpoints::conversations::update_title),
        )
        .route(
            "/conversations/:id/followup",
            post(endpoints::conversations::followup),
        )
        .route(
            "/conversations/:id/report",
            post(endpoints::conversations::generate_report),
        )
        .route(
            "/conversations/:id/report/download",
            get(endpoints::conversations::download_report),
        )
        .route("/reports", get(endpoints::reports::list))
        .route("/reports/summary", post(endpoints::reports::summary))
        .route(
            "/reports/:id",
            get(endpoints::reports::get).delete(endpoints::reports::delete),
        )
        .route("/reports/:id/review", put(endpoints::reports::review))
        .route(
            "/symptoms",
            post(endpoints::symptoms::record).get(endpoints::symptoms::list),
        )
        .route("/symptoms/categories", get(endpoints::symptoms::categories))
        .route("/symptoms/stats", get(endpoints::symptoms::stats))
        .route("/symptoms/analyze", post(endpoints::symptoms::analyze))
        .route(
            "/symptoms/:id",
            put(endpoints::symptoms::update).delete(endpoints::symptoms::delete),
        )
        .with_state(ctx.clone())
        .layer(axum::middleware::from_fn(
            middleware::identity::require_user,
        ))
        // Extension must be outermost so middleware can extract ApiContext
        .layer(axum::Extension(ctx.clone()));

    let unprotected = Router::new()
        .route("/users", post(endpoints::users::register))
        .with_state(ctx.clone());

    let health_routes = Router::new()
        .route("/health/live", get(endpoints::health::live))
        .route("/health/ready", get(endpoints::health::ready))
        .route("/health/detailed", get(endpoints::health::detailed))
        .with_state(ctx);

    Router::new()
        .nest("/api", protected)
        .nest("/api", unprotected)
        .merge(health_routes)
}
