//! HTTP surface of the bundle slice.

mod handlers;
pub mod models;

use nsgen_kernel::server::ApiState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Routes of the bundle slice, documented for the `OpenAPI` index.
pub fn bundle_router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::generate_zip))
        .routes(routes!(handlers::generate_link))
        .routes(routes!(handlers::download))
        .routes(routes!(handlers::options))
}
