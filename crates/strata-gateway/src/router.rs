use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::driver::WorkerDriver;
use crate::handler::{self, AppState};

/// Build the axum router for the S3 subset.
pub fn build_router(driver: WorkerDriver) -> Router {
    Router::new()
        .route("/health", get(handler::health))
        .route("/", get(handler::list_buckets))
        .route(
            "/:bucket",
            get(handler::list_objects)
                .head(handler::head_bucket)
                .put(handler::put_bucket)
                .delete(handler::delete_bucket),
        )
        .route(
            "/:bucket/*key",
            get(handler::get_object)
                .head(handler::head_object)
                .put(handler::put_object)
                .delete(handler::delete_object),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { driver })
}
