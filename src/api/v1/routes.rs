/*
 * Responsibility
 * - Define the v1 URL structure under /v1/api
 * - Which ranges need authentication is decided by OPEN_PATHS config, not
 *   per-route layers: the gateway covers the whole router
 */
use axum::Router;
use axum::routing::get;

use crate::api::v1::handlers::brand_features::{delete_feature, list_features, put_feature};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/brands/{brand}/features", get(list_features))
        .route(
            "/brands/{brand}/features/{feature}",
            axum::routing::put(put_feature).delete(delete_feature),
        )
}
