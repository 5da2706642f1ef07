/*
 * Responsibility
 * - /brands/{brand}/features handlers
 * - Reads run as read-only units of work (reader replica); writes run
 *   writable (writer), so one request can mix both and each acquisition
 *   routes on its own
 * - Reads tolerate anonymous callers; writes require an identity, deletes
 *   additionally require authorship of the row
 */
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;

use crate::api::v1::dto::brand_features::{
    BrandFeatureDto, BrandFeatureQuery, UpsertBrandFeatureRequest,
};
use crate::db::tx;
use crate::error::AppError;
use crate::middleware::auth::authorize;
use crate::middleware::auth::context::AuthUser;
use crate::repos::brand_feature_repo;
use crate::state::AppState;

pub async fn list_features(
    State(state): State<AppState>,
    Path(brand): Path<String>,
    Query(query): Query<BrandFeatureQuery>,
) -> Result<Json<Vec<BrandFeatureDto>>, AppError> {
    query.validate().map_err(AppError::bad_request)?;

    let rows = tx::read_only(brand_feature_repo::list(
        &state.db,
        &brand,
        query.platform.as_deref(),
        query.key.as_deref(),
        query.country.as_deref(),
    ))
    .await?;

    Ok(Json(rows.into_iter().map(BrandFeatureDto::from).collect()))
}

pub async fn put_feature(
    State(state): State<AppState>,
    // Writes are never anonymous; rejected with 401 before the body parses.
    _user: AuthUser,
    Path((brand, feature)): Path<(String, String)>,
    Json(req): Json<UpsertBrandFeatureRequest>,
) -> Result<Json<BrandFeatureDto>, AppError> {
    req.validate().map_err(AppError::bad_request)?;

    let row = tx::read_write(brand_feature_repo::upsert(
        &state.db,
        &brand,
        &feature,
        req.platform.as_deref(),
        req.key.as_deref(),
        req.country.as_deref(),
        &req.value,
    ))
    .await?;

    Ok(Json(BrandFeatureDto::from(row)))
}

pub async fn delete_feature(
    State(state): State<AppState>,
    _user: AuthUser,
    Path((brand, feature)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    // The ownership check reads the row it is about to delete, so the whole
    // unit of work runs against the writer.
    tx::read_write(async {
        let row = brand_feature_repo::find(&state.db, &brand, &feature)
            .await?
            .ok_or_else(|| AppError::not_found("feature"))?;

        authorize::require_resource_owner(row.updated_by)?;

        brand_feature_repo::delete(&state.db, &brand, &feature).await?;
        Ok::<_, AppError>(())
    })
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
