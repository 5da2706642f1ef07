/*
 * Responsibility
 * - brand_features table SQLx operations
 * - Every query acquires through Db::select(), so the pool is re-routed per
 *   operation from the ambient unit-of-work state
 * - Writes stamp updated_by from the ambient identity (nullable: anonymous
 *   writers leave it NULL)
 */
use sqlx::FromRow;

use crate::db::Db;
use crate::middleware::auth::context;
use crate::repos::error::RepoError;

#[derive(Debug, FromRow)]
pub struct BrandFeatureRow {
    pub brand: String,
    pub feature: String,
    pub platform: Option<String>,
    pub key: Option<String>,
    pub country: Option<String>,
    pub value: serde_json::Value,
    pub updated_by: Option<i64>,
}

pub async fn list(
    db: &Db,
    brand: &str,
    platform: Option<&str>,
    key: Option<&str>,
    country: Option<&str>,
) -> Result<Vec<BrandFeatureRow>, RepoError> {
    let rows = sqlx::query_as::<_, BrandFeatureRow>(
        r#"
        SELECT brand, feature, platform, key, country, value, updated_by
        FROM brand_features
        WHERE brand = $1
          AND ($2::text IS NULL OR platform = $2)
          AND ($3::text IS NULL OR key = $3)
          AND ($4::text IS NULL OR country = $4)
        ORDER BY feature
        "#,
    )
    .bind(brand)
    .bind(platform)
    .bind(key)
    .bind(country)
    .fetch_all(db.select())
    .await?;

    Ok(rows)
}

pub async fn find(
    db: &Db,
    brand: &str,
    feature: &str,
) -> Result<Option<BrandFeatureRow>, RepoError> {
    let row = sqlx::query_as::<_, BrandFeatureRow>(
        r#"
        SELECT brand, feature, platform, key, country, value, updated_by
        FROM brand_features
        WHERE brand = $1 AND feature = $2
        "#,
    )
    .bind(brand)
    .bind(feature)
    .fetch_optional(db.select())
    .await?;

    Ok(row)
}

pub async fn upsert(
    db: &Db,
    brand: &str,
    feature: &str,
    platform: Option<&str>,
    key: Option<&str>,
    country: Option<&str>,
    value: &serde_json::Value,
) -> Result<BrandFeatureRow, RepoError> {
    let updated_by = context::current_auditor();

    let row = sqlx::query_as::<_, BrandFeatureRow>(
        r#"
        INSERT INTO brand_features (brand, feature, platform, key, country, value, updated_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (brand, feature) DO UPDATE
        SET platform = EXCLUDED.platform,
            key = EXCLUDED.key,
            country = EXCLUDED.country,
            value = EXCLUDED.value,
            updated_by = EXCLUDED.updated_by,
            updated_at = now()
        RETURNING brand, feature, platform, key, country, value, updated_by
        "#,
    )
    .bind(brand)
    .bind(feature)
    .bind(platform)
    .bind(key)
    .bind(country)
    .bind(value)
    .bind(updated_by)
    .fetch_one(db.select())
    .await?;

    Ok(row)
}

pub async fn delete(db: &Db, brand: &str, feature: &str) -> Result<bool, RepoError> {
    let result = sqlx::query(
        r#"
        DELETE FROM brand_features
        WHERE brand = $1 AND feature = $2
        "#,
    )
    .bind(brand)
    .bind(feature)
    .execute(db.select())
    .await?;

    Ok(result.rows_affected() > 0)
}
