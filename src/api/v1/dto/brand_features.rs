/*
 * Responsibility
 * - Brand-feature request/response DTOs
 * - validate() for format checks; `platform` and `key` only make sense as
 *   a pair, so they follow the both-or-neither rule
 */
use serde::{Deserialize, Serialize};

use crate::api::v1::dto::require_paired;
use crate::repos::brand_feature_repo::BrandFeatureRow;

#[derive(Debug, Deserialize)]
pub struct BrandFeatureQuery {
    pub platform: Option<String>,
    pub key: Option<String>,
    pub country: Option<String>,
}

impl BrandFeatureQuery {
    pub fn validate(&self) -> Result<(), String> {
        require_paired(
            "platform",
            self.platform.is_some(),
            "key",
            self.key.is_some(),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct UpsertBrandFeatureRequest {
    pub platform: Option<String>,
    pub key: Option<String>,
    pub country: Option<String>,
    pub value: serde_json::Value,
}

impl UpsertBrandFeatureRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.value.is_null() {
            return Err("value is required".to_string());
        }
        require_paired(
            "platform",
            self.platform.is_some(),
            "key",
            self.key.is_some(),
        )
    }
}

#[derive(Debug, Serialize)]
pub struct BrandFeatureDto {
    pub feature: String,
    pub platform: Option<String>,
    pub key: Option<String>,
    pub brand: String,
    pub country: Option<String>,
    pub value: serde_json::Value,
}

impl From<BrandFeatureRow> for BrandFeatureDto {
    fn from(row: BrandFeatureRow) -> Self {
        Self {
            feature: row.feature,
            platform: row.platform,
            key: row.key,
            brand: row.brand,
            country: row.country,
            value: row.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_pair_rule() {
        let query: BrandFeatureQuery =
            serde_json::from_value(json!({"platform": "ios", "key": "checkout"})).unwrap();
        query.validate().unwrap();

        let query: BrandFeatureQuery = serde_json::from_value(json!({"platform": "ios"})).unwrap();
        assert!(query.validate().is_err());

        let query: BrandFeatureQuery = serde_json::from_value(json!({"country": "de"})).unwrap();
        query.validate().unwrap();
    }

    #[test]
    fn upsert_requires_a_value() {
        let req: UpsertBrandFeatureRequest =
            serde_json::from_value(json!({"value": null})).unwrap();
        assert_eq!(req.validate().unwrap_err(), "value is required");

        let req: UpsertBrandFeatureRequest =
            serde_json::from_value(json!({"value": {"enabled": true}})).unwrap();
        req.validate().unwrap();
    }

    #[test]
    fn dto_mirrors_the_row() {
        let dto = BrandFeatureDto::from(BrandFeatureRow {
            brand: "acme".into(),
            feature: "checkout".into(),
            platform: Some("ios".into()),
            key: Some("flow".into()),
            country: None,
            value: json!({"enabled": true}),
            updated_by: Some(42),
        });

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["brand"], "acme");
        assert_eq!(json["feature"], "checkout");
        assert_eq!(json["value"]["enabled"], true);
        // Audit metadata stays internal.
        assert!(json.get("updated_by").is_none());
    }
}
