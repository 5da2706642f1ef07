/*
 * Responsibility
 * - v1 handlers (re-export)
 */
pub mod brand_features;
pub mod health;
