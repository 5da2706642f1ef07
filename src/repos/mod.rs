/*
 * Responsibility
 * - repo public interface (re-export)
 */
pub mod brand_feature_repo;
pub mod error;
