/*
 * Responsibility
 * - API versions (re-export)
 */
pub mod v1;
