/*
 * Responsibility
 * - Service layer public interface (re-export)
 */
pub mod user_client;
