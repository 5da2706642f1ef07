/*
 * Responsibility
 * - v1 public interface (routes() re-export)
 */
pub mod dto;
pub mod handlers;
mod routes;

pub use routes::routes;
