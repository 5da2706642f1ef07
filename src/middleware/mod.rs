/*
 * Responsibility
 * - middleware public interface (re-export)
 */
pub mod auth;
pub mod cors;
pub mod error_responder;
pub mod http;
pub mod security_headers;
