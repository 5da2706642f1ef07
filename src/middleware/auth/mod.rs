/*
 * Responsibility
 * - Authentication middleware: gateway (validate + attach identity),
 *   open-path allow-list, request-scoped identity store, ownership checks
 */
pub mod authorize;
pub mod context;
pub mod gateway;
pub mod open_paths;
