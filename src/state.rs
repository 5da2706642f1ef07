/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 * - Clone-cheap: pools and services behind Arc
 */
use std::sync::Arc;

use crate::db::Db;
use crate::middleware::auth::open_paths::OpenPaths;
use crate::services::user_client::TokenValidator;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Db>,
    pub validator: Arc<dyn TokenValidator>,
    pub open_paths: Arc<OpenPaths>,
}

impl AppState {
    pub fn new(db: Db, validator: Arc<dyn TokenValidator>, open_paths: OpenPaths) -> Self {
        Self {
            db: Arc::new(db),
            validator,
            open_paths: Arc::new(open_paths),
        }
    }
}
