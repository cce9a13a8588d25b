use std::sync::Arc;

use secrets_core::DatabaseFactory;

pub type SharedDatabases = Arc<dyn DatabaseFactory>;

#[derive(Clone)]
pub struct AppState {
    pub databases: SharedDatabases,
}

impl AppState {
    pub fn new(databases: SharedDatabases) -> Self {
        Self { databases }
    }
}
