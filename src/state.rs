use crate::cache::LiveCache;
use crate::config::Config;
use crate::db::DbStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: DbStore,
    pub cache: Arc<LiveCache>,
    pub config: Arc<Config>,
}
