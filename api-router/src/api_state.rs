use std::sync::Arc;

use common::{storage::db::SurrealDbClient, utils::config::AppConfig};
use retrieval_pipeline::QueryService;

use crate::middleware_rate_limit::RateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub db: Arc<SurrealDbClient>,
    pub config: AppConfig,
    pub query: Arc<QueryService>,
    pub limiter: Arc<RateLimiter>,
}

impl ApiState {
    pub fn new(config: AppConfig, db: Arc<SurrealDbClient>, query: Arc<QueryService>) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit));
        Self {
            db,
            config,
            query,
            limiter,
        }
    }
}
