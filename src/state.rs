use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::users::{PgUserStore, UserService, UserStore};
use crate::views::Views;

#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub views: Arc<Views>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wires the PostgreSQL-backed user store; templates are parsed here so a
    /// broken view stops start-up instead of the first request.
    pub fn init(db: PgPool, config: AppConfig) -> anyhow::Result<Self> {
        let views = Views::load(&config.views_dir)?;
        let store = Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>;
        Ok(Self::from_parts(store, Arc::new(views), Arc::new(config)))
    }

    pub fn from_parts(store: Arc<dyn UserStore>, views: Arc<Views>, config: Arc<AppConfig>) -> Self {
        Self {
            users: UserService::new(store, &config.hmac_secret),
            views,
            config,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::users::memory::MemoryUserStore;

        let config = crate::config::test_config();
        let views = Views::load(&config.views_dir).expect("views load");
        let store = Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>;
        Self::from_parts(store, Arc::new(views), Arc::new(config))
    }
}
