/// Application context and dependency injection
use crate::{
    account::AccountManager,
    auth::lockout::LockoutTracker,
    config::ServerConfig,
    db,
    error::PollResult,
    rate_limit::{RateLimitConfig, RateLimiter},
    session::SessionStore,
    vote::VoteRecorder,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub accounts: Arc<AccountManager>,
    pub sessions: Arc<SessionStore>,
    pub votes: Arc<VoteRecorder>,
    // Process-scoped; created here at startup, swept on a timer, discarded
    // with the context in tests
    pub lockout: Arc<LockoutTracker>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> PollResult<Self> {
        config.validate()?;

        // Create the data directory if it doesn't exist
        if !config.storage.data_directory.exists() {
            tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        }

        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let accounts = Arc::new(AccountManager::new(pool.clone()));
        let sessions = Arc::new(SessionStore::new(
            pool.clone(),
            config.auth.session_ttl_secs,
        ));
        let votes = Arc::new(VoteRecorder::new(pool.clone()));
        let lockout = Arc::new(LockoutTracker::new());
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()));

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            accounts,
            sessions,
            votes,
            lockout,
            rate_limiter,
        })
    }
}
