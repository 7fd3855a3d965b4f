/// Background task implementations
use crate::{context::AppContext, error::PollResult};

/// Delete sessions past their expiry
pub async fn sweep_expired_sessions(ctx: &AppContext) -> PollResult<u64> {
    ctx.sessions.sweep_expired().await
}

/// Drop lockout records whose lock or attempt window has elapsed,
/// bounding memory growth of the in-process tracker
pub fn sweep_lockout_records(ctx: &AppContext) -> usize {
    ctx.lockout.sweep_expired()
}

/// Health check - verify the database is reachable
pub async fn health_check(ctx: &AppContext) -> PollResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;

    Ok(())
}
