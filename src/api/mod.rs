/// HTTP API routes
pub mod auth;
pub mod votes;


use crate::context::AppContext;
use axum::{
    routing::{get, post},
    Router,
};

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/password", post(auth::change_password))
        .route("/api/auth/claim-owner", post(auth::claim_owner))
        .route("/api/admin/premium", post(auth::grant_premium))
        .route("/api/votes", post(votes::cast_vote))
        .route("/api/questions/:id/results", get(votes::question_results))
        .route("/api/questions/:id/export", get(votes::export_results))
}
