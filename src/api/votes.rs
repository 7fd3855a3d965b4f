/// Vote endpoints
use crate::{
    auth::gate::{AuthUser, PremiumUser},
    context::AppContext,
    error::{PollError, PollResult},
    metrics,
    vote::{QuestionExport, QuestionResults, VoteChoice},
};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

/// Vote request payload. The voter identity comes from the session, never
/// from the body.
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub question_id: String,
    pub answer: Option<bool>,
    pub option_id: Option<String>,
}

/// Cast a vote on a question as the authenticated account.
pub async fn cast_vote(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    Json(req): Json<VoteRequest>,
) -> PollResult<Json<serde_json::Value>> {
    let choice = match (req.answer, req.option_id) {
        (Some(answer), None) => VoteChoice::Binary(answer),
        (None, Some(option_id)) => VoteChoice::Option(option_id),
        _ => {
            return Err(PollError::Validation(
                "Provide exactly one of answer or option_id".to_string(),
            ));
        }
    };
    let kind_label = match &choice {
        VoteChoice::Binary(_) => "binary",
        VoteChoice::Option(_) => "multi",
    };

    match ctx
        .votes
        .record_vote(&req.question_id, &auth.account.id, choice)
        .await
    {
        Ok(()) => {
            metrics::VOTES_RECORDED_TOTAL
                .with_label_values(&[kind_label])
                .inc();
            Ok(Json(serde_json::json!({ "status": "ok" })))
        }
        Err(PollError::AlreadyVoted) => {
            metrics::VOTE_CONFLICTS_TOTAL.inc();
            Err(PollError::AlreadyVoted)
        }
        Err(e) => Err(e),
    }
}

/// Aggregate results for a question. Public read.
pub async fn question_results(
    State(ctx): State<AppContext>,
    Path(question_id): Path<String>,
) -> PollResult<Json<QuestionResults>> {
    Ok(Json(ctx.votes.results(&question_id).await?))
}

/// Full export, counters plus vote records, for premium accounts.
pub async fn export_results(
    State(ctx): State<AppContext>,
    _user: PremiumUser,
    Path(question_id): Path<String>,
) -> PollResult<Json<QuestionExport>> {
    Ok(Json(ctx.votes.export(&question_id).await?))
}
