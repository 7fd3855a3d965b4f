/// Authentication endpoints: register, login, logout, session info,
/// password change, owner provisioning.
use crate::{
    auth::gate::{extract_session_token, AuthUser, OptionalAuthUser, OwnerUser, SESSION_COOKIE_NAME},
    auth::password,
    config::ServerConfig,
    context::AppContext,
    db::models::AccountView,
    error::{PollError, PollResult},
    metrics,
    session::SessionMetadata,
};
use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    Json,
};
use serde::Deserialize;
use validator::Validate;

/// Registration request payload
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[validate(length(min = 1, max = 80))]
    pub name: String,
}

/// Login request payload
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    pub password: String,
}

/// Password change request payload
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Best-effort client address for lockout keying and session metadata.
/// Proxy headers first, "unknown" when nothing is available.
fn client_addr(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return forwarded.to_string();
    }

    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn session_metadata(headers: &HeaderMap, addr: &str) -> SessionMetadata {
    SessionMetadata {
        ip: Some(addr.to_string()),
        user_agent: headers
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
    }
}

/// Build the `Set-Cookie` header for a freshly issued session token.
fn session_cookie(config: &ServerConfig, token: &str) -> PollResult<HeaderValue> {
    let max_age = config.auth.session_ttl_secs;
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"
    );
    if config.auth.cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| PollError::Internal(format!("Invalid cookie header: {}", e)))
}

fn clear_session_cookie(config: &ServerConfig) -> PollResult<HeaderValue> {
    let mut cookie =
        format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if config.auth.cookie_secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|e| PollError::Internal(format!("Invalid cookie header: {}", e)))
}

async fn issue_session(
    ctx: &AppContext,
    account_id: &str,
    headers: &HeaderMap,
    addr: &str,
) -> PollResult<HeaderMap> {
    let session = ctx
        .sessions
        .create(account_id, session_metadata(headers, addr))
        .await?;
    metrics::SESSIONS_CREATED_TOTAL.inc();

    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, session_cookie(&ctx.config, &session.token)?);
    Ok(response_headers)
}

/// Register a new account and sign it in.
///
/// Format and strength problems are reported precisely; anything touching
/// account existence comes back as the same generic failure.
pub async fn register(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> PollResult<(HeaderMap, Json<AccountView>)> {
    req.validate()
        .map_err(|e| PollError::Validation(e.to_string()))?;
    password::validate_password_strength(&req.password)?;

    if req.password != req.confirm_password {
        return Err(PollError::Validation(
            "Passwords do not match".to_string(),
        ));
    }

    let name = req.name.trim();
    if name.is_empty() {
        return Err(PollError::Validation("Name cannot be empty".to_string()));
    }

    let account = ctx.accounts.register(&req.email, &req.password, name).await?;
    metrics::REGISTRATIONS_TOTAL.inc();
    tracing::info!(account_id = %account.id, "account registered");

    let addr = client_addr(&headers);
    let response_headers = issue_session(&ctx, &account.id, &headers, &addr).await?;

    Ok((response_headers, Json(AccountView::from(&account))))
}

/// Authenticate and issue a session cookie.
///
/// The lockout tracker is consulted before credentials are checked and
/// updated after: failures accumulate against the (address, email) pair,
/// success clears it.
pub async fn login(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> PollResult<(HeaderMap, Json<AccountView>)> {
    req.validate()
        .map_err(|_| PollError::InvalidCredentials)?;

    let addr = client_addr(&headers);

    let status = ctx.lockout.check(&addr, &req.email);
    if status.locked {
        metrics::LOGIN_ATTEMPTS_TOTAL.with_label_values(&["locked"]).inc();
        return Err(PollError::Locked {
            remaining_ms: status.remaining_ms,
        });
    }

    let account = match ctx.accounts.authenticate(&req.email, &req.password).await {
        Ok(account) => account,
        Err(PollError::InvalidCredentials) => {
            ctx.lockout.record_failure(&addr, &req.email);
            metrics::LOGIN_ATTEMPTS_TOTAL.with_label_values(&["invalid"]).inc();
            return Err(PollError::InvalidCredentials);
        }
        Err(e) => return Err(e),
    };

    ctx.lockout.clear(&addr, &req.email);
    metrics::LOGIN_ATTEMPTS_TOTAL.with_label_values(&["success"]).inc();

    let response_headers = issue_session(&ctx, &account.id, &headers, &addr).await?;

    Ok((response_headers, Json(AccountView::from(&account))))
}

/// Invalidate the presented session and clear the cookie.
/// Succeeds whether or not a live session was presented.
pub async fn logout(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> PollResult<(HeaderMap, Json<serde_json::Value>)> {
    if let Some(token) = extract_session_token(&headers) {
        ctx.sessions.invalidate(&token).await?;
    }

    let mut response_headers = HeaderMap::new();
    response_headers.insert(SET_COOKIE, clear_session_cookie(&ctx.config)?);

    Ok((response_headers, Json(serde_json::json!({ "status": "ok" }))))
}

/// Current account, or null for anonymous callers.
pub async fn me(user: OptionalAuthUser) -> Json<Option<AccountView>> {
    Json(user.0.as_ref().map(AccountView::from))
}

/// Change the password, drop every existing session, and issue a fresh one.
pub async fn change_password(
    State(ctx): State<AppContext>,
    auth: AuthUser,
    headers: HeaderMap,
    Json(req): Json<ChangePasswordRequest>,
) -> PollResult<(HeaderMap, Json<AccountView>)> {
    password::validate_password_strength(&req.new_password)?;

    ctx.accounts
        .change_password(&auth.account.id, &req.current_password, &req.new_password)
        .await?;
    ctx.sessions.invalidate_all(&auth.account.id).await?;
    tracing::info!(account_id = %auth.account.id, "password changed, all sessions invalidated");

    let addr = client_addr(&headers);
    let response_headers = issue_session(&ctx, &auth.account.id, &headers, &addr).await?;

    Ok((response_headers, Json(AccountView::from(&auth.account))))
}

/// One-time owner provisioning for the calling account.
pub async fn claim_owner(
    State(ctx): State<AppContext>,
    auth: AuthUser,
) -> PollResult<Json<AccountView>> {
    let account = ctx.accounts.claim_owner(&auth.account.id).await?;
    Ok(Json(AccountView::from(&account)))
}

/// Premium grant request payload
#[derive(Debug, Deserialize)]
pub struct GrantPremiumRequest {
    pub account_id: String,
    pub premium: bool,
}

/// Set or clear an account's premium flag. Owner only; the upgrade payment
/// flow itself lives outside this service.
pub async fn grant_premium(
    State(ctx): State<AppContext>,
    _owner: OwnerUser,
    Json(req): Json<GrantPremiumRequest>,
) -> PollResult<Json<serde_json::Value>> {
    ctx.accounts.set_premium(&req.account_id, req.premium).await?;
    tracing::info!(account_id = %req.account_id, premium = req.premium, "premium flag updated");

    Ok(Json(serde_json::json!({ "status": "ok" })))
}
