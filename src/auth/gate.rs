/// Authorization extractors over the session cookie
use crate::{
    context::AppContext,
    db::models::{Account, Role},
    error::PollError,
};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::COOKIE, request::Parts, HeaderMap},
};

/// Name of the session cookie
pub const SESSION_COOKIE_NAME: &str = "session_token";

/// Pull the session token out of the Cookie header, if present.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

async fn resolve_account(parts: &Parts, state: &AppContext) -> Result<Account, PollError> {
    let token = extract_session_token(&parts.headers).ok_or(PollError::Unauthorized)?;
    let account_id = state.sessions.validate(&token).await?;
    state.accounts.get_account(&account_id).await
}

/// Authenticated request context: a resolved, loaded account.
/// Rejects with `Unauthorized` when no cookie is present and
/// `SessionExpired` when the token is invalid or past expiry.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub account: Account,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthUser {
    type Rejection = PollError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let account = resolve_account(parts, state).await?;
        Ok(AuthUser { account })
    }
}

/// Optional authentication: anonymous callers resolve to `None` instead of
/// an error. Used by read paths that render differently for signed-in users.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<Account>);

#[async_trait]
impl FromRequestParts<AppContext> for OptionalAuthUser {
    type Rejection = PollError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        match resolve_account(parts, state).await {
            Ok(account) => Ok(OptionalAuthUser(Some(account))),
            Err(_) => Ok(OptionalAuthUser(None)),
        }
    }
}

/// Authenticated account holding the premium flag. The owner account
/// passes this gate as well.
#[derive(Debug, Clone)]
pub struct PremiumUser {
    pub account: Account,
}

#[async_trait]
impl FromRequestParts<AppContext> for PremiumUser {
    type Rejection = PollError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let account = resolve_account(parts, state).await?;

        if !account.premium && account.role != Role::Owner {
            return Err(PollError::PremiumRequired);
        }

        Ok(PremiumUser { account })
    }
}

/// Authenticated account holding the exact owner role.
#[derive(Debug, Clone)]
pub struct OwnerUser {
    pub account: Account,
}

#[async_trait]
impl FromRequestParts<AppContext> for OwnerUser {
    type Rejection = PollError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let account = resolve_account(parts, state).await?;

        if account.role != Role::Owner {
            return Err(PollError::OwnerRequired);
        }

        Ok(OwnerUser { account })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_session_token() {
        let headers = headers_with_cookie("session_token=abc123");
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_extract_among_other_cookies() {
        let headers =
            headers_with_cookie("theme=dark; session_token=tok456 ; lang=en");
        assert_eq!(extract_session_token(&headers), Some("tok456".to_string()));
    }

    #[test]
    fn test_extract_missing_cookie() {
        assert_eq!(extract_session_token(&HeaderMap::new()), None);

        let headers = headers_with_cookie("theme=dark");
        assert_eq!(extract_session_token(&headers), None);
    }
}
