/// Database models
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account role. Owner is provisioned exactly once via the explicit
/// claim operation; there are no name- or email-based special cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    User,
    Owner,
}

/// Question kind: binary yes/no or multi-option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum QuestionKind {
    Binary,
    Multi,
}

/// Account record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub premium: bool,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Sanitized account projection returned by the API. The password hash
/// never leaves the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    pub id: String,
    pub email: String,
    pub name: String,
    pub premium: bool,
    pub role: Role,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            premium: account.premium,
            role: account.role,
        }
    }
}

/// Session record. Only the Argon2 hash of the token is stored; the
/// plaintext token is returned once at creation and never persisted.
#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub account_id: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Question record with denormalized binary counters
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub kind: QuestionKind,
    pub prompt: String,
    pub yes_count: i64,
    pub no_count: i64,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Option row for a multi-option question, with its denormalized counter
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuestionOption {
    pub id: String,
    pub question_id: String,
    pub label: String,
    pub vote_count: i64,
}

/// Immutable vote record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub question_id: String,
    pub voter_id: String,
    pub answer: Option<bool>,
    pub option_id: Option<String>,
    pub created_at: DateTime<Utc>,
}
