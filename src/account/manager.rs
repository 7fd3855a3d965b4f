/// Account manager: registration, credential checks, roles.
use crate::{
    auth::password,
    db::models::{Account, Role},
    error::{PollError, PollResult},
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, email, name, password_hash, premium, role, created_at";

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
}

impl AccountManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Create a new account with the user role.
    ///
    /// Any failure that would reveal whether the email is taken is collapsed
    /// into the generic [`PollError::RegistrationFailed`]; the real cause is
    /// logged server-side.
    pub async fn register(&self, email: &str, password: &str, name: &str) -> PollResult<Account> {
        let email = email.trim().to_lowercase();

        if self.email_exists(&email).await? {
            tracing::warn!(%email, "registration rejected: email already registered");
            return Err(PollError::RegistrationFailed);
        }

        let password_hash = password::hash_password(password)
            .map_err(|e| PollError::Internal(format!("Password hashing failed: {}", e)))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let insert = sqlx::query(
            "INSERT INTO account (id, email, name, password_hash, premium, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&id)
        .bind(&email)
        .bind(name)
        .bind(&password_hash)
        .bind(false)
        .bind(Role::User)
        .bind(now)
        .execute(&self.db)
        .await;

        if let Err(e) = insert {
            // Two registrations racing on the same email land here; the
            // UNIQUE constraint is the arbiter.
            if e.as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation())
            {
                tracing::warn!(%email, "registration rejected: concurrent duplicate");
                return Err(PollError::RegistrationFailed);
            }
            return Err(PollError::Database(e));
        }

        Ok(Account {
            id,
            email,
            name: name.to_string(),
            password_hash,
            premium: false,
            role: Role::User,
            created_at: now,
        })
    }

    /// Verify credentials and return the account.
    ///
    /// When no account matches the email, the dummy hash is verified anyway
    /// so this path costs the same as a wrong password against a real
    /// account. Both failures return the same generic error.
    pub async fn authenticate(&self, email: &str, password: &str) -> PollResult<Account> {
        let email = email.trim().to_lowercase();

        match self.find_by_email(&email).await? {
            Some(account) => {
                let valid = password::verify_password(password, &account.password_hash)
                    .map_err(|e| {
                        PollError::Internal(format!("Password verification failed: {}", e))
                    })?;

                if valid {
                    Ok(account)
                } else {
                    Err(PollError::InvalidCredentials)
                }
            }
            None => {
                // Pay the hashing cost even though the outcome is known
                let _ = password::verify_password(password, password::dummy_hash());
                Err(PollError::InvalidCredentials)
            }
        }
    }

    /// Get account by id
    pub async fn get_account(&self, id: &str) -> PollResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE id = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(PollError::Database)?
        .ok_or_else(|| PollError::NotFound("Account not found".to_string()))
    }

    /// Find account by lowercased email
    async fn find_by_email(&self, email: &str) -> PollResult<Option<Account>> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE email = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .map_err(PollError::Database)
    }

    /// Check if an email is already registered
    async fn email_exists(&self, email: &str) -> PollResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE email = ?1")
            .bind(email)
            .fetch_one(&self.db)
            .await
            .map_err(PollError::Database)?;

        Ok(count > 0)
    }

    /// Replace the account's password after verifying the current one.
    /// Callers are responsible for invalidating existing sessions.
    pub async fn change_password(
        &self,
        id: &str,
        current_password: &str,
        new_password: &str,
    ) -> PollResult<()> {
        let account = self.get_account(id).await?;

        let valid = password::verify_password(current_password, &account.password_hash)
            .map_err(|e| PollError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(PollError::InvalidCredentials);
        }

        let password_hash = password::hash_password(new_password)
            .map_err(|e| PollError::Internal(format!("Password hashing failed: {}", e)))?;

        sqlx::query("UPDATE account SET password_hash = ?1 WHERE id = ?2")
            .bind(&password_hash)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(PollError::Database)?;

        Ok(())
    }

    /// Set or clear the premium flag
    pub async fn set_premium(&self, id: &str, premium: bool) -> PollResult<()> {
        let result = sqlx::query("UPDATE account SET premium = ?1 WHERE id = ?2")
            .bind(premium)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(PollError::Database)?;

        if result.rows_affected() == 0 {
            return Err(PollError::NotFound("Account not found".to_string()));
        }

        Ok(())
    }

    /// One-time owner provisioning: promotes the account to the owner role,
    /// but only while no owner exists anywhere. The guard runs in the same
    /// statement as the update so two concurrent claims cannot both win.
    pub async fn claim_owner(&self, id: &str) -> PollResult<Account> {
        let result = sqlx::query(
            "UPDATE account SET role = ?1
             WHERE id = ?2
               AND NOT EXISTS (SELECT 1 FROM account WHERE role = ?1)",
        )
        .bind(Role::Owner)
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(PollError::Database)?;

        if result.rows_affected() == 0 {
            // Distinguish an unknown account from an already-claimed owner
            let account = self.get_account(id).await?;
            if account.role == Role::Owner {
                return Ok(account);
            }
            return Err(PollError::Conflict(
                "An owner account has already been provisioned".to_string(),
            ));
        }

        tracing::info!(account_id = id, "owner role provisioned");
        self.get_account(id).await
    }
}
