//! Vote recording and aggregate results.
//!
//! A vote and its counter increment commit in one transaction or not at all.
//! The UNIQUE (question_id, voter_id) constraint in storage is the sole
//! arbiter under concurrent duplicate votes: exactly one wins, the other
//! observes `AlreadyVoted`.

use crate::{
    db::models::{Question, QuestionKind, QuestionOption, Vote},
    error::{PollError, PollResult},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

/// A voter's choice: a yes/no answer for binary questions, an option id
/// for multi-option questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteChoice {
    Binary(bool),
    Option(String),
}

/// Aggregate counters for one question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResults {
    pub question_id: String,
    pub prompt: String,
    pub kind: QuestionKind,
    pub yes_count: i64,
    pub no_count: i64,
    pub options: Vec<OptionResult>,
    pub total_votes: i64,
}

/// Per-option tally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionResult {
    pub id: String,
    pub label: String,
    pub vote_count: i64,
}

/// Full export of a question: counters plus the underlying vote records
#[derive(Debug, Clone, Serialize)]
pub struct QuestionExport {
    pub results: QuestionResults,
    pub votes: Vec<Vote>,
}

/// Vote recorder service
pub struct VoteRecorder {
    db: SqlitePool,
}

impl VoteRecorder {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record one account's vote on a question.
    ///
    /// Validates voter, question, and choice, then inserts the vote row and
    /// increments the matching counter in a single transaction. Once
    /// validation has passed, any storage failure is reported as
    /// `AlreadyVoted`: under the uniqueness constraint a concurrent
    /// duplicate is the realistic cause.
    pub async fn record_vote(
        &self,
        question_id: &str,
        voter_id: &str,
        choice: VoteChoice,
    ) -> PollResult<()> {
        let voter_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE id = ?1")
            .bind(voter_id)
            .fetch_one(&self.db)
            .await
            .map_err(PollError::Database)?;
        if voter_count == 0 {
            return Err(PollError::NotFound("Voter account not found".to_string()));
        }

        let question = sqlx::query_as::<_, Question>(
            "SELECT id, kind, prompt, yes_count, no_count, created_by, created_at
             FROM question WHERE id = ?1",
        )
        .bind(question_id)
        .fetch_optional(&self.db)
        .await
        .map_err(PollError::Database)?
        .ok_or_else(|| PollError::NotFound("Question not found".to_string()))?;

        match (question.kind, &choice) {
            (QuestionKind::Binary, VoteChoice::Binary(_)) => {}
            (QuestionKind::Multi, VoteChoice::Option(_)) => {}
            (QuestionKind::Binary, VoteChoice::Option(_)) => {
                return Err(PollError::Validation(
                    "This question takes a yes/no answer, not an option".to_string(),
                ));
            }
            (QuestionKind::Multi, VoteChoice::Binary(_)) => {
                return Err(PollError::Validation(
                    "This question takes an option, not a yes/no answer".to_string(),
                ));
            }
        }

        // Pre-check keeps the common duplicate friendly; the constraint
        // below remains the authority under races.
        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM vote WHERE question_id = ?1 AND voter_id = ?2",
        )
        .bind(question_id)
        .bind(voter_id)
        .fetch_one(&self.db)
        .await
        .map_err(PollError::Database)?;
        if existing > 0 {
            return Err(PollError::AlreadyVoted);
        }

        let mut tx = self.db.begin().await.map_err(PollError::Database)?;

        if let VoteChoice::Option(option_id) = &choice {
            // The option must belong to this question; checked inside the
            // transaction so the counter update cannot target a stranger row.
            let belongs: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM question_option WHERE id = ?1 AND question_id = ?2",
            )
            .bind(option_id)
            .bind(question_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(PollError::Database)?;

            if belongs == 0 {
                tx.rollback().await.map_err(PollError::Database)?;
                return Err(PollError::Validation(
                    "Option does not belong to this question".to_string(),
                ));
            }
        }

        let vote_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let write_result = async {
            match &choice {
                VoteChoice::Binary(answer) => {
                    sqlx::query(
                        "INSERT INTO vote (id, question_id, voter_id, answer, option_id, created_at)
                         VALUES (?1, ?2, ?3, ?4, NULL, ?5)",
                    )
                    .bind(&vote_id)
                    .bind(question_id)
                    .bind(voter_id)
                    .bind(answer)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;

                    let counter_sql = if *answer {
                        "UPDATE question SET yes_count = yes_count + 1 WHERE id = ?1"
                    } else {
                        "UPDATE question SET no_count = no_count + 1 WHERE id = ?1"
                    };
                    sqlx::query(counter_sql)
                        .bind(question_id)
                        .execute(&mut *tx)
                        .await?;
                }
                VoteChoice::Option(option_id) => {
                    sqlx::query(
                        "INSERT INTO vote (id, question_id, voter_id, answer, option_id, created_at)
                         VALUES (?1, ?2, ?3, NULL, ?4, ?5)",
                    )
                    .bind(&vote_id)
                    .bind(question_id)
                    .bind(voter_id)
                    .bind(option_id)
                    .bind(now)
                    .execute(&mut *tx)
                    .await?;

                    sqlx::query(
                        "UPDATE question_option SET vote_count = vote_count + 1 WHERE id = ?1",
                    )
                    .bind(option_id)
                    .execute(&mut *tx)
                    .await?;
                }
            }

            Ok::<(), sqlx::Error>(())
        }
        .await;

        match write_result {
            Ok(()) => {
                if let Err(e) = tx.commit().await {
                    tracing::warn!(question_id, voter_id, "vote commit failed: {}", e);
                    return Err(PollError::AlreadyVoted);
                }
                Ok(())
            }
            Err(e) => {
                tracing::warn!(question_id, voter_id, "vote write failed: {}", e);
                // Rollback failure changes nothing for the caller; the
                // transaction is abandoned either way.
                let _ = tx.rollback().await;
                Err(PollError::AlreadyVoted)
            }
        }
    }

    /// Aggregate results for a question, straight from the denormalized
    /// counters.
    pub async fn results(&self, question_id: &str) -> PollResult<QuestionResults> {
        let question = sqlx::query_as::<_, Question>(
            "SELECT id, kind, prompt, yes_count, no_count, created_by, created_at
             FROM question WHERE id = ?1",
        )
        .bind(question_id)
        .fetch_optional(&self.db)
        .await
        .map_err(PollError::Database)?
        .ok_or_else(|| PollError::NotFound("Question not found".to_string()))?;

        let options = match question.kind {
            QuestionKind::Binary => Vec::new(),
            QuestionKind::Multi => sqlx::query_as::<_, QuestionOption>(
                "SELECT id, question_id, label, vote_count
                 FROM question_option WHERE question_id = ?1 ORDER BY label",
            )
            .bind(question_id)
            .fetch_all(&self.db)
            .await
            .map_err(PollError::Database)?,
        };

        let total_votes = match question.kind {
            QuestionKind::Binary => question.yes_count + question.no_count,
            QuestionKind::Multi => options.iter().map(|o| o.vote_count).sum(),
        };

        Ok(QuestionResults {
            question_id: question.id,
            prompt: question.prompt,
            kind: question.kind,
            yes_count: question.yes_count,
            no_count: question.no_count,
            options: options
                .into_iter()
                .map(|o| OptionResult {
                    id: o.id,
                    label: o.label,
                    vote_count: o.vote_count,
                })
                .collect(),
            total_votes,
        })
    }

    /// Counters plus the raw vote records for a question, oldest first.
    pub async fn export(&self, question_id: &str) -> PollResult<QuestionExport> {
        let results = self.results(question_id).await?;

        let votes = sqlx::query_as::<_, Vote>(
            "SELECT id, question_id, voter_id, answer, option_id, created_at
             FROM vote WHERE question_id = ?1 ORDER BY created_at",
        )
        .bind(question_id)
        .fetch_all(&self.db)
        .await
        .map_err(PollError::Database)?;

        Ok(QuestionExport { results, votes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use sqlx::SqlitePool;

    async fn seed(pool: &SqlitePool) {
        let now = Utc::now();

        for (id, email) in [("acct-1", "a@x.com"), ("acct-2", "b@x.com")] {
            sqlx::query(
                "INSERT INTO account (id, email, name, password_hash, premium, role, created_at)
                 VALUES (?1, ?2, 'Tester', 'hash', 0, 'user', ?3)",
            )
            .bind(id)
            .bind(email)
            .bind(now)
            .execute(pool)
            .await
            .unwrap();
        }

        sqlx::query(
            "INSERT INTO question (id, kind, prompt, yes_count, no_count, created_by, created_at)
             VALUES ('q-bin', 'binary', 'Ship it?', 0, 0, 'acct-1', ?1)",
        )
        .bind(now)
        .execute(pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO question (id, kind, prompt, yes_count, no_count, created_by, created_at)
             VALUES ('q-multi', 'multi', 'Favorite color?', 0, 0, 'acct-1', ?1)",
        )
        .bind(now)
        .execute(pool)
        .await
        .unwrap();

        for (id, label) in [("opt-red", "Red"), ("opt-blue", "Blue")] {
            sqlx::query(
                "INSERT INTO question_option (id, question_id, label, vote_count)
                 VALUES (?1, 'q-multi', ?2, 0)",
            )
            .bind(id)
            .bind(label)
            .execute(pool)
            .await
            .unwrap();
        }

        // An option hanging off a different question, for mismatch tests
        sqlx::query(
            "INSERT INTO question (id, kind, prompt, yes_count, no_count, created_by, created_at)
             VALUES ('q-other', 'multi', 'Other?', 0, 0, 'acct-1', ?1)",
        )
        .bind(now)
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO question_option (id, question_id, label, vote_count)
             VALUES ('opt-foreign', 'q-other', 'Foreign', 0)",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    async fn setup_recorder() -> VoteRecorder {
        let pool = sqlx::pool::PoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();
        seed(&pool).await;

        VoteRecorder::new(pool)
    }

    async fn vote_rows(db: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM vote")
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_binary_vote_updates_counter() {
        let recorder = setup_recorder().await;

        recorder
            .record_vote("q-bin", "acct-1", VoteChoice::Binary(true))
            .await
            .unwrap();
        recorder
            .record_vote("q-bin", "acct-2", VoteChoice::Binary(false))
            .await
            .unwrap();

        let results = recorder.results("q-bin").await.unwrap();
        assert_eq!(results.yes_count, 1);
        assert_eq!(results.no_count, 1);
        assert_eq!(results.total_votes, 2);
    }

    #[tokio::test]
    async fn test_multi_vote_updates_option_counter() {
        let recorder = setup_recorder().await;

        recorder
            .record_vote("q-multi", "acct-1", VoteChoice::Option("opt-red".to_string()))
            .await
            .unwrap();

        let results = recorder.results("q-multi").await.unwrap();
        let red = results.options.iter().find(|o| o.id == "opt-red").unwrap();
        let blue = results.options.iter().find(|o| o.id == "opt-blue").unwrap();
        assert_eq!(red.vote_count, 1);
        assert_eq!(blue.vote_count, 0);
        assert_eq!(results.total_votes, 1);
    }

    #[tokio::test]
    async fn test_duplicate_vote_rejected_and_counter_unchanged() {
        let recorder = setup_recorder().await;

        recorder
            .record_vote("q-bin", "acct-1", VoteChoice::Binary(true))
            .await
            .unwrap();

        let second = recorder
            .record_vote("q-bin", "acct-1", VoteChoice::Binary(false))
            .await;
        assert!(matches!(second, Err(PollError::AlreadyVoted)));

        let results = recorder.results("q-bin").await.unwrap();
        assert_eq!(results.yes_count, 1);
        assert_eq!(results.no_count, 0);
        assert_eq!(vote_rows(&recorder.db).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_voter_and_question() {
        let recorder = setup_recorder().await;

        let no_voter = recorder
            .record_vote("q-bin", "nobody", VoteChoice::Binary(true))
            .await;
        assert!(matches!(no_voter, Err(PollError::NotFound(_))));

        let no_question = recorder
            .record_vote("q-missing", "acct-1", VoteChoice::Binary(true))
            .await;
        assert!(matches!(no_question, Err(PollError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_choice_kind_mismatch() {
        let recorder = setup_recorder().await;

        let result = recorder
            .record_vote("q-bin", "acct-1", VoteChoice::Option("opt-red".to_string()))
            .await;
        assert!(matches!(result, Err(PollError::Validation(_))));

        let result = recorder
            .record_vote("q-multi", "acct-1", VoteChoice::Binary(true))
            .await;
        assert!(matches!(result, Err(PollError::Validation(_))));

        assert_eq!(vote_rows(&recorder.db).await, 0);
    }

    #[tokio::test]
    async fn test_foreign_option_leaves_no_partial_state() {
        let recorder = setup_recorder().await;

        let result = recorder
            .record_vote(
                "q-multi",
                "acct-1",
                VoteChoice::Option("opt-foreign".to_string()),
            )
            .await;
        assert!(matches!(result, Err(PollError::Validation(_))));

        // No vote row, no counter movement anywhere
        assert_eq!(vote_rows(&recorder.db).await, 0);
        let results = recorder.results("q-multi").await.unwrap();
        assert_eq!(results.total_votes, 0);
        let other = recorder.results("q-other").await.unwrap();
        assert_eq!(other.total_votes, 0);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_votes_one_winner() {
        // A file-backed pool so the two calls really run on separate
        // connections.
        let dir = tempfile::tempdir().unwrap();
        let pool = db::create_pool(&dir.path().join("votes.sqlite"), Default::default())
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();
        seed(&pool).await;

        let recorder = std::sync::Arc::new(VoteRecorder::new(pool.clone()));

        let first = {
            let recorder = recorder.clone();
            tokio::spawn(async move {
                recorder
                    .record_vote("q-bin", "acct-1", VoteChoice::Binary(true))
                    .await
            })
        };
        let second = {
            let recorder = recorder.clone();
            tokio::spawn(async move {
                recorder
                    .record_vote("q-bin", "acct-1", VoteChoice::Binary(true))
                    .await
            })
        };

        let (first, second) = (first.await.unwrap(), second.await.unwrap());

        let successes = [&first, &second].iter().filter(|r| r.is_ok()).count();
        let conflicts = [&first, &second]
            .iter()
            .filter(|r| matches!(r, Err(PollError::AlreadyVoted)))
            .count();
        assert_eq!(successes, 1, "exactly one vote must win");
        assert_eq!(conflicts, 1, "the loser must observe AlreadyVoted");

        // The counter moved by exactly one
        let recorder = VoteRecorder::new(pool);
        let results = recorder.results("q-bin").await.unwrap();
        assert_eq!(results.yes_count, 1);
        assert_eq!(vote_rows(&recorder.db).await, 1);
    }

    #[tokio::test]
    async fn test_export_includes_vote_records() {
        let recorder = setup_recorder().await;

        recorder
            .record_vote("q-bin", "acct-1", VoteChoice::Binary(true))
            .await
            .unwrap();
        recorder
            .record_vote("q-bin", "acct-2", VoteChoice::Binary(false))
            .await
            .unwrap();

        let export = recorder.export("q-bin").await.unwrap();
        assert_eq!(export.results.yes_count, 1);
        assert_eq!(export.results.no_count, 1);
        assert_eq!(export.votes.len(), 2);
        assert!(export.votes.iter().any(|v| v.voter_id == "acct-1" && v.answer == Some(true)));
        assert!(export.votes.iter().any(|v| v.voter_id == "acct-2" && v.answer == Some(false)));
    }

    #[tokio::test]
    async fn test_results_for_unknown_question() {
        let recorder = setup_recorder().await;
        let result = recorder.results("q-missing").await;
        assert!(matches!(result, Err(PollError::NotFound(_))));
    }
}
