// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the SessionStore and IngestionQueue traits.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use tideway_config::model::{QueueConfig, StorageConfig};
use tideway_core::types::{
    AdapterType, ConversationTurn, DeadLetter, HealthStatus, QueueDepth, QueueLease, Session,
};
use tideway_core::{IngestionQueue, PipelineAdapter, SessionStore, TidewayError};

use crate::database::Database;
use crate::queries;
use crate::queries::queue::QueuePolicy;

/// SQLite-backed store implementing both halves of the pipeline's durable
/// state: the session store and the ingestion/dead-letter queue.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`SessionStore::initialize`].
pub struct SqlitePipelineStore {
    config: StorageConfig,
    policy: QueuePolicy,
    db: OnceCell<Database>,
}

impl SqlitePipelineStore {
    /// Create a new store with the given configuration.
    ///
    /// The database connection is not opened until `initialize` is called.
    pub fn new(storage: StorageConfig, queue: QueueConfig) -> Self {
        Self {
            config: storage,
            policy: QueuePolicy {
                visibility_timeout_secs: queue.visibility_timeout_secs,
                max_receives: queue.max_receives,
            },
            db: OnceCell::new(),
        }
    }

    /// Returns the active lease policy.
    pub fn policy(&self) -> QueuePolicy {
        self.policy
    }

    fn db(&self) -> Result<&Database, TidewayError> {
        self.db.get().ok_or_else(|| TidewayError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PipelineAdapter for SqlitePipelineStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, TidewayError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> rusqlite::Result<()> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TidewayError> {
        if let Some(db) = self.db.get() {
            db.connection()
                .call(|conn| -> rusqlite::Result<()> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqlitePipelineStore {
    async fn initialize(&self) -> Result<(), TidewayError> {
        let db = Database::open(&self.config.database_path).await?;
        if !self.config.wal_mode {
            db.connection()
                .call(|conn| -> rusqlite::Result<()> {
                    conn.execute_batch("PRAGMA journal_mode = DELETE;")?;
                    Ok(())
                })
                .await
                .map_err(crate::database::map_tr_err)?;
        }
        self.db.set(db).map_err(|_| TidewayError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite pipeline store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), TidewayError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> rusqlite::Result<()> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn ensure_session(&self, session_id: &str, user_id: &str) -> Result<(), TidewayError> {
        queries::sessions::ensure_session(self.db()?, session_id, user_id).await
    }

    async fn append_turn(&self, turn: &ConversationTurn) -> Result<(), TidewayError> {
        queries::turns::append_turn(self.db()?, turn).await
    }

    async fn append_exchange(
        &self,
        request_key: &str,
        turns: &[ConversationTurn],
    ) -> Result<bool, TidewayError> {
        queries::turns::append_exchange(self.db()?, request_key, turns).await
    }

    async fn list_turns(
        &self,
        session_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ConversationTurn>, TidewayError> {
        queries::turns::list_turns(self.db()?, session_id, limit).await
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>, TidewayError> {
        queries::sessions::list_sessions_for_user(self.db()?, user_id).await
    }
}

#[async_trait]
impl IngestionQueue for SqlitePipelineStore {
    async fn enqueue(&self, payload: &str) -> Result<String, TidewayError> {
        queries::queue::enqueue(self.db()?, payload).await
    }

    async fn lease_next(&self) -> Result<Option<QueueLease>, TidewayError> {
        queries::queue::lease_next(self.db()?, &self.policy).await
    }

    async fn ack(&self, id: i64) -> Result<(), TidewayError> {
        queries::queue::ack(self.db()?, id).await
    }

    async fn release(&self, id: i64) -> Result<(), TidewayError> {
        queries::queue::release(self.db()?, id).await
    }

    async fn dead_letters(&self, limit: Option<i64>) -> Result<Vec<DeadLetter>, TidewayError> {
        queries::queue::dead_letters(self.db()?, limit).await
    }

    async fn replay_dead_letter(&self, id: i64) -> Result<String, TidewayError> {
        queries::queue::replay_dead_letter(self.db()?, id)
            .await?
            .ok_or_else(|| TidewayError::Internal(format!("no dead letter with id {id}")))
    }

    async fn depth(&self) -> Result<QueueDepth, TidewayError> {
        queries::queue::depth(self.db()?).await
    }
}
