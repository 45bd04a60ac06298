// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion queue operations: visibility-timeout leases, acknowledgment,
//! early release, and dead-letter movement.

use rusqlite::params;
use tideway_core::TidewayError;
use uuid::Uuid;

use crate::database::Database;
use crate::models::{DeadLetter, QueueDepth, QueueLease};

/// Lease and dead-letter policy applied by [`lease_next`].
#[derive(Debug, Clone, Copy)]
pub struct QueuePolicy {
    /// Lease duration in seconds.
    pub visibility_timeout_secs: u64,
    /// Deliveries allowed before a message is dead-lettered.
    pub max_receives: i64,
}

/// Enqueue a verbatim payload. Returns the stable message id.
pub async fn enqueue(db: &Database, payload: &str) -> Result<String, TidewayError> {
    let message_id = Uuid::new_v4().to_string();
    let payload = payload.to_string();
    let id = message_id.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<()> {
            conn.execute(
                "INSERT INTO ingestion_queue (message_id, payload) VALUES (?1, ?2)",
                params![id, payload],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(message_id)
}

/// Lease the next deliverable message under the given policy.
///
/// One transaction scans for the oldest message that is either pending or
/// holds an expired lease. A candidate that already spent its receive budget
/// is moved verbatim to `dead_letters` and the scan continues; otherwise the
/// candidate is leased: `receive_count` incremented and `locked_until` set
/// `visibility_timeout_secs` into the future. Returns `None` when nothing is
/// deliverable.
pub async fn lease_next(
    db: &Database,
    policy: &QueuePolicy,
) -> Result<Option<QueueLease>, TidewayError> {
    let policy = *policy;
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<QueueLease>> {
            let tx = conn.transaction()?;
            let lock_modifier = format!("+{} seconds", policy.visibility_timeout_secs);

            let lease = loop {
                let candidate = {
                    let mut stmt = tx.prepare(
                        "SELECT id, message_id, payload, receive_count, enqueued_at
                         FROM ingestion_queue
                         WHERE status = 'pending'
                            OR (status = 'leased'
                                AND locked_until <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                         ORDER BY id ASC
                         LIMIT 1",
                    )?;
                    let result = stmt.query_row([], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    });
                    match result {
                        Ok(row) => Some(row),
                        Err(rusqlite::Error::QueryReturnedNoRows) => None,
                        Err(e) => return Err(e.into()),
                    }
                };

                let Some((id, message_id, payload, receive_count, enqueued_at)) = candidate
                else {
                    break None;
                };

                // Budget spent: the next delivery attempt dead-letters the
                // message instead of handing it out.
                if receive_count >= policy.max_receives {
                    tx.execute(
                        "INSERT INTO dead_letters
                             (message_id, payload, receive_count, enqueued_at)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![message_id, payload, receive_count, enqueued_at],
                    )?;
                    tx.execute("DELETE FROM ingestion_queue WHERE id = ?1", params![id])?;
                    continue;
                }

                tx.execute(
                    "UPDATE ingestion_queue
                     SET status = 'leased',
                         receive_count = receive_count + 1,
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?1)
                     WHERE id = ?2",
                    params![lock_modifier, id],
                )?;
                let locked_until: String = tx.query_row(
                    "SELECT locked_until FROM ingestion_queue WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )?;

                break Some(QueueLease {
                    id,
                    message_id,
                    payload,
                    receive_count: receive_count + 1,
                    enqueued_at,
                    locked_until,
                });
            };

            tx.commit()?;
            Ok(lease)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Acknowledge a leased message, removing it permanently.
pub async fn ack(db: &Database, id: i64) -> Result<(), TidewayError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<()> {
            conn.execute("DELETE FROM ingestion_queue WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Release a lease early, making the message immediately redeliverable.
///
/// The receive count is preserved; the redelivery budget still governs the
/// message's final disposition.
pub async fn release(db: &Database, id: i64) -> Result<(), TidewayError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<()> {
            conn.execute(
                "UPDATE ingestion_queue SET status = 'pending', locked_until = NULL
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List dead-lettered messages, oldest first.
pub async fn dead_letters(
    db: &Database,
    limit: Option<i64>,
) -> Result<Vec<DeadLetter>, TidewayError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<Vec<DeadLetter>> {
            let lim = limit.unwrap_or(i64::MAX);
            let mut stmt = conn.prepare(
                "SELECT id, message_id, payload, receive_count, enqueued_at, dead_lettered_at
                 FROM dead_letters ORDER BY id ASC LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![lim], |row| {
                Ok(DeadLetter {
                    id: row.get(0)?,
                    message_id: row.get(1)?,
                    payload: row.get(2)?,
                    receive_count: row.get(3)?,
                    enqueued_at: row.get(4)?,
                    dead_lettered_at: row.get(5)?,
                })
            })?;
            let mut letters = Vec::new();
            for row in rows {
                letters.push(row?);
            }
            Ok(letters)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Move a dead letter back onto the queue with a fresh receive budget.
///
/// Returns the message id, or `None` if no dead letter has the given id.
pub async fn replay_dead_letter(db: &Database, id: i64) -> Result<Option<String>, TidewayError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<String>> {
            let tx = conn.transaction()?;

            let letter = {
                let result = tx.query_row(
                    "SELECT message_id, payload FROM dead_letters WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
                );
                match result {
                    Ok(row) => Some(row),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };

            let Some((message_id, payload)) = letter else {
                tx.commit()?;
                return Ok(None);
            };

            tx.execute(
                "INSERT INTO ingestion_queue (message_id, payload) VALUES (?1, ?2)",
                params![message_id, payload],
            )?;
            tx.execute("DELETE FROM dead_letters WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(Some(message_id))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Current pending/leased/dead counts.
pub async fn depth(db: &Database) -> Result<QueueDepth, TidewayError> {
    db.connection()
        .call(|conn| -> rusqlite::Result<QueueDepth> {
            let pending: i64 = conn.query_row(
                "SELECT COUNT(*) FROM ingestion_queue WHERE status = 'pending'",
                [],
                |row| row.get(0),
            )?;
            let leased: i64 = conn.query_row(
                "SELECT COUNT(*) FROM ingestion_queue WHERE status = 'leased'",
                [],
                |row| row.get(0),
            )?;
            let dead: i64 =
                conn.query_row("SELECT COUNT(*) FROM dead_letters", [], |row| row.get(0))?;
            Ok(QueueDepth {
                pending,
                leased,
                dead,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const POLICY: QueuePolicy = QueuePolicy {
        visibility_timeout_secs: 5400,
        max_receives: 3,
    };

    /// Expired-on-arrival leases, for redelivery tests without sleeping.
    const INSTANT_EXPIRY: QueuePolicy = QueuePolicy {
        visibility_timeout_secs: 0,
        max_receives: 3,
    };

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn enqueue_and_lease_lifecycle() {
        let (db, _dir) = setup_db().await;

        let message_id = enqueue(&db, r#"{"text":"hello"}"#).await.unwrap();

        let lease = lease_next(&db, &POLICY).await.unwrap().unwrap();
        assert_eq!(lease.message_id, message_id);
        assert_eq!(lease.payload, r#"{"text":"hello"}"#);
        assert_eq!(lease.receive_count, 1);

        // The message is leased; nothing else is deliverable.
        let next = lease_next(&db, &POLICY).await.unwrap();
        assert!(next.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn ack_removes_the_message_permanently() {
        let (db, _dir) = setup_db().await;

        enqueue(&db, "payload").await.unwrap();
        let lease = lease_next(&db, &POLICY).await.unwrap().unwrap();
        ack(&db, lease.id).await.unwrap();

        let depth = depth(&db).await.unwrap();
        assert_eq!(depth.pending, 0);
        assert_eq!(depth.leased, 0);
        assert!(lease_next(&db, &POLICY).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn expired_lease_is_redelivered_with_incremented_count() {
        let (db, _dir) = setup_db().await;

        enqueue(&db, "payload").await.unwrap();

        let first = lease_next(&db, &INSTANT_EXPIRY).await.unwrap().unwrap();
        assert_eq!(first.receive_count, 1);

        // No ack, no release: the zero-second lease has already expired.
        let second = lease_next(&db, &INSTANT_EXPIRY).await.unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.message_id, first.message_id);
        assert_eq!(second.receive_count, 2);
        assert_eq!(second.payload, first.payload, "redelivery is verbatim");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn release_makes_message_immediately_redeliverable() {
        let (db, _dir) = setup_db().await;

        enqueue(&db, "payload").await.unwrap();

        let first = lease_next(&db, &POLICY).await.unwrap().unwrap();
        assert!(lease_next(&db, &POLICY).await.unwrap().is_none());

        release(&db, first.id).await.unwrap();

        // Redeliverable at once despite the 90 minute visibility timeout,
        // and the receive budget was not reset.
        let second = lease_next(&db, &POLICY).await.unwrap().unwrap();
        assert_eq!(second.receive_count, 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fourth_delivery_attempt_dead_letters_instead() {
        let (db, _dir) = setup_db().await;

        let message_id = enqueue(&db, r#"{"n":1}"#).await.unwrap();

        // Three deliveries, none acknowledged.
        for expected in 1..=3 {
            let lease = lease_next(&db, &INSTANT_EXPIRY).await.unwrap().unwrap();
            assert_eq!(lease.receive_count, expected);
        }

        // The fourth attempt never reaches a handler: the message moves to
        // the dead-letter queue verbatim.
        assert!(lease_next(&db, &INSTANT_EXPIRY).await.unwrap().is_none());

        let letters = dead_letters(&db, None).await.unwrap();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].message_id, message_id);
        assert_eq!(letters[0].payload, r#"{"n":1}"#);
        assert_eq!(letters[0].receive_count, 3);

        let depth = depth(&db).await.unwrap();
        assert_eq!(depth.pending, 0);
        assert_eq!(depth.leased, 0);
        assert_eq!(depth.dead, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn dead_lettering_skips_to_the_next_deliverable_message() {
        let (db, _dir) = setup_db().await;

        let doomed = enqueue(&db, "doomed").await.unwrap();
        for _ in 0..3 {
            lease_next(&db, &INSTANT_EXPIRY).await.unwrap().unwrap();
        }
        let healthy = enqueue(&db, "healthy").await.unwrap();

        // One call both dead-letters the exhausted message and returns the
        // healthy one.
        let lease = lease_next(&db, &INSTANT_EXPIRY).await.unwrap().unwrap();
        assert_eq!(lease.message_id, healthy);

        let letters = dead_letters(&db, None).await.unwrap();
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].message_id, doomed);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn replay_restores_dead_letter_with_fresh_budget() {
        let (db, _dir) = setup_db().await;

        let original = enqueue(&db, "flaky").await.unwrap();
        for _ in 0..3 {
            lease_next(&db, &INSTANT_EXPIRY).await.unwrap().unwrap();
        }
        assert!(lease_next(&db, &INSTANT_EXPIRY).await.unwrap().is_none());

        let letters = dead_letters(&db, None).await.unwrap();
        let replayed = replay_dead_letter(&db, letters[0].id).await.unwrap();
        assert_eq!(replayed.as_deref(), Some(original.as_str()));

        assert!(dead_letters(&db, None).await.unwrap().is_empty());

        // Fresh budget: delivered again with receive_count 1.
        let lease = lease_next(&db, &INSTANT_EXPIRY).await.unwrap().unwrap();
        assert_eq!(lease.message_id, original);
        assert_eq!(lease.receive_count, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn replay_unknown_id_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(replay_dead_letter(&db, 42).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn leases_are_fifo_by_enqueue_order() {
        let (db, _dir) = setup_db().await;

        let first = enqueue(&db, "first").await.unwrap();
        let second = enqueue(&db, "second").await.unwrap();

        let l1 = lease_next(&db, &POLICY).await.unwrap().unwrap();
        let l2 = lease_next(&db, &POLICY).await.unwrap().unwrap();
        assert_eq!(l1.message_id, first);
        assert_eq!(l2.message_id, second);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_enqueues_do_not_conflict() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("concurrent_test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let conn = db.connection().clone();
            let handle = tokio::spawn(async move {
                conn.call(move |conn| -> rusqlite::Result<()> {
                    conn.execute(
                        "INSERT INTO ingestion_queue (message_id, payload) VALUES (?1, ?2)",
                        params![format!("m-{i}"), format!(r#"{{"n":{i}}}"#)],
                    )?;
                    Ok(())
                })
                .await
            });
            handles.push(handle);
        }

        for handle in handles {
            let result = handle.await.unwrap();
            assert!(result.is_ok(), "concurrent enqueue failed: {result:?}");
        }

        let depth = depth(&db).await.unwrap();
        assert_eq!(depth.pending, 10);

        db.close().await.unwrap();
    }
}
