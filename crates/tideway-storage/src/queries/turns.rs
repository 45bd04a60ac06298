// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation turn operations, including the transactional finalize write.

use rusqlite::params;
use tideway_core::TidewayError;
use tideway_core::types::TurnKind;

use crate::database::Database;
use crate::models::ConversationTurn;

/// Append a single turn.
pub async fn append_turn(db: &Database, turn: &ConversationTurn) -> Result<(), TidewayError> {
    let turn = turn.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<()> {
            conn.execute(
                "INSERT INTO turns (id, session_id, kind, content, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    turn.id,
                    turn.session_id,
                    turn.kind.to_string(),
                    turn.content,
                    turn.metadata,
                    turn.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Append a finalized exchange in one transaction, idempotent on `request_key`.
///
/// The ai turn carries `request_key` (the queue message id); a partial unique
/// index rejects a second finalize for the same message. Returns `false`
/// without writing anything when the exchange was already finalized, so a
/// redelivered message that raced a prior lease cannot double-append.
///
/// Also bumps the owning session's `updated_at` so the by-user listing
/// surfaces recently active sessions first.
pub async fn append_exchange(
    db: &Database,
    request_key: &str,
    turns: &[ConversationTurn],
) -> Result<bool, TidewayError> {
    let request_key = request_key.to_string();
    let turns = turns.to_vec();
    db.connection()
        .call(move |conn| -> rusqlite::Result<bool> {
            let tx = conn.transaction()?;

            let already_finalized: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM turns WHERE request_key = ?1)",
                params![request_key],
                |row| row.get(0),
            )?;
            if already_finalized {
                tx.commit()?;
                return Ok(false);
            }

            for turn in &turns {
                let key = match turn.kind {
                    TurnKind::Ai => Some(request_key.as_str()),
                    TurnKind::Human => None,
                };
                tx.execute(
                    "INSERT INTO turns (id, session_id, kind, content, metadata, request_key, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        turn.id,
                        turn.session_id,
                        turn.kind.to_string(),
                        turn.content,
                        turn.metadata,
                        key,
                        turn.created_at,
                    ],
                )?;
            }

            if let Some(first) = turns.first() {
                tx.execute(
                    "UPDATE sessions SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1",
                    params![first.session_id],
                )?;
            }

            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a session's turns in creation order.
pub async fn list_turns(
    db: &Database,
    session_id: &str,
    limit: Option<i64>,
) -> Result<Vec<ConversationTurn>, TidewayError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Vec<ConversationTurn>> {
            let mut turns = Vec::new();
            match limit {
                Some(lim) => {
                    let mut stmt = conn.prepare(
                        "SELECT id, session_id, kind, content, metadata, created_at
                         FROM turns WHERE session_id = ?1
                         ORDER BY created_at ASC, rowid ASC LIMIT ?2",
                    )?;
                    let rows = stmt.query_map(params![session_id, lim], map_turn_row)?;
                    for row in rows {
                        turns.push(row?);
                    }
                }
                None => {
                    let mut stmt = conn.prepare(
                        "SELECT id, session_id, kind, content, metadata, created_at
                         FROM turns WHERE session_id = ?1
                         ORDER BY created_at ASC, rowid ASC",
                    )?;
                    let rows = stmt.query_map(params![session_id], map_turn_row)?;
                    for row in rows {
                        turns.push(row?);
                    }
                }
            }
            Ok(turns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn map_turn_row(row: &rusqlite::Row<'_>) -> Result<ConversationTurn, rusqlite::Error> {
    let kind: String = row.get(2)?;
    let kind = kind.parse::<TurnKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(ConversationTurn {
        id: row.get(0)?,
        session_id: row.get(1)?,
        kind,
        content: row.get(3)?,
        metadata: row.get(4)?,
        created_at: row.get(5)?,
    })
}
