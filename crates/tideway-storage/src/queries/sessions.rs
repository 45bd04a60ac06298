// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session CRUD operations.

use rusqlite::params;
use tideway_core::TidewayError;

use crate::database::Database;
use crate::models::Session;

/// Create the session row if it does not exist; bump `updated_at` if it does.
///
/// Sessions are created implicitly on the first finalized turn, so this is
/// safe to call on every exchange.
pub async fn ensure_session(
    db: &Database,
    session_id: &str,
    user_id: &str,
) -> Result<(), TidewayError> {
    let session_id = session_id.to_string();
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<()> {
            conn.execute(
                "INSERT INTO sessions (id, user_id) VALUES (?1, ?2)
                 ON CONFLICT (id) DO UPDATE
                 SET updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![session_id, user_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a session by ID.
pub async fn get_session(db: &Database, id: &str) -> Result<Option<Session>, TidewayError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Option<Session>> {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, created_at, updated_at FROM sessions WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], |row| {
                Ok(Session {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            });
            match result {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a user's sessions via the secondary index, most recently active first.
pub async fn list_sessions_for_user(
    db: &Database,
    user_id: &str,
) -> Result<Vec<Session>, TidewayError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| -> rusqlite::Result<Vec<Session>> {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, created_at, updated_at
                 FROM sessions WHERE user_id = ?1
                 ORDER BY updated_at DESC",
            )?;
            let rows = stmt.query_map(params![user_id], |row| {
                Ok(Session {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    created_at: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            })?;
            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(row?);
            }
            Ok(sessions)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
