//! Per-session chat history operations.

use crate::database::Database;
use crate::error::{DbError, DbResult};
use atlas_core::{ChatMessage, Role};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use serde::Serialize;

/// A session with its stored message count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session: String,
    pub message_count: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

fn parse_json_column(value: Option<String>) -> Option<serde_json::Value> {
    value.and_then(|s| serde_json::from_str(&s).ok())
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<ChatMessage> {
    let role_str: String = row.get(2)?;
    let timestamp_str: String = row.get(7)?;

    Ok(ChatMessage {
        id: Some(row.get(0)?),
        session: row.get(1)?,
        role: Role::parse(&role_str).unwrap_or(Role::User),
        content: row.get(3)?,
        structured_data: parse_json_column(row.get(4)?),
        retrieved_documents: parse_json_column(row.get(5)?),
        embedding: row.get(6)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

const MESSAGE_COLUMNS: &str =
    "id, session, role, content, structured_data, retrieved_documents, embedding, timestamp";

impl Database {
    /// Append a message to its session and return the assigned row ID.
    pub fn append_message(&self, message: &ChatMessage) -> DbResult<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO chat_history
                (session, role, content, structured_data, retrieved_documents, embedding, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                message.session,
                message.role.as_str(),
                message.content,
                message.structured_data.as_ref().map(|v| v.to_string()),
                message.retrieved_documents.as_ref().map(|v| v.to_string()),
                message.embedding,
                message.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// The last `limit` messages of a session, oldest first.
    pub fn recent_messages(&self, session: &str, limit: usize) -> DbResult<Vec<ChatMessage>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM chat_history WHERE session = ?1 ORDER BY id DESC LIMIT ?2",
            MESSAGE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![session, limit as i64], message_from_row)?;

        let mut messages = rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)?;
        messages.reverse();
        Ok(messages)
    }

    /// Every message of a session in insertion order.
    pub fn list_messages(&self, session: &str) -> DbResult<Vec<ChatMessage>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM chat_history WHERE session = ?1 ORDER BY id ASC",
            MESSAGE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![session], message_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Delete a session's messages and return how many were removed.
    pub fn clear_history(&self, session: &str) -> DbResult<usize> {
        let conn = self.conn()?;
        let count = conn.execute("DELETE FROM chat_history WHERE session = ?1", params![session])?;
        Ok(count)
    }

    /// Sessions that have at least one message, most recently active first.
    pub fn list_sessions(&self) -> DbResult<Vec<SessionSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT session, COUNT(*), MAX(timestamp), MAX(id) AS last_id
            FROM chat_history
            GROUP BY session
            ORDER BY last_id DESC
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(1)?;
            let last: Option<String> = row.get(2)?;
            Ok(SessionSummary {
                session: row.get(0)?,
                message_count: count as usize,
                last_activity: last
                    .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Total number of stored chat messages.
    pub fn count_messages(&self) -> DbResult<usize> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM chat_history", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
