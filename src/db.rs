// SQLite persistence layer for the roster, saved sessions, and court colors.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use tracing::warn;

use crate::session::history::SessionRecord;
use crate::session::state::{RosterEntry, GUEST_PLAYER_ID};

/// SQLite-backed persistence for the player roster, finished sessions, and
/// per-court color tags.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS roster (
                id    TEXT PRIMARY KEY,
                name  TEXT NOT NULL,
                phone TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id        TEXT PRIMARY KEY,
                date      TEXT NOT NULL,
                game_type TEXT NOT NULL,
                players   TEXT NOT NULL,
                summary   TEXT NOT NULL,
                saved_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS court_colors (
                court_index INTEGER PRIMARY KEY,
                color       TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    /// Load the persisted roster, in insertion order. Any stray guest row is
    /// filtered out: the guest is a fixture, not a roster member.
    pub fn load_roster(&self) -> Result<Vec<RosterEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, name, phone FROM roster WHERE id != ?1 ORDER BY rowid")
            .context("failed to prepare load_roster query")?;

        let entries = stmt
            .query_map(params![GUEST_PLAYER_ID], |row| {
                Ok(RosterEntry {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    phone: row.get(2)?,
                })
            })
            .context("failed to query roster")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map roster rows")?;

        Ok(entries)
    }

    /// Replace the whole persisted roster with `entries`, atomically. The
    /// roster is small (one venue's regulars) so whole-list replacement is
    /// simpler and safer than per-row diffing.
    pub fn save_roster(&self, entries: &[RosterEntry]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin roster transaction")?;

        tx.execute("DELETE FROM roster", [])
            .context("failed to clear roster")?;
        for entry in entries {
            if entry.id == GUEST_PLAYER_ID {
                continue;
            }
            tx.execute(
                "INSERT INTO roster (id, name, phone) VALUES (?1, ?2, ?3)",
                params![entry.id, entry.name, entry.phone],
            )
            .context("failed to insert roster entry")?;
        }

        tx.commit().context("failed to commit roster")
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Persist one finished session. Player snapshots and the summary are
    /// stored as JSON text columns.
    pub fn save_session(&self, record: &SessionRecord) -> Result<()> {
        let conn = self.conn();
        let players_json = serde_json::to_string(&record.players)
            .context("failed to serialize session players")?;
        let summary_json = serde_json::to_string(&record.summary)
            .context("failed to serialize session summary")?;
        conn.execute(
            "INSERT OR REPLACE INTO sessions (id, date, game_type, players, summary)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.date.to_rfc3339(),
                record.game_type.to_string(),
                players_json,
                summary_json,
            ],
        )
        .context("failed to save session")?;
        Ok(())
    }

    /// Load all saved sessions, newest first. Rows that fail to decode are
    /// skipped with a warning rather than failing the whole load, so one
    /// corrupt row cannot make the history unreadable.
    pub fn load_sessions(&self) -> Result<Vec<SessionRecord>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT id, date, game_type, players, summary FROM sessions ORDER BY date DESC")
            .context("failed to prepare load_sessions query")?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .context("failed to query sessions")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map session rows")?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, date, game_type, players_json, summary_json) in rows {
            match decode_session(&id, &date, &game_type, &players_json, &summary_json) {
                Ok(record) => records.push(record),
                Err(e) => warn!(session_id = %id, error = %e, "skipping undecodable session row"),
            }
        }

        Ok(records)
    }

    /// Delete all saved sessions.
    pub fn clear_history(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute("DELETE FROM sessions", [])
            .context("failed to clear session history")?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Court colors
    // ------------------------------------------------------------------

    /// Persist a display color for one court. Overwrites any previous color.
    pub fn set_court_color(&self, court_index: usize, color: &str) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO court_colors (court_index, color) VALUES (?1, ?2)",
            params![court_index as i64, color],
        )
        .context("failed to set court color")?;
        Ok(())
    }

    /// Load all persisted court colors as (court_index, color) pairs.
    pub fn load_court_colors(&self) -> Result<Vec<(usize, String)>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT court_index, color FROM court_colors ORDER BY court_index")
            .context("failed to prepare load_court_colors query")?;

        let colors = stmt
            .query_map([], |row| {
                let idx: i64 = row.get(0)?;
                let color: String = row.get(1)?;
                Ok((idx as usize, color))
            })
            .context("failed to query court colors")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map court color rows")?;

        Ok(colors)
    }
}

fn decode_session(
    id: &str,
    date: &str,
    game_type: &str,
    players_json: &str,
    summary_json: &str,
) -> Result<SessionRecord> {
    let date = chrono::DateTime::parse_from_rfc3339(date)
        .context("invalid session date")?
        .with_timezone(&chrono::Utc);
    let game_type = game_type.parse().context("invalid game type")?;
    let players = serde_json::from_str(players_json).context("invalid player snapshots")?;
    let summary = serde_json::from_str(summary_json).context("invalid summary")?;
    Ok(SessionRecord {
        id: id.to_string(),
        date,
        game_type,
        players,
        summary,
    })
}
