use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::cell::RefCell;
use std::path::Path;
use tracing::debug;

use crate::models::{AppState, DrawRecord, HistoryLog, ParticipantSet, Strategy};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS participants (
    position      INTEGER PRIMARY KEY,
    name          TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS draws (
    id                INTEGER PRIMARY KEY,
    winner            TEXT NOT NULL,
    strategy          TEXT NOT NULL,
    timestamp         TEXT NOT NULL,
    participant_count INTEGER NOT NULL,
    participants      TEXT NOT NULL DEFAULT '[]'
);
CREATE TABLE IF NOT EXISTS preferences (
    key           TEXT PRIMARY KEY,
    value         TEXT NOT NULL
);
";

const STRATEGY_KEY: &str = "strategy";

/// Collaborateur de persistance : le cœur charge et sauvegarde un état complet.
pub trait StateStore {
    /// `None` si rien n'a jamais été sauvegardé.
    fn load(&self) -> Result<Option<AppState>>;
    fn save(&self, state: &AppState) -> Result<()>;
}

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("amisecret.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    Ok(())
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

pub fn fetch_last_draws(conn: &Connection, limit: u32) -> Result<Vec<DrawRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, winner, strategy, timestamp, participant_count, participants
         FROM draws ORDER BY id DESC LIMIT ?1"
    )?;
    let rows = stmt.query_map([limit], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i64>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?.collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, winner, strategy, timestamp, count, participants)| {
            let strategy: Strategy = strategy
                .parse()
                .with_context(|| format!("Stratégie illisible pour le tirage {}", id))?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .with_context(|| format!("Horodatage illisible pour le tirage {}", id))?
                .with_timezone(&Utc);
            let participants: Vec<String> = serde_json::from_str(&participants)
                .with_context(|| format!("Liste de participants illisible pour le tirage {}", id))?;
            Ok(DrawRecord {
                id: id as u64,
                winner,
                strategy,
                timestamp,
                participant_count: count as usize,
                participants,
            })
        })
        .collect()
}

fn fetch_participants(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM participants ORDER BY position ASC")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

fn fetch_preference(conn: &Connection, key: &str) -> Result<Option<String>> {
    let mut stmt = conn.prepare("SELECT value FROM preferences WHERE key = ?1")?;
    let mut rows = stmt.query_map([key], |row| row.get::<_, String>(0))?;
    match rows.next() {
        Some(value) => Ok(Some(value?)),
        None => Ok(None),
    }
}

impl StateStore for Connection {
    fn load(&self) -> Result<Option<AppState>> {
        let names = fetch_participants(self)?;
        let draws = fetch_last_draws(self, u32::MAX)?;
        let strategy = fetch_preference(self, STRATEGY_KEY)?;

        if names.is_empty() && draws.is_empty() && strategy.is_none() {
            return Ok(None);
        }

        let participants = ParticipantSet::from_names(&names)
            .context("Participants enregistrés invalides")?;
        let strategy = match strategy {
            Some(s) => s.parse().context("Stratégie enregistrée invalide")?,
            None => Strategy::default(),
        };

        debug!(participants = participants.len(), draws = draws.len(), %strategy, "état chargé");
        Ok(Some(AppState {
            participants,
            history: HistoryLog::from_records(draws),
            strategy,
        }))
    }

    fn save(&self, state: &AppState) -> Result<()> {
        let tx = self.unchecked_transaction()
            .context("Impossible de démarrer la transaction")?;

        tx.execute("DELETE FROM participants", [])?;
        tx.execute("DELETE FROM draws", [])?;

        for (position, name) in state.participants.names().iter().enumerate() {
            tx.execute(
                "INSERT INTO participants (position, name) VALUES (?1, ?2)",
                rusqlite::params![position as i64, name],
            ).context("Échec de l'insertion d'un participant")?;
        }

        for draw in state.history.records() {
            let participants = serde_json::to_string(&draw.participants)?;
            tx.execute(
                "INSERT INTO draws (id, winner, strategy, timestamp, participant_count, participants)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    draw.id as i64,
                    draw.winner,
                    draw.strategy.as_str(),
                    draw.timestamp.to_rfc3339(),
                    draw.participant_count as i64,
                    participants,
                ],
            ).context("Échec de l'insertion d'un tirage")?;
        }

        tx.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            rusqlite::params![STRATEGY_KEY, state.strategy.as_str()],
        )?;

        tx.commit().context("Échec du commit")?;
        debug!(
            participants = state.participants.len(),
            draws = state.history.len(),
            "état sauvegardé"
        );
        Ok(())
    }
}

/// Stockage volatile, pour une session sans base de données.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RefCell<Option<AppState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AppState) -> Self {
        Self { state: RefCell::new(Some(state)) }
    }

    pub fn snapshot(&self) -> Option<AppState> {
        self.state.borrow().clone()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Option<AppState>> {
        Ok(self.state.borrow().clone())
    }

    fn save(&self, state: &AppState) -> Result<()> {
        *self.state.borrow_mut() = Some(state.clone());
        Ok(())
    }
}
