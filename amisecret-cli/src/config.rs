use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use amisecret_db::db::db_path;

pub const DEFAULT_SETTINGS_FILE: &str = "amisecret.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base SQLite ; `data/amisecret.db` dans le répertoire courant si absent.
    pub database: Option<PathBuf>,
    /// Pause avant la révélation du gagnant.
    pub reveal_delay_ms: u64,
    /// Nombre de tirages affichés par défaut par `history`.
    pub history_last: u32,
    /// Filtre de logs quand `RUST_LOG` n'est pas défini.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: None,
            reveal_delay_ms: 1000,
            history_last: 10,
            log_filter: "warn".to_string(),
        }
    }
}

impl Settings {
    pub fn database_path(&self) -> PathBuf {
        self.database.clone().unwrap_or_else(db_path)
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }
}

pub fn load_settings(path: &Path) -> Result<Settings> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire la configuration {:?}", path))?;
    let settings: Settings = serde_json::from_str(&json)
        .with_context(|| format!("Configuration invalide {:?}", path))?;
    Ok(settings)
}

/// Fichier explicite (obligatoire), sinon `amisecret.json` s'il existe, sinon défauts.
pub fn resolve_settings(explicit: Option<&Path>) -> Result<Settings> {
    match explicit {
        Some(path) => load_settings(path),
        None => {
            let default = Path::new(DEFAULT_SETTINGS_FILE);
            if default.exists() {
                load_settings(default)
            } else {
                Ok(Settings::default())
            }
        }
    }
}
