use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Nombre maximal de tirages conservés dans l'historique.
pub const HISTORY_CAP: usize = 100;

/// Longueur maximale d'un nom (en caractères, après trim).
pub const MAX_NAME_LEN: usize = 50;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    #[serde(alias = "simple")]
    #[value(alias = "simple")]
    Uniform,
    #[serde(alias = "fisher-yates")]
    #[value(alias = "fisher-yates")]
    Shuffle,
    Weighted,
    #[serde(alias = "crypto")]
    #[value(alias = "crypto")]
    Secure,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Uniform,
        Strategy::Shuffle,
        Strategy::Weighted,
        Strategy::Secure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Uniform => "uniform",
            Strategy::Shuffle => "shuffle",
            Strategy::Weighted => "weighted",
            Strategy::Secure => "secure",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Strategy::Uniform => "Tirage uniforme",
            Strategy::Shuffle => "Mélange de Fisher-Yates",
            Strategy::Weighted => "Pondéré par l'historique",
            Strategy::Secure => "Aléa cryptographique",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "uniform" | "simple" => Ok(Strategy::Uniform),
            "shuffle" | "fisher-yates" => Ok(Strategy::Shuffle),
            "weighted" => Ok(Strategy::Weighted),
            "secure" | "crypto" => Ok(Strategy::Secure),
            other => Err(CoreError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Trim + contrôle de longueur. L'identité d'un participant est le nom normalisé.
pub fn normalize_name(raw: &str) -> Result<String, CoreError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(CoreError::InvalidParticipantName {
            reason: "nom vide".to_string(),
        });
    }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(CoreError::InvalidParticipantName {
            reason: format!("{} caractères (maximum {})", len, MAX_NAME_LEN),
        });
    }
    Ok(name.to_string())
}

/// Ensemble ordonné de participants, sans doublon, ordre d'insertion conservé.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParticipantSet {
    names: Vec<String>,
}

impl ParticipantSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for name in names {
            set.add(name.as_ref())?;
        }
        Ok(set)
    }

    /// Ajoute un participant et retourne son nom normalisé.
    pub fn add(&mut self, raw: &str) -> Result<String, CoreError> {
        let name = normalize_name(raw)?;
        if self.names.contains(&name) {
            return Err(CoreError::DuplicateParticipant { name });
        }
        self.names.push(name.clone());
        Ok(name)
    }

    pub fn remove(&mut self, raw: &str) -> bool {
        let name = raw.trim();
        match self.names.iter().position(|n| n == name) {
            Some(idx) => {
                self.names.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, raw: &str) -> bool {
        let name = raw.trim();
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Un tirage terminé. Immuable une fois créé ; `participants` est une copie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub id: u64,
    pub winner: String,
    pub strategy: Strategy,
    pub timestamp: DateTime<Utc>,
    pub participant_count: usize,
    pub participants: Vec<String>,
}

/// Historique des tirages, le plus récent en tête, borné à `HISTORY_CAP`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct HistoryLog {
    records: Vec<DrawRecord>,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruit un historique depuis un stockage : ordre d'insertion
    /// (identifiants décroissants, l'horloge peut reculer) puis troncature.
    pub fn from_records(mut records: Vec<DrawRecord>) -> Self {
        records.sort_by(|a, b| b.id.cmp(&a.id));
        records.truncate(HISTORY_CAP);
        Self { records }
    }

    pub fn record(&mut self, draw: DrawRecord) {
        self.records.insert(0, draw);
        self.records.truncate(HISTORY_CAP);
    }

    pub fn records(&self) -> &[DrawRecord] {
        &self.records
    }

    pub fn latest(&self) -> Option<&DrawRecord> {
        self.records.first()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// État complet d'une session : participants, historique, stratégie préférée.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub participants: ParticipantSet,
    pub history: HistoryLog,
    pub strategy: Strategy,
}

/// Tirage factice horodaté à `id` secondes après l'époque.
pub fn make_test_record(id: u64, winner: &str, strategy: Strategy, participants: &[&str]) -> DrawRecord {
    DrawRecord {
        id,
        winner: winner.to_string(),
        strategy,
        timestamp: DateTime::<Utc>::from_timestamp_millis(id as i64 * 1000).unwrap_or_default(),
        participant_count: participants.len(),
        participants: participants.iter().map(|p| p.to_string()).collect(),
    }
}
