use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;

use amisecret_db::models::DrawRecord;
use amisecret_engine::session::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Debug, Serialize)]
struct Metadata {
    app_name: &'static str,
    version: &'static str,
    export_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct ExportDocument<'a> {
    metadata: Metadata,
    total_draws: usize,
    total_friends: usize,
    #[serde(flatten)]
    snapshot: &'a Snapshot,
}

pub fn default_file_name(format: ExportFormat, date: NaiveDate) -> String {
    match format {
        ExportFormat::Json => format!("amisecret-donnees-{}.json", date.format("%Y-%m-%d")),
        ExportFormat::Csv => format!("amisecret-historique-{}.csv", date.format("%Y-%m-%d")),
    }
}

pub fn render_json(snapshot: &Snapshot, now: DateTime<Utc>) -> Result<String> {
    let document = ExportDocument {
        metadata: Metadata {
            app_name: "amisecret",
            version: env!("CARGO_PKG_VERSION"),
            export_date: now,
        },
        total_draws: snapshot.history.len(),
        total_friends: snapshot.participants.len(),
        snapshot,
    };
    serde_json::to_string_pretty(&document).context("Échec de la sérialisation JSON")
}

/// Une ligne par tirage : gagnant, stratégie, date, heure (locales),
/// participants au moment du tirage, taille de l'instantané.
pub fn write_csv<W: Write>(history: &[DrawRecord], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["winner", "strategy", "date", "time", "participant_count", "total_friends"])?;

    for draw in history {
        let local = draw.timestamp.with_timezone(&Local);
        let total_friends = if draw.participants.is_empty() {
            draw.participant_count
        } else {
            draw.participants.len()
        };
        wtr.write_record([
            draw.winner.clone(),
            draw.strategy.to_string(),
            local.format("%Y-%m-%d").to_string(),
            local.format("%H:%M:%S").to_string(),
            draw.participant_count.to_string(),
            total_friends.to_string(),
        ])?;
    }

    wtr.flush().context("Échec de l'écriture CSV")?;
    Ok(())
}

pub fn render_csv(history: &[DrawRecord]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(history, &mut buf)?;
    String::from_utf8(buf).context("CSV non UTF-8")
}

/// Écrit l'export et retourne le chemin effectivement utilisé.
pub fn export(snapshot: &Snapshot, format: ExportFormat, output: Option<&Path>) -> Result<PathBuf> {
    let now = Utc::now();
    let path = match output {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(default_file_name(format, now.with_timezone(&Local).date_naive())),
    };

    let content = match format {
        ExportFormat::Json => render_json(snapshot, now)?,
        ExportFormat::Csv => render_csv(&snapshot.history)?,
    };

    std::fs::write(&path, content)
        .with_context(|| format!("Impossible d'écrire {:?}", path))?;
    Ok(path)
}
