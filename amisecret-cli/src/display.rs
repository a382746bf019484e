use chrono::{Local, NaiveDate};
use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL, Cell, Color};
use textplots::Plot;
use tracing::debug;

use amisecret_db::models::{DrawRecord, Strategy};
use amisecret_engine::fairness::win_counts;
use amisecret_engine::insights::{Insights, INSIGHTS_MIN_DRAWS, TREND_WINDOW};
use amisecret_engine::session::{SessionEvent, SessionObserver, Snapshot};

/// Observateur de présentation : affiche chaque changement d'état de la session.
pub struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn notify(&mut self, event: &SessionEvent) {
        debug!(?event, "événement de session");
        match event {
            SessionEvent::ParticipantAdded(name) => println!("Participant ajouté : {name}"),
            SessionEvent::ParticipantRemoved(name) => println!("Participant retiré : {name}"),
            SessionEvent::StrategyChanged(strategy) => {
                println!("Stratégie sélectionnée : {} ({})", strategy, strategy.description())
            }
            SessionEvent::WinnerDrawn(record) => display_winner(record),
            SessionEvent::HistoryCleared { removed } => {
                println!("Historique effacé ({removed} tirage(s) supprimé(s)).")
            }
        }
    }
}

fn format_local(record: &DrawRecord) -> String {
    record
        .timestamp
        .with_timezone(&Local)
        .format("%d/%m/%Y %H:%M:%S")
        .to_string()
}

pub fn display_winner(record: &DrawRecord) {
    println!("\n🎉 Gagnant sélectionné !\n");
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Ami secret", "Stratégie", "Participants", "Date"]);
    table.add_row(vec![
        Cell::new(&record.winner).fg(Color::Green),
        Cell::new(record.strategy.to_string()),
        Cell::new(record.participant_count.to_string()),
        Cell::new(format_local(record)),
    ]);
    println!("{table}");
}

pub fn display_participants(participants: &[String], history: &[DrawRecord]) {
    if participants.is_empty() {
        println!("Aucun participant pour l'instant. Lancez : amisecret add <nom>");
        return;
    }

    let wins = win_counts(participants, history);
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Nom", "Victoires"]);

    for (i, (name, w)) in participants.iter().zip(wins).enumerate() {
        table.add_row(vec![(i + 1).to_string(), name.clone(), w.to_string()]);
    }
    println!("{table}");
    println!("{} participant(s)", participants.len());
}

pub fn display_strategies(current: Strategy) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["", "Stratégie", "Description"]);

    for strategy in Strategy::ALL {
        let marker = if strategy == current { "▶" } else { "" };
        table.add_row(vec![
            Cell::new(marker).fg(Color::Green),
            Cell::new(strategy.to_string()),
            Cell::new(strategy.description()),
        ]);
    }
    println!("{table}");
}

pub fn display_history(history: &[DrawRecord], last: usize) {
    if history.is_empty() {
        println!("Aucun tirage pour l'instant.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Date", "Gagnant", "Stratégie", "Participants"]);

    for (i, draw) in history.iter().take(last).enumerate() {
        table.add_row(vec![
            &(i + 1).to_string(),
            &format_local(draw),
            &draw.winner,
            &draw.strategy.to_string(),
            &draw.participant_count.to_string(),
        ]);
    }
    println!("{table}");
    if history.len() > last {
        println!("({} tirage(s) plus ancien(s) non affiché(s))", history.len() - last);
    }
}

fn fairness_color(score: u8) -> Color {
    match score {
        80..=100 => Color::Green,
        50..=79 => Color::Yellow,
        _ => Color::Red,
    }
}

pub fn display_stats(snapshot: &Snapshot) {
    println!("\n📊 Statistiques\n");

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Tirages", "Participants", "Équité", "Dernière stratégie"]);
    table.add_row(vec![
        Cell::new(snapshot.history.len().to_string()),
        Cell::new(snapshot.participants.len().to_string()),
        Cell::new(format!("{}%", snapshot.fairness_score)).fg(fairness_color(snapshot.fairness_score)),
        Cell::new(
            snapshot
                .last_strategy
                .map(|s| s.to_string())
                .unwrap_or_else(|| "—".to_string()),
        ),
    ]);
    println!("{table}");

    if !snapshot.participants.is_empty() {
        println!("\n── Victoires par participant ──");
        let mut ranked: Vec<(String, usize)> = snapshot
            .participants
            .iter()
            .cloned()
            .zip(win_counts(&snapshot.participants, &snapshot.history))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let total = snapshot.history.len().max(1) as f64;
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Nom", "Victoires", "Part"]);
        for (name, wins) in &ranked {
            table.add_row(vec![
                name.clone(),
                wins.to_string(),
                format!("{:.1}%", *wins as f64 / total * 100.0),
            ]);
        }
        println!("{table}");
    }

    if !snapshot.strategy_usage.is_empty() {
        println!("\n── Utilisation des stratégies ──");
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Stratégie", "Utilisations"]);
        for usage in &snapshot.strategy_usage {
            table.add_row(vec![usage.strategy.to_string(), usage.uses.to_string()]);
        }
        println!("{table}");
    }
}

pub fn display_timeline(per_day: &[(NaiveDate, usize)]) {
    println!("\n== Tirages par jour ==\n");

    if per_day.len() < 2 {
        match per_day.first() {
            Some((date, n)) => println!("  {} : {} tirage(s)", date.format("%d/%m/%Y"), n),
            None => println!("  (Pas de données à afficher)"),
        }
        return;
    }

    let first = per_day[0].0;
    let points: Vec<(f32, f32)> = per_day
        .iter()
        .map(|(date, n)| ((*date - first).num_days() as f32, *n as f32))
        .collect();
    let x_max = points[points.len() - 1].0;
    let y_max = per_day.iter().map(|(_, n)| *n).max().unwrap_or(1) as f32 + 1.0;

    let shape = textplots::Shape::Bars(&points);
    let mut chart = textplots::Chart::new_with_y_range(120, 40, 0.0, x_max, 0.0, y_max);
    println!("{}", chart.lineplot(&shape));
    println!(
        "  du {} au {}",
        first.format("%d/%m/%Y"),
        per_day[per_day.len() - 1].0.format("%d/%m/%Y")
    );
}

pub fn display_insights(insights: Option<&Insights>, draws: usize) {
    let Some(insights) = insights else {
        println!(
            "Analyse disponible à partir de {} tirages ({} pour l'instant).",
            INSIGHTS_MIN_DRAWS, draws
        );
        return;
    };

    println!("\n🔎 Analyse de l'historique\n");
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Indicateur", "Valeur"]);

    table.add_row(vec![
        Cell::new("Le plus chanceux"),
        Cell::new(format!(
            "{} ({} victoire(s))",
            insights.luckiest.name, insights.luckiest.wins
        )),
    ]);
    table.add_row(vec![
        Cell::new("Stratégie favorite"),
        Cell::new(format!(
            "{} ({} utilisation(s))",
            insights.favorite_strategy.strategy, insights.favorite_strategy.uses
        )),
    ]);
    table.add_row(vec![
        Cell::new("Intervalle moyen"),
        Cell::new(match insights.cadence_days {
            Some(days) => format!("{:.1} jour(s)", days),
            None => "—".to_string(),
        }),
    ]);

    let trend_cell = match insights.fairness_trend {
        Some(t) if t > 0.0 => Cell::new(format!("+{:.1} (en amélioration)", t)).fg(Color::Green),
        Some(t) if t < 0.0 => Cell::new(format!("{:.1} (en baisse)", t)).fg(Color::Red),
        Some(_) => Cell::new("0.0 (stable)"),
        None => Cell::new(format!("— (moins de {} tirages)", TREND_WINDOW)),
    };
    table.add_row(vec![Cell::new("Tendance d'équité"), trend_cell]);

    println!("{table}");
}
