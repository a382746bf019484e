use serde::Serialize;

use amisecret_db::models::{DrawRecord, Strategy};

use crate::fairness::{fairness_for_draws, strategy_usage};

/// En dessous de ce nombre de tirages, pas d'analyse.
pub const INSIGHTS_MIN_DRAWS: usize = 5;

/// Taille des fenêtres comparées pour la tendance d'équité.
pub const TREND_WINDOW: usize = 10;

const MILLIS_PER_DAY: f64 = 1000.0 * 60.0 * 60.0 * 24.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Luckiest {
    pub name: String,
    pub wins: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoriteStrategy {
    pub strategy: Strategy,
    pub uses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub luckiest: Luckiest,
    pub favorite_strategy: FavoriteStrategy,
    /// Intervalle moyen entre deux tirages, en jours, à 0.1 près.
    pub cadence_days: Option<f64>,
    /// Équité des 10 derniers tirages moins celle des 10 précédents.
    pub fairness_trend: Option<f64>,
}

/// `None` tant que l'historique compte moins de `INSIGHTS_MIN_DRAWS` tirages.
pub fn insights(history: &[DrawRecord]) -> Option<Insights> {
    if history.len() < INSIGHTS_MIN_DRAWS {
        return None;
    }
    Some(Insights {
        luckiest: luckiest(history)?,
        favorite_strategy: favorite_strategy(history)?,
        cadence_days: cadence_days(history),
        fairness_trend: fairness_trend(history),
    })
}

/// Gagnant le plus fréquent sur tout l'historique. En cas d'égalité, le premier
/// rencontré en parcourant l'historique du plus récent au plus ancien l'emporte.
pub fn luckiest(history: &[DrawRecord]) -> Option<Luckiest> {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for draw in history {
        match tally.iter_mut().find(|(name, _)| *name == draw.winner) {
            Some((_, n)) => *n += 1,
            None => tally.push((draw.winner.as_str(), 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (name, wins) in tally {
        if best.map_or(true, |(_, b)| wins > b) {
            best = Some((name, wins));
        }
    }
    best.map(|(name, wins)| Luckiest {
        name: name.to_string(),
        wins,
    })
}

/// Stratégie la plus utilisée, même règle d'égalité que `luckiest`.
pub fn favorite_strategy(history: &[DrawRecord]) -> Option<FavoriteStrategy> {
    let mut best: Option<(Strategy, usize)> = None;
    for (strategy, uses) in strategy_usage(history) {
        if best.map_or(true, |(_, b)| uses > b) {
            best = Some((strategy, uses));
        }
    }
    best.map(|(strategy, uses)| FavoriteStrategy { strategy, uses })
}

/// Moyenne des écarts entre tirages consécutifs (historique du plus récent au
/// plus ancien), en jours arrondis à une décimale. `None` sous 2 tirages.
pub fn cadence_days(history: &[DrawRecord]) -> Option<f64> {
    if history.len() < 2 {
        return None;
    }
    let intervals: Vec<f64> = history
        .windows(2)
        .map(|pair| (pair[0].timestamp - pair[1].timestamp).num_milliseconds() as f64)
        .collect();
    let avg = intervals.iter().sum::<f64>() / intervals.len() as f64;
    let days = avg / MILLIS_PER_DAY;
    Some((days * 10.0).round() / 10.0)
}

/// Positif quand l'équité s'améliore. `None` sous `TREND_WINDOW` tirages.
pub fn fairness_trend(history: &[DrawRecord]) -> Option<f64> {
    if history.len() < TREND_WINDOW {
        return None;
    }
    let recent = &history[..TREND_WINDOW];
    let older = &history[TREND_WINDOW..history.len().min(TREND_WINDOW * 2)];
    Some(fairness_for_draws(recent) - fairness_for_draws(older))
}
