use amisecret_db::models::DrawRecord;

use crate::fairness::win_counts;
use crate::random::RandomSource;

/// Poids inverses de la fréquence de victoire : `max_wins - wins + 1`.
/// Le `+ 1` garantit qu'aucun participant n'a une probabilité nulle.
pub fn weights(participants: &[String], history: &[DrawRecord]) -> Vec<u64> {
    let counts = win_counts(participants, history);
    let max_wins = counts.iter().copied().max().unwrap_or(0);
    counts.iter().map(|&wins| (max_wins - wins) as u64 + 1).collect()
}

/// Sélection par poids cumulés : on tire r dans `[0, total)` puis on retranche
/// les poids dans l'ordre de l'ensemble jusqu'à ce que le reste soit ≤ 0.
pub fn pick(participants: &[String], history: &[DrawRecord], rng: &mut dyn RandomSource) -> usize {
    let weights = weights(participants, history);
    let total: u64 = weights.iter().sum();
    let mut remaining = rng.unit() * total as f64;

    for (i, &w) in weights.iter().enumerate() {
        remaining -= w as f64;
        if remaining <= 0.0 {
            return i;
        }
    }

    0
}
