use std::collections::BTreeMap;

use chrono::NaiveDate;

use amisecret_db::models::{DrawRecord, Strategy};

/// Nombre de victoires de chaque participant, dans l'ordre de `participants`.
/// Les gagnants qui ne font plus partie de l'ensemble sont ignorés.
pub fn win_counts(participants: &[String], history: &[DrawRecord]) -> Vec<usize> {
    participants
        .iter()
        .map(|p| history.iter().filter(|d| &d.winner == p).count())
        .collect()
}

/// Variance de population.
pub fn variance(counts: &[usize]) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    let n = counts.len() as f64;
    let mean = counts.iter().sum::<usize>() as f64 / n;
    counts
        .iter()
        .map(|&c| {
            let d = c as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n
}

/// `max(0, 100 - 10 × variance)`, non arrondi.
pub fn score_from_variance(variance: f64) -> f64 {
    (100.0 - variance * 10.0).max(0.0)
}

/// Score d'équité 0-100 sur l'ensemble actuel. 100 sans historique ou sans participant.
pub fn fairness_score(participants: &[String], history: &[DrawRecord]) -> u8 {
    if history.is_empty() || participants.is_empty() {
        return 100;
    }
    let counts = win_counts(participants, history);
    score_from_variance(variance(&counts)).round() as u8
}

/// Équité d'une tranche d'historique, mesurée sur les participants présents
/// dans les instantanés de ces tirages. Non arrondie.
pub fn fairness_for_draws(draws: &[DrawRecord]) -> f64 {
    let mut distinct: Vec<&str> = Vec::new();
    for draw in draws {
        for p in &draw.participants {
            if !distinct.contains(&p.as_str()) {
                distinct.push(p.as_str());
            }
        }
    }
    if distinct.is_empty() {
        return 100.0;
    }

    let counts: Vec<usize> = distinct
        .iter()
        .map(|p| draws.iter().filter(|d| d.winner == *p).count())
        .collect();
    score_from_variance(variance(&counts))
}

/// Utilisation de chaque stratégie, dans l'ordre de première apparition
/// en parcourant l'historique du plus récent au plus ancien.
pub fn strategy_usage(history: &[DrawRecord]) -> Vec<(Strategy, usize)> {
    let mut usage: Vec<(Strategy, usize)> = Vec::new();
    for draw in history {
        match usage.iter_mut().find(|(s, _)| *s == draw.strategy) {
            Some((_, n)) => *n += 1,
            None => usage.push((draw.strategy, 1)),
        }
    }
    usage
}

/// Nombre de tirages par jour (UTC), dates croissantes.
pub fn draws_per_day(history: &[DrawRecord]) -> Vec<(NaiveDate, usize)> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for draw in history {
        *per_day.entry(draw.timestamp.date_naive()).or_insert(0) += 1;
    }
    per_day.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::names;
    use amisecret_db::models::make_test_record;

    const ABC: [&str; 3] = ["A", "B", "C"];

    fn history_of(winners: &[&str], all: &[&str]) -> Vec<DrawRecord> {
        let n = winners.len() as u64;
        winners
            .iter()
            .enumerate()
            .map(|(i, w)| make_test_record(n - i as u64, w, Strategy::Uniform, all))
            .collect()
    }

    #[test]
    fn test_empty_history_is_fully_fair() {
        assert_eq!(fairness_score(&names(&ABC), &[]), 100);
        assert_eq!(fairness_score(&names(&["Solo"]), &[]), 100);
        assert_eq!(fairness_score(&[], &[]), 100);
    }

    #[test]
    fn test_empty_participants_is_fully_fair() {
        let history = history_of(&["A"], &ABC);
        assert_eq!(fairness_score(&[], &history), 100);
    }

    #[test]
    fn test_single_draw_score() {
        // counts {1, 0, 0}: mean 1/3, variance 2/9 -> 100 - 2.22 = 97.78 -> 98
        let history = history_of(&["B"], &ABC);
        assert_eq!(fairness_score(&names(&ABC), &history), 98);
    }

    #[test]
    fn test_even_distribution_is_100() {
        let history = history_of(&["A", "B", "C", "C", "B", "A"], &ABC);
        assert_eq!(fairness_score(&names(&ABC), &history), 100);
    }

    #[test]
    fn test_score_floors_at_zero() {
        let winners = vec!["A"; 30];
        let history = history_of(&winners, &ABC);
        // counts {30, 0, 0}: variance 200
        assert_eq!(fairness_score(&names(&ABC), &history), 0);
    }

    #[test]
    fn test_monotonic_in_variance() {
        let participants = names(&ABC);
        let cases = [
            history_of(&["A", "B", "C"], &ABC),
            history_of(&["A", "A", "B"], &ABC),
            history_of(&["A", "A", "A"], &ABC),
            history_of(&["A", "A", "A", "A", "A", "B"], &ABC),
        ];
        let mut previous: Option<(f64, u8)> = None;
        for history in &cases {
            let v = variance(&win_counts(&participants, history));
            let score = fairness_score(&participants, history);
            if let Some((pv, ps)) = previous {
                assert!(v > pv);
                assert!(score <= ps, "v={} score={} prev={}", v, score, ps);
            }
            previous = Some((v, score));
        }
    }

    #[test]
    fn test_former_winners_do_not_count() {
        let history = history_of(&["Zoé", "Zoé"], &["A", "B", "Zoé"]);
        assert_eq!(win_counts(&names(&["A", "B"]), &history), vec![0, 0]);
        assert_eq!(fairness_score(&names(&["A", "B"]), &history), 100);
    }

    #[test]
    fn test_fairness_for_draws_uses_snapshots() {
        assert_eq!(fairness_for_draws(&[]), 100.0);
        // distinct {A, B, C}, counts {2, 0, 0}: variance 8/9
        let draws = history_of(&["A", "A"], &ABC);
        let expected = 100.0 - 80.0 / 9.0;
        assert!((fairness_for_draws(&draws) - expected).abs() < 1e-9);

        let no_snapshots = vec![make_test_record(1, "A", Strategy::Uniform, &[])];
        assert_eq!(fairness_for_draws(&no_snapshots), 100.0);
    }

    #[test]
    fn test_strategy_usage_order() {
        let mut history = history_of(&["A", "B", "C", "A"], &ABC);
        history[0].strategy = Strategy::Weighted;
        history[2].strategy = Strategy::Weighted;
        history[3].strategy = Strategy::Secure;
        assert_eq!(
            strategy_usage(&history),
            vec![(Strategy::Weighted, 2), (Strategy::Uniform, 1), (Strategy::Secure, 1)]
        );
    }

    #[test]
    fn test_draws_per_day() {
        let mut history = history_of(&["A", "B", "C"], &ABC);
        // ids 3, 2, 1 secondes après l'époque : tous le 1970-01-01
        history[0].timestamp += chrono::Duration::days(2);
        let per_day = draws_per_day(&history);
        assert_eq!(per_day.len(), 2);
        assert_eq!(per_day[0].0, NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());
        assert_eq!(per_day[0].1, 2);
        assert_eq!(per_day[1].1, 1);
    }
}
