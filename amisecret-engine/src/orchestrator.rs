use chrono::{DateTime, Utc};
use tracing::info;

use amisecret_db::error::CoreError;
use amisecret_db::models::{AppState, DrawRecord, HistoryLog, Strategy};

use crate::random::Entropy;
use crate::strategies::select;

/// Identifiant strictement croissant : l'horodatage en millisecondes, ou le
/// plus grand identifiant connu + 1 si l'horloge n'a pas avancé.
pub fn next_draw_id(history: &HistoryLog, now: DateTime<Utc>) -> u64 {
    let millis = now.timestamp_millis().max(0) as u64;
    match history.records().iter().map(|d| d.id).max() {
        Some(max_id) => millis.max(max_id + 1),
        None => millis,
    }
}

/// Un tirage complet : vérifie les préconditions, sélectionne, enregistre.
/// L'historique n'est modifié qu'en cas de succès, et une seule fois.
pub fn draw(
    state: &mut AppState,
    strategy: Strategy,
    entropy: &mut Entropy,
    now: DateTime<Utc>,
) -> Result<DrawRecord, CoreError> {
    let count = state.participants.len();
    if count < 2 {
        return Err(CoreError::InsufficientParticipants { count });
    }

    let selection = select(
        state.participants.names(),
        state.history.records(),
        strategy,
        entropy,
    )?;

    let record = DrawRecord {
        id: next_draw_id(&state.history, now),
        winner: selection.winner,
        strategy,
        timestamp: now,
        participant_count: count,
        participants: state.participants.names().to_vec(),
    };

    state.history.record(record.clone());
    info!(id = record.id, winner = %record.winner, strategy = %strategy, "tirage enregistré");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fairness::fairness_score;
    use crate::random::ScriptedSource;
    use amisecret_db::models::{make_test_record, ParticipantSet, HISTORY_CAP};
    use chrono::Duration;

    fn state_with(names: &[&str]) -> AppState {
        AppState {
            participants: ParticipantSet::from_names(names).unwrap(),
            ..AppState::default()
        }
    }

    #[test]
    fn test_draw_requires_two_participants() {
        let mut state = state_with(&["Ana"]);
        let mut entropy = Entropy::seeded(1);
        let err = draw(&mut state, Strategy::Uniform, &mut entropy, Utc::now()).unwrap_err();
        assert_eq!(err, CoreError::InsufficientParticipants { count: 1 });
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_draw_scenario_three_participants() {
        let mut state = state_with(&["A", "B", "C"]);
        let mut entropy = Entropy::seeded(5);
        let now = Utc::now();

        let record = draw(&mut state, Strategy::Uniform, &mut entropy, now).unwrap();
        assert!(["A", "B", "C"].contains(&record.winner.as_str()));
        assert_eq!(state.history.len(), 1);
        assert_eq!(state.history.latest(), Some(&record));
        assert_eq!(record.participant_count, 3);
        assert_eq!(record.participants, vec!["A", "B", "C"]);
        assert_eq!(record.timestamp, now);
        assert_eq!(record.strategy, Strategy::Uniform);

        // counts {1, 0, 0}
        assert_eq!(fairness_score(state.participants.names(), state.history.records()), 98);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut state = state_with(&["A", "B"]);
        let mut entropy = Entropy::seeded(5);
        draw(&mut state, Strategy::Shuffle, &mut entropy, Utc::now()).unwrap();
        state.participants.add("C").unwrap();
        assert_eq!(state.history.latest().unwrap().participants, vec!["A", "B"]);
    }

    #[test]
    fn test_history_capped_after_150_draws() {
        let mut state = state_with(&["A", "B", "C"]);
        let mut entropy = Entropy::seeded(9);
        let start = Utc::now();
        let mut ids = Vec::new();
        for i in 0..150 {
            let rec = draw(&mut state, Strategy::Weighted, &mut entropy, start + Duration::seconds(i)).unwrap();
            ids.push(rec.id);
        }
        assert_eq!(state.history.len(), HISTORY_CAP);
        let kept: Vec<u64> = state.history.records().iter().map(|r| r.id).collect();
        let expected: Vec<u64> = ids[50..].iter().rev().copied().collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn test_ids_are_monotonic_with_frozen_clock() {
        let mut state = state_with(&["A", "B"]);
        let mut entropy = Entropy::with_sources(Box::new(ScriptedSource::new(vec![0.3, 0.8])), None);
        let now = Utc::now();
        let first = draw(&mut state, Strategy::Uniform, &mut entropy, now).unwrap();
        let second = draw(&mut state, Strategy::Uniform, &mut entropy, now).unwrap();
        assert_eq!(second.id, first.id + 1);
        assert_eq!(first.winner, "A");
        assert_eq!(second.winner, "B");
    }

    #[test]
    fn test_next_id_uses_largest_known_id() {
        let mut history = HistoryLog::new();
        history.record(make_test_record(900, "A", Strategy::Uniform, &["A", "B"]));
        history.record(make_test_record(500, "B", Strategy::Uniform, &["A", "B"]));
        let past = DateTime::<Utc>::from_timestamp_millis(100).unwrap();
        assert_eq!(next_draw_id(&history, past), 901);
    }

    #[test]
    fn test_secure_request_is_recorded_even_when_downgraded() {
        let mut state = state_with(&["A", "B"]);
        let mut entropy = Entropy::seeded(3);
        let record = draw(&mut state, Strategy::Secure, &mut entropy, Utc::now()).unwrap();
        assert_eq!(record.strategy, Strategy::Secure);
    }
}
