use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

use amisecret_db::db::StateStore;
use amisecret_db::error::CoreError;
use amisecret_db::models::{AppState, DrawRecord, Strategy};

use crate::fairness::{fairness_score, strategy_usage};
use crate::insights::{insights, Insights};
use crate::orchestrator;
use crate::random::Entropy;

/// Changement d'état notifié aux observateurs (affichage, suivi d'événements).
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ParticipantAdded(String),
    ParticipantRemoved(String),
    StrategyChanged(Strategy),
    WinnerDrawn(DrawRecord),
    HistoryCleared { removed: usize },
}

pub trait SessionObserver {
    fn notify(&mut self, event: &SessionEvent);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyUsage {
    pub strategy: Strategy,
    pub uses: usize,
}

/// Instantané consommé par l'export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub participants: Vec<String>,
    pub history: Vec<DrawRecord>,
    pub fairness_score: u8,
    pub strategy_usage: Vec<StrategyUsage>,
    pub last_strategy: Option<Strategy>,
    pub preferred_strategy: Strategy,
}

/// Une session : état en mémoire, sauvegarde au mieux après chaque mutation.
/// Les opérations prennent `&mut self`, donc un seul tirage à la fois.
pub struct Session {
    state: AppState,
    store: Box<dyn StateStore>,
    entropy: Entropy,
    observers: Vec<Box<dyn SessionObserver>>,
    persistence_issue: Option<CoreError>,
}

impl Session {
    /// Charge l'état depuis `store`. En cas d'échec, on repart d'un état vide
    /// et l'incident reste disponible via `take_persistence_issue`.
    pub fn open(store: Box<dyn StateStore>, entropy: Entropy) -> Self {
        let (state, persistence_issue) = match store.load() {
            Ok(Some(state)) => {
                info!(
                    participants = state.participants.len(),
                    draws = state.history.len(),
                    "état chargé"
                );
                (state, None)
            }
            Ok(None) => (AppState::default(), None),
            Err(e) => {
                warn!(error = %format!("{:#}", e), "chargement impossible, démarrage avec un état vide");
                (
                    AppState::default(),
                    Some(CoreError::PersistenceUnavailable {
                        reason: format!("{:#}", e),
                    }),
                )
            }
        };

        Self {
            state,
            store,
            entropy,
            observers: Vec::new(),
            persistence_issue,
        }
    }

    pub fn observe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &dyn StateStore {
        self.store.as_ref()
    }

    pub fn participants(&self) -> &[String] {
        self.state.participants.names()
    }

    pub fn history(&self) -> &[DrawRecord] {
        self.state.history.records()
    }

    pub fn strategy(&self) -> Strategy {
        self.state.strategy
    }

    pub fn add_participant(&mut self, raw: &str) -> Result<String, CoreError> {
        let name = self.state.participants.add(raw)?;
        info!(name = %name, total = self.state.participants.len(), "participant ajouté");
        self.persist();
        self.emit(SessionEvent::ParticipantAdded(name.clone()));
        Ok(name)
    }

    /// `false` si le nom n'était pas présent ; rien n'est alors sauvegardé.
    pub fn remove_participant(&mut self, raw: &str) -> bool {
        if !self.state.participants.remove(raw) {
            return false;
        }
        let name = raw.trim().to_string();
        info!(name = %name, total = self.state.participants.len(), "participant retiré");
        self.persist();
        self.emit(SessionEvent::ParticipantRemoved(name));
        true
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.state.strategy = strategy;
        info!(strategy = %strategy, "stratégie sélectionnée");
        self.persist();
        self.emit(SessionEvent::StrategyChanged(strategy));
    }

    /// Tire avec `strategy`, ou avec la stratégie préférée si `None`.
    pub fn draw(&mut self, strategy: Option<Strategy>) -> Result<DrawRecord, CoreError> {
        self.draw_at(strategy, Utc::now())
    }

    pub fn draw_at(
        &mut self,
        strategy: Option<Strategy>,
        now: DateTime<Utc>,
    ) -> Result<DrawRecord, CoreError> {
        let strategy = strategy.unwrap_or(self.state.strategy);
        let record = orchestrator::draw(&mut self.state, strategy, &mut self.entropy, now)?;
        self.persist();
        self.emit(SessionEvent::WinnerDrawn(record.clone()));
        Ok(record)
    }

    /// Vide l'historique et retourne le nombre de tirages supprimés.
    pub fn clear_history(&mut self) -> usize {
        let removed = self.state.history.len();
        self.state.history.clear();
        info!(removed, "historique effacé");
        self.persist();
        self.emit(SessionEvent::HistoryCleared { removed });
        removed
    }

    pub fn fairness(&self) -> u8 {
        fairness_score(self.participants(), self.history())
    }

    pub fn insights(&self) -> Option<Insights> {
        insights(self.history())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            participants: self.participants().to_vec(),
            history: self.history().to_vec(),
            fairness_score: self.fairness(),
            strategy_usage: strategy_usage(self.history())
                .into_iter()
                .map(|(strategy, uses)| StrategyUsage { strategy, uses })
                .collect(),
            last_strategy: self.state.history.latest().map(|d| d.strategy),
            preferred_strategy: self.state.strategy,
        }
    }

    /// Dernier échec de stockage non encore signalé à l'utilisateur.
    pub fn take_persistence_issue(&mut self) -> Option<CoreError> {
        self.persistence_issue.take()
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.state) {
            error!(error = %format!("{:#}", e), "sauvegarde impossible, les données restent en mémoire");
            self.persistence_issue = Some(CoreError::PersistenceUnavailable {
                reason: format!("{:#}", e),
            });
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        for observer in &mut self.observers {
            observer.notify(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amisecret_db::db::{migrate, open_db, MemoryStore};
    use chrono::Duration;
    use amisecret_db::models::{ParticipantSet, HISTORY_CAP};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct BrokenStore;

    impl StateStore for BrokenStore {
        fn load(&self) -> anyhow::Result<Option<AppState>> {
            anyhow::bail!("disque illisible")
        }

        fn save(&self, _state: &AppState) -> anyhow::Result<()> {
            anyhow::bail!("disque plein")
        }
    }

    struct Recorder(Rc<RefCell<Vec<SessionEvent>>>);

    impl SessionObserver for Recorder {
        fn notify(&mut self, event: &SessionEvent) {
            self.0.borrow_mut().push(event.clone());
        }
    }

    fn session() -> Session {
        Session::open(Box::new(MemoryStore::new()), Entropy::seeded(11))
    }

    #[test]
    fn test_open_empty_store() {
        let mut s = session();
        assert!(s.participants().is_empty());
        assert!(s.history().is_empty());
        assert_eq!(s.strategy(), Strategy::Uniform);
        assert!(s.take_persistence_issue().is_none());
    }

    #[test]
    fn test_open_restores_saved_state() {
        let state = AppState {
            participants: ParticipantSet::from_names(["Ana", "Bruno"]).unwrap(),
            strategy: Strategy::Weighted,
            ..AppState::default()
        };
        let s = Session::open(Box::new(MemoryStore::with_state(state.clone())), Entropy::seeded(1));
        assert_eq!(s.state(), &state);
    }

    #[test]
    fn test_mutations_are_persisted() {
        let mut s = session();
        s.add_participant(" Ana ").unwrap();
        s.add_participant("Bruno").unwrap();
        s.set_strategy(Strategy::Shuffle);
        let record = s.draw(None).unwrap();
        assert_eq!(record.strategy, Strategy::Shuffle);

        let saved = s.store().load().unwrap().unwrap();
        assert_eq!(saved.participants.names(), &["Ana", "Bruno"]);
        assert_eq!(saved.strategy, Strategy::Shuffle);
        assert_eq!(saved.history.len(), 1);
    }

    #[test]
    fn test_rejected_add_changes_nothing() {
        let mut s = session();
        s.add_participant("  Ana  ").unwrap();
        let err = s.add_participant("Ana").unwrap_err();
        assert_eq!(err, CoreError::DuplicateParticipant { name: "Ana".to_string() });
        let err = s.add_participant("   ").unwrap_err();
        assert!(matches!(err, CoreError::InvalidParticipantName { .. }));
        assert_eq!(s.participants(), &["Ana"]);
    }

    #[test]
    fn test_draw_failure_leaves_history_untouched() {
        let mut s = session();
        s.add_participant("Ana").unwrap();
        let err = s.draw(Some(Strategy::Weighted)).unwrap_err();
        assert_eq!(err, CoreError::InsufficientParticipants { count: 1 });
        assert!(s.history().is_empty());
    }

    #[test]
    fn test_explicit_strategy_does_not_change_preference() {
        let mut s = session();
        s.add_participant("Ana").unwrap();
        s.add_participant("Bruno").unwrap();
        let record = s.draw(Some(Strategy::Weighted)).unwrap();
        assert_eq!(record.strategy, Strategy::Weighted);
        assert_eq!(s.strategy(), Strategy::Uniform);
    }

    #[test]
    fn test_many_draws_keep_cap() {
        let mut s = session();
        for name in ["A", "B", "C"] {
            s.add_participant(name).unwrap();
        }
        for _ in 0..150 {
            s.draw(None).unwrap();
        }
        assert_eq!(s.history().len(), HISTORY_CAP);
        let ids: Vec<u64> = s.history().iter().map(|r| r.id).collect();
        assert!(ids.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_clear_history() {
        let mut s = session();
        s.add_participant("A").unwrap();
        s.add_participant("B").unwrap();
        s.draw(None).unwrap();
        s.draw(None).unwrap();
        assert_eq!(s.clear_history(), 2);
        assert!(s.history().is_empty());
        assert_eq!(s.fairness(), 100);
        assert_eq!(s.participants().len(), 2);
    }

    fn sqlite_session(path: &std::path::Path) -> Session {
        let conn = open_db(path).unwrap();
        migrate(&conn).unwrap();
        Session::open(Box::new(conn), Entropy::seeded(5))
    }

    #[test]
    fn test_ids_stay_unique_after_reload_with_clock_skew() {
        let mut path = std::env::temp_dir();
        path.push(format!("amisecret-session-{}-skew.db", std::process::id()));
        std::fs::remove_file(&path).ok();

        let t = Utc::now();
        let mut s = sqlite_session(&path);
        s.add_participant("Ana").unwrap();
        s.add_participant("Bruno").unwrap();
        let d1 = s.draw_at(None, t).unwrap();
        let d2 = s.draw_at(None, t - Duration::seconds(10)).unwrap();
        assert!(d2.id > d1.id);
        assert!(s.take_persistence_issue().is_none());
        drop(s);

        let mut s = sqlite_session(&path);
        assert_eq!(s.history()[0].id, d2.id);
        let d3 = s.draw_at(None, t - Duration::seconds(5)).unwrap();
        assert!(d3.id > d2.id);
        assert!(s.take_persistence_issue().is_none());
        drop(s);

        let s = sqlite_session(&path);
        let ids: Vec<u64> = s.history().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![d3.id, d2.id, d1.id]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_broken_store_falls_back_and_reports() {
        let mut s = Session::open(Box::new(BrokenStore), Entropy::seeded(2));
        assert!(matches!(
            s.take_persistence_issue(),
            Some(CoreError::PersistenceUnavailable { .. })
        ));
        assert!(s.take_persistence_issue().is_none());

        s.add_participant("Ana").unwrap();
        assert_eq!(s.participants(), &["Ana"]);
        match s.take_persistence_issue() {
            Some(CoreError::PersistenceUnavailable { reason }) => assert!(reason.contains("disque plein")),
            other => panic!("attendu PersistenceUnavailable, obtenu {:?}", other),
        }
    }

    #[test]
    fn test_observers_receive_events() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut s = session();
        s.observe(Box::new(Recorder(events.clone())));

        s.add_participant("A").unwrap();
        s.add_participant("B").unwrap();
        assert!(!s.remove_participant("Zoé"));
        s.add_participant("C").unwrap();
        assert!(s.remove_participant("C"));
        s.set_strategy(Strategy::Secure);
        let record = s.draw(None).unwrap();
        s.clear_history();

        let events = events.borrow();
        assert_eq!(
            *events,
            vec![
                SessionEvent::ParticipantAdded("A".to_string()),
                SessionEvent::ParticipantAdded("B".to_string()),
                SessionEvent::ParticipantAdded("C".to_string()),
                SessionEvent::ParticipantRemoved("C".to_string()),
                SessionEvent::StrategyChanged(Strategy::Secure),
                SessionEvent::WinnerDrawn(record),
                SessionEvent::HistoryCleared { removed: 1 },
            ]
        );
    }

    #[test]
    fn test_snapshot() {
        let mut s = session();
        s.add_participant("A").unwrap();
        s.add_participant("B").unwrap();
        s.draw(Some(Strategy::Weighted)).unwrap();
        s.draw(Some(Strategy::Uniform)).unwrap();
        s.draw(Some(Strategy::Weighted)).unwrap();

        let snap = s.snapshot();
        assert_eq!(snap.participants, vec!["A", "B"]);
        assert_eq!(snap.history.len(), 3);
        assert_eq!(snap.last_strategy, Some(Strategy::Weighted));
        assert_eq!(
            snap.strategy_usage,
            vec![
                StrategyUsage { strategy: Strategy::Weighted, uses: 2 },
                StrategyUsage { strategy: Strategy::Uniform, uses: 1 },
            ]
        );
        assert_eq!(snap.fairness_score, s.fairness());

        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["history"].as_array().unwrap().len(), 3);
        assert_eq!(json["preferred_strategy"], "uniform");
    }
}
