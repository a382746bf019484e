use thiserror::Error;

/// Erreurs du cœur. Aucune n'est fatale : au pire la session n'est pas sauvegardée.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("au moins 2 participants sont nécessaires pour un tirage (actuellement : {count})")]
    InsufficientParticipants { count: usize },

    #[error("participant déjà présent : {name}")]
    DuplicateParticipant { name: String },

    #[error("nom de participant invalide : {reason}")]
    InvalidParticipantName { reason: String },

    #[error("stockage indisponible : {reason}")]
    PersistenceUnavailable { reason: String },

    #[error("source aléatoire sécurisée indisponible : {reason}")]
    SecureRandomUnavailable { reason: String },

    #[error("stratégie inconnue : '{0}'")]
    UnknownStrategy(String),
}
