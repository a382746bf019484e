pub mod secure;
pub mod shuffle;
pub mod uniform;
pub mod weighted;

use tracing::debug;

use amisecret_db::error::CoreError;
use amisecret_db::models::{DrawRecord, Strategy};

use crate::random::Entropy;

/// Résultat d'une sélection. `applied` diffère de la stratégie demandée
/// quand `secure` a dû se rabattre sur `uniform`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub index: usize,
    pub winner: String,
    pub applied: Strategy,
}

/// Choisit exactement un gagnant parmi `participants` (≥ 2, sans doublon).
/// N'écrit rien : l'historique n'est lu que par la stratégie pondérée.
pub fn select(
    participants: &[String],
    history: &[DrawRecord],
    strategy: Strategy,
    entropy: &mut Entropy,
) -> Result<Selection, CoreError> {
    if participants.len() < 2 {
        return Err(CoreError::InsufficientParticipants {
            count: participants.len(),
        });
    }

    let (index, applied) = match strategy {
        Strategy::Uniform => (uniform::pick(participants, entropy.general()), Strategy::Uniform),
        Strategy::Shuffle => (shuffle::pick(participants, entropy.general()), Strategy::Shuffle),
        Strategy::Weighted => (
            weighted::pick(participants, history, entropy.general()),
            Strategy::Weighted,
        ),
        Strategy::Secure => secure::pick(participants, entropy),
    };

    debug!(
        requested = %strategy,
        applied = %applied,
        index,
        candidates = participants.len(),
        "gagnant sélectionné"
    );

    Ok(Selection {
        index,
        winner: participants[index].clone(),
        applied,
    })
}

#[cfg(test)]
pub(crate) fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
