use tracing::warn;

use amisecret_db::models::Strategy;

use crate::random::Entropy;
use crate::strategies::uniform;

/// Même loi que `uniform`, mais depuis la source cryptographique. Sans elle,
/// on se rabat sur `uniform` avec un avertissement non bloquant.
pub fn pick(participants: &[String], entropy: &mut Entropy) -> (usize, Strategy) {
    match entropy.secure() {
        Some(source) => (uniform::pick(participants, source), Strategy::Secure),
        None => {
            warn!("source d'aléa sécurisée indisponible, repli sur la stratégie uniform");
            (uniform::pick(participants, entropy.general()), Strategy::Uniform)
        }
    }
}
