use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};
use tracing::warn;

use amisecret_db::error::CoreError;

/// Capacité « source d'aléa » injectée dans le moteur de sélection.
pub trait RandomSource {
    /// Entier uniforme dans `[0, bound)`. `bound` doit être > 0.
    fn below(&mut self, bound: usize) -> usize;
    /// Réel uniforme dans `[0, 1)`.
    fn unit(&mut self) -> f64;
}

/// Générateur généraliste, reproductible si on lui donne un seed.
pub struct StdSource {
    rng: StdRng,
}

impl StdSource {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self { rng }
    }
}

impl RandomSource for StdSource {
    fn below(&mut self, bound: usize) -> usize {
        self.rng.random_range(0..bound)
    }

    fn unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// CSPRNG amorcé directement depuis l'entropie du système.
pub struct SecureSource {
    rng: StdRng,
}

impl SecureSource {
    pub fn acquire() -> Result<Self, CoreError> {
        let rng = StdRng::try_from_rng(&mut OsRng).map_err(|e| CoreError::SecureRandomUnavailable {
            reason: e.to_string(),
        })?;
        Ok(Self { rng })
    }
}

impl RandomSource for SecureSource {
    fn below(&mut self, bound: usize) -> usize {
        self.rng.random_range(0..bound)
    }

    fn unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Les deux sources dont dispose le moteur. `secure` est absent si le système
/// n'a pas pu fournir d'entropie.
pub struct Entropy {
    general: Box<dyn RandomSource>,
    secure: Option<Box<dyn RandomSource>>,
}

impl Entropy {
    /// Source généraliste (éventuellement seedée) + source sécurisée du système.
    pub fn system(seed: Option<u64>) -> Self {
        let secure: Option<Box<dyn RandomSource>> = match SecureSource::acquire() {
            Ok(source) => Some(Box::new(source)),
            Err(e) => {
                warn!(error = %e, "aucune source d'aléa sécurisée, la stratégie secure sera dégradée");
                None
            }
        };
        Self {
            general: Box::new(StdSource::new(seed)),
            secure,
        }
    }

    pub fn with_sources(
        general: Box<dyn RandomSource>,
        secure: Option<Box<dyn RandomSource>>,
    ) -> Self {
        Self { general, secure }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_sources(Box::new(StdSource::new(Some(seed))), None)
    }

    pub fn general(&mut self) -> &mut dyn RandomSource {
        self.general.as_mut()
    }

    pub fn secure(&mut self) -> Option<&mut dyn RandomSource> {
        match self.secure.as_mut() {
            Some(source) => Some(source.as_mut()),
            None => None,
        }
    }

    pub fn has_secure(&self) -> bool {
        self.secure.is_some()
    }
}

/// Source scriptée pour les tests : rejoue des valeurs fixes en boucle.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    units: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(units: Vec<f64>) -> Self {
        assert!(!units.is_empty(), "ScriptedSource sans valeurs");
        Self { units, cursor: 0 }
    }

    fn next(&mut self) -> f64 {
        let value = self.units[self.cursor % self.units.len()];
        self.cursor += 1;
        value
    }
}

impl RandomSource for ScriptedSource {
    fn below(&mut self, bound: usize) -> usize {
        debug_assert!(bound > 0, "ScriptedSource::below appelé avec une borne nulle");
        ((self.next() * bound as f64) as usize).min(bound.saturating_sub(1))
    }

    fn unit(&mut self) -> f64 {
        self.next()
    }
}
