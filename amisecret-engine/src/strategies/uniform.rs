use crate::random::RandomSource;

/// Un indice uniforme dans `[0, n)`, sans regarder l'historique.
pub fn pick(participants: &[String], rng: &mut dyn RandomSource) -> usize {
    rng.below(participants.len())
}

#[cfg(test)]
pub(crate) fn chi_square(counts: &[u32]) -> f64 {
    let total: u32 = counts.iter().sum();
    let expected = total as f64 / counts.len() as f64;
    counts
        .iter()
        .map(|&c| {
            let d = c as f64 - expected;
            d * d / expected
        })
        .sum()
}
