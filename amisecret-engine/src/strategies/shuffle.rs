use crate::random::RandomSource;

/// Mélange de Fisher-Yates : à l'étape i (depuis la fin), échange i avec un
/// indice uniforme dans `[0, i]`.
pub fn fisher_yates<T>(items: &mut [T], rng: &mut dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = rng.below(i + 1);
        items.swap(i, j);
    }
}

/// Mélange une copie des indices et retourne le premier.
pub fn pick(participants: &[String], rng: &mut dyn RandomSource) -> usize {
    let mut order: Vec<usize> = (0..participants.len()).collect();
    fisher_yates(&mut order, rng);
    order[0]
}
