use rand::rngs::StdRng;
use rand::SeedableRng;

/// Number of leading results never perturbed by diversification
pub const STABLE_PREFIX: usize = 3;

/// Fraction of the tail given up for variety at a diversity level
pub fn shuffle_factor(diversity_level: u8) -> f64 {
    ((diversity_level as f64 - 1.0) / 4.0).clamp(0.0, 0.9)
}

/// Trade strict relevance order for variety below the top results.
///
/// The first [`STABLE_PREFIX`] items stay in place. The rest is sampled
/// without replacement, keeping `1 - shuffle_factor` of it in random order.
/// The RNG is seeded with the level, so the same input and level always
/// produce the same output. Level 1 returns the input unchanged.
pub fn diversify<T>(ranked: Vec<T>, diversity_level: u8) -> Vec<T> {
    if diversity_level <= 1 || ranked.len() < 2 {
        return ranked;
    }

    let mut ranked = ranked;
    let tail: Vec<T> = if ranked.len() > STABLE_PREFIX {
        ranked.split_off(STABLE_PREFIX)
    } else {
        Vec::new()
    };
    if tail.is_empty() {
        return ranked;
    }

    let keep_fraction = 1.0 - shuffle_factor(diversity_level);
    let keep = ((tail.len() as f64) * keep_fraction).round_ties_even() as usize;
    let keep = keep.min(tail.len());

    let mut rng = StdRng::seed_from_u64(diversity_level as u64);
    let picks = rand::seq::index::sample(&mut rng, tail.len(), keep);

    let mut slots: Vec<Option<T>> = tail.into_iter().map(Some).collect();
    ranked.extend(picks.into_iter().filter_map(|i| slots[i].take()));
    ranked
}
