//! Seeded data generation and reference results.

use std::collections::BTreeMap;

/// Generates `count` `(key, value)` pairs with keys in `0..num_keys` and values
/// in `-1000..1000`.
pub fn random_pairs(seed: u64, count: usize, num_keys: i64) -> Vec<(i64, i64)> {
    assert!(num_keys > 0);
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..count)
        .map(|_| (rng.i64(0..num_keys), rng.i64(-1000..1000)))
        .collect()
}

/// Generates `count` `(word, 1)` pairs drawn from a vocabulary of `vocabulary`
/// words with a skewed distribution: low-numbered words are far more frequent.
pub fn random_words(seed: u64, count: usize, vocabulary: usize) -> Vec<(String, u64)> {
    assert_ne!(vocabulary, 0);
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..count)
        .map(|_| {
            let a = rng.usize(0..vocabulary);
            let b = rng.usize(0..vocabulary);
            (format!("w{}", a.min(b)), 1)
        })
        .collect()
}

/// Reference result of a keyed reduction: values of each key folded left to
/// right in input order, keys ascending.
pub fn fold_by_key<K, V, F>(pairs: impl IntoIterator<Item = (K, V)>, f: F) -> Vec<(K, V)>
where
    K: Ord,
    F: Fn(V, V) -> V,
{
    let mut folded = BTreeMap::<K, V>::new();
    for (key, value) in pairs {
        match folded.remove(&key) {
            Some(acc) => folded.insert(key, f(acc, value)),
            None => folded.insert(key, value),
        };
    }
    folded.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_pairs_deterministic() {
        assert_eq!(random_pairs(3, 100, 10), random_pairs(3, 100, 10));
        assert!(random_pairs(3, 100, 10).iter().all(|&(k, _)| (0..10).contains(&k)));
    }

    #[test]
    fn test_fold_by_key() {
        let folded = fold_by_key(vec![(2, 1), (1, 3), (2, 5), (1, 1)], |a, b| a * 10 + b);
        assert_eq!(folded, vec![(1, 31), (2, 15)]);
    }

    #[test]
    fn test_random_words_skewed() {
        let counts = fold_by_key(random_words(1, 5000, 50), |a, b| a + b);
        let first = counts.iter().find(|(w, _)| w == "w0").unwrap().1;
        let last = counts.iter().find(|(w, _)| w == "w49").map_or(0, |(_, n)| *n);
        assert!(first > last);
    }
}
