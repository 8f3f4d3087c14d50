//! String similarity used by the fuzzy resolution stage.

/// Normalized similarity between two strings, in `[0, 1]`.
///
/// The resolver holds an optional matcher chosen once at construction; without
/// one, fuzzy resolution is simply skipped.
pub trait SimilarityMatcher: Send + Sync {
    fn ratio(&self, a: &str, b: &str) -> f64;
}

impl<F> SimilarityMatcher for F
where
    F: Fn(&str, &str) -> f64 + Send + Sync,
{
    fn ratio(&self, a: &str, b: &str) -> f64 {
        self(a, b)
    }
}

/// Indel similarity: `(|a| + |b| - d) / (|a| + |b|)` where `d` counts the
/// insertions and deletions turning `a` into `b`. Equals
/// `2 * lcs(a, b) / (|a| + |b|)`. Two empty strings are identical.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndelRatio;

impl SimilarityMatcher for IndelRatio {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let total = a.len() + b.len();
        if total == 0 {
            return 1.0;
        }
        (2 * longest_common_subsequence(&a, &b)) as f64 / total as f64
    }
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_and_disjoint() {
        assert_eq!(IndelRatio.ratio("aspirin", "aspirin"), 1.0);
        assert_eq!(IndelRatio.ratio("abc", "xyz"), 0.0);
        assert_eq!(IndelRatio.ratio("", ""), 1.0);
        assert_eq!(IndelRatio.ratio("abc", ""), 0.0);
    }

    #[test]
    fn test_misspelling_scores_above_default_threshold() {
        // one deletion: 2 * 6 / 13
        let score = IndelRatio.ratio("asprin", "aspirin");
        assert!((score - 12.0 / 13.0).abs() < 1e-9);
        assert!(score >= 0.85);
    }

    #[test]
    fn test_symmetric() {
        let ab = IndelRatio.ratio("ibuprofen", "ibuprophen");
        let ba = IndelRatio.ratio("ibuprophen", "ibuprofen");
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_closure_is_a_matcher() {
        let always_close = |_: &str, _: &str| 0.9;
        assert_eq!(always_close.ratio("a", "b"), 0.9);
    }
}
