//! Levenshtein-based string similarity used by the fuzzy section matcher.

/// Edit distance over Unicode scalar values.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Single rolling row over `b`.
    let mut costs: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut diag = costs[0];
        costs[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = costs[j + 1];
            costs[j + 1] = if ca == cb {
                diag
            } else {
                1 + diag.min(above).min(costs[j])
            };
            diag = above;
        }
    }
    costs[b.len()]
}

/// `(len(longer) - distance) / len(longer)`, in `[0, 1]`; two empty strings score 1.
///
/// When both strings have the same length `a` is taken as the longer one.
pub fn similarity(a: &str, b: &str) -> f64 {
    let (a_len, b_len) = (a.chars().count(), b.chars().count());
    let (longer, shorter, longer_len) = if a_len >= b_len {
        (a, b, a_len)
    } else {
        (b, a, b_len)
    };
    if longer_len == 0 {
        return 1.0;
    }
    let distance = levenshtein(shorter, longer);
    (longer_len - distance) as f64 / longer_len as f64
}
