//! Edit distance used for fuzzy token matching.

/// Levenshtein distance between `a` and `b`, counted in characters.
///
/// Runs in `O(len(a) * len(b))` time and keeps only two rows of the table,
/// sized by the shorter input. Case folding is left to the caller.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut previous: Vec<usize> = (0..=short.len()).collect();
    let mut current = vec![0; short.len() + 1];

    for (i, long_char) in long.iter().enumerate() {
        current[0] = i + 1;
        for (j, short_char) in short.iter().enumerate() {
            let substitution = previous[j] + usize::from(long_char != short_char);
            current[j + 1] = (current[j] + 1).min(previous[j + 1] + 1).min(substitution);
        }
        std::mem::swap(&mut current, &mut previous);
    }

    previous[short.len()]
}
