//! Levenshtein edit distance (insert, delete, substitute; no transpositions).

/// Edit distance over `char`s, compared exactly.
///
/// Single-row dynamic programming: `costs[j]` holds the previous row until it is
/// overwritten, `last_value` carries the current row's left neighbour.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let s1: Vec<char> = a.chars().collect();
    let s2: Vec<char> = b.chars().collect();

    if s1.is_empty() {
        return s2.len();
    }
    if s2.is_empty() {
        return s1.len();
    }

    let mut costs: Vec<usize> = (0..=s2.len()).collect();

    for i in 1..=s1.len() {
        let mut last_value = i;
        for j in 1..=s2.len() {
            let mut new_value = costs[j - 1];
            if s1[i - 1] != s2[j - 1] {
                new_value = new_value.min(last_value).min(costs[j]) + 1;
            }
            costs[j - 1] = last_value;
            last_value = new_value;
        }
        costs[s2.len()] = last_value;
    }

    costs[s2.len()]
}

/// Case-insensitive edit distance
pub fn levenshtein(a: &str, b: &str) -> usize {
    edit_distance(&a.to_lowercase(), &b.to_lowercase())
}
