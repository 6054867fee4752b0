//! Edit-distance suggestions for misspelled field names.

/// Returns the option closest to `target`, provided it is within three edits.
pub fn closest_match<'a, I>(target: &str, options: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<&str> = None;
    let mut min_distance = usize::MAX;

    for option in options {
        let distance = levenshtein(target, option);
        if distance < min_distance && distance <= 3 {
            min_distance = distance;
            best = Some(option);
        }
    }

    best.map(str::to_string)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("first_name", "frist_name"), 2);
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("id", "id"), 0);
    }

    #[test]
    fn test_closest_match() {
        let fields = ["id", "first_name", "last_name", "age"];
        assert_eq!(
            closest_match("frist_name", fields),
            Some("first_name".to_string())
        );
        assert_eq!(closest_match("ag", fields), Some("age".to_string()));
        assert_eq!(closest_match("completely_unrelated", fields), None);
    }
}
