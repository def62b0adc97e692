use std::cmp::Ordering;

/// Computes the `q`-th percentile with linear interpolation between closest ranks.
///
/// Returns `None` for an empty input.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    let rank = q.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64))
}

/// Returns every non-empty subset of `items`, ordered by size and then lexicographically by
/// position.
pub fn subsets<T>(items: &[T]) -> Vec<Vec<T>>
where
    T: Copy,
{
    let mut results = vec![];
    for size in 1..=items.len() {
        let mut idxs: Vec<usize> = (0..size).collect();
        loop {
            results.push(idxs.iter().map(|&i| items[i]).collect());

            // Advances to the next combination.
            let mut i = size;
            while i > 0 && idxs[i - 1] == items.len() - size + i - 1 {
                i -= 1;
            }
            if i == 0 {
                break;
            }
            idxs[i - 1] += 1;
            for j in i..size {
                idxs[j] = idxs[j - 1] + 1;
            }
        }
    }
    results
}

/// Finds the first maximum. Later items replace the current best only when strictly greater.
pub fn first_max_by<I, T, F>(items: I, mut score: F) -> Option<(T, f64)>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> f64,
{
    let mut best: Option<(T, f64)> = None;
    for item in items {
        let s = score(&item);
        let replace = match &best {
            None => true,
            Some((_, b)) => s.partial_cmp(b) == Some(Ordering::Greater),
        };
        if replace {
            best = Some((item, s));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];

        assert_eq!(Some(5.0), percentile(&values, 100.0));
        assert_eq!(Some(1.0), percentile(&values, 0.0));
        assert_eq!(Some(3.0), percentile(&values, 50.0));
        assert!((percentile(&values, 90.0).unwrap() - 4.6).abs() < 1e-12);
        assert_eq!(None, percentile(&[], 90.0));
    }

    #[test]
    fn test_percentile_unsorted() {
        let values = [10.0, 0.0, 5.0];

        assert!((percentile(&values, 90.0).unwrap() - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_subsets() {
        let sets = subsets(&[1, 2, 3]);

        assert_eq!(
            vec![
                vec![1],
                vec![2],
                vec![3],
                vec![1, 2],
                vec![1, 3],
                vec![2, 3],
                vec![1, 2, 3],
            ],
            sets
        );
    }

    #[test]
    fn test_subsets_count() {
        assert_eq!(31, subsets(&[0, 1, 2, 3, 4]).len());
        assert!(subsets::<u8>(&[]).is_empty());
    }

    #[test]
    fn test_first_max_by_tie() {
        let best = first_max_by(vec!["a", "b", "c"], |s| if *s == "a" { 1.0 } else { 2.0 });

        assert_eq!(Some(("b", 2.0)), best);
    }
}
