//! Even subsampling of long date lists.

/// Keep at most `cap` evenly spaced items, always including the first and
/// last.
///
/// Picks indices `round(i * (len - 1) / (cap - 1))` for `i in 0..cap`, with
/// halves rounded up and duplicates collapsed, so the result may be shorter
/// than `cap` but never longer. Lists no longer than `cap` are returned
/// unchanged.
///
/// A `cap` below 2 is treated as 2, since both endpoints must survive; for
/// `cap` 0 or 1 the result can therefore hold two items. The loader rejects
/// such caps before calling this.
pub fn subsample<T: Clone>(items: &[T], cap: usize) -> Vec<T> {
    let len = items.len();
    let cap = cap.max(2);
    if len <= cap {
        return items.to_vec();
    }

    let span = len - 1;
    let steps = cap - 1;
    let mut picked: Vec<usize> = Vec::with_capacity(cap);
    for i in 0..cap {
        let index = (2 * i * span + steps) / (2 * steps);
        if picked.last() != Some(&index) {
            picked.push(index);
        }
    }

    picked.into_iter().map(|i| items[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use climate_common::date_range;
    use proptest::prelude::*;

    #[test]
    fn test_short_lists_are_unchanged() {
        assert_eq!(subsample(&[1, 2, 3], 3), vec![1, 2, 3]);
        assert_eq!(subsample(&[1, 2, 3], 600), vec![1, 2, 3]);
        assert!(subsample::<i32>(&[], 5).is_empty());
    }

    #[test]
    fn test_even_spacing() {
        let items: Vec<usize> = (0..11).collect();
        assert_eq!(subsample(&items, 3), vec![0, 5, 10]);
        assert_eq!(subsample(&items, 6), vec![0, 2, 4, 6, 8, 10]);
    }

    #[test]
    fn test_cap_below_two_keeps_endpoints() {
        let items: Vec<usize> = (0..10).collect();
        assert_eq!(subsample(&items, 1), vec![0, 9]);
        assert_eq!(subsample(&items, 0), vec![0, 9]);
    }

    #[test]
    fn test_thirty_day_steps_with_cap_two() {
        let start = NaiveDate::from_ymd_opt(1999, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(1999, 3, 1).unwrap();
        let dates = date_range(start, end, 30).unwrap();
        assert_eq!(dates.len(), 3);

        assert_eq!(subsample(&dates, 2), vec![start, end]);
    }

    proptest! {
        #[test]
        fn prop_bounds(len in 0usize..2000, cap in 2usize..700) {
            let items: Vec<usize> = (0..len).collect();
            let out = subsample(&items, cap);

            prop_assert!(out.len() <= cap.max(len.min(cap)));
            prop_assert!(out.len() <= len);
            prop_assert!(out.windows(2).all(|w| w[0] < w[1]));
            if len > 0 {
                prop_assert_eq!(out.first(), Some(&0));
                prop_assert_eq!(out.last(), Some(&(len - 1)));
            }
        }

        #[test]
        fn prop_dense_cap_keeps_everything(len in 0usize..300, extra in 0usize..50) {
            let items: Vec<usize> = (0..len).collect();
            prop_assert_eq!(subsample(&items, len + extra), items);
        }
    }
}
