use std::cmp::Ordering;

/// Safe comparison of floating point numbers, handling NaN values
pub fn safe_float_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Ascending copy of `values`
pub fn sorted_values(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| safe_float_cmp(*a, *b));
    sorted
}

/// Index of the first strictly smallest key; later equal keys never replace it
pub fn first_min_index<T>(items: &[T], key: impl Fn(&T) -> f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, item) in items.iter().enumerate() {
        let value = key(item);
        match best {
            Some((_, best_value)) if safe_float_cmp(value, best_value) != Ordering::Less => {}
            _ => best = Some((index, value)),
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_float_cmp_normal_values() {
        assert_eq!(safe_float_cmp(1.0, 2.0), Ordering::Less);
        assert_eq!(safe_float_cmp(2.0, 1.0), Ordering::Greater);
        assert_eq!(safe_float_cmp(1.0, 1.0), Ordering::Equal);
    }

    #[test]
    fn test_safe_float_cmp_nan_handling() {
        assert_eq!(safe_float_cmp(f64::NAN, 1.0), Ordering::Equal);
        assert_eq!(safe_float_cmp(1.0, f64::NAN), Ordering::Equal);
    }

    #[test]
    fn test_sorted_values() {
        assert_eq!(sorted_values(&[3.0, -1.0, 2.0]), vec![-1.0, 2.0, 3.0]);
        assert!(sorted_values(&[]).is_empty());
    }

    #[test]
    fn test_first_min_index_keeps_first_tie() {
        assert_eq!(first_min_index(&[0.5, 0.3, 0.3], |x| *x), Some(1));
        assert_eq!(first_min_index(&[0.5, 0.5], |x| *x), Some(0));
        assert_eq!(first_min_index::<f64>(&[], |x| *x), None);
    }
}
