//! Rounding and number formatting shared by every report surface.
//!
//! Chart projection, report tables, and both export encodings go through
//! these functions, so a number rounds the same way wherever it is shown.

/// Round to the nearest integer, halves rounding up.
///
/// Non-finite input rounds to `0`.
pub fn round_half_up(x: f64) -> i64 {
    if !x.is_finite() {
        return 0;
    }
    (x + 0.5).floor() as i64
}

/// Round to one decimal place, halves rounding up: `floor(10x + 0.5) / 10`.
pub fn round_one_decimal(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    ((10.0 * x) + 0.5).floor() / 10.0
}

/// `part / whole` as a rounded percentage in `[0, 100]`.
///
/// An empty population yields `0`.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    clamp_percent(100.0 * part as f64 / whole as f64)
}

/// Round a percentage-valued float and clamp it into `[0, 100]`.
pub fn clamp_percent(x: f64) -> u32 {
    round_half_up(x).clamp(0, 100) as u32
}

/// Rounded arithmetic mean, or `None` for an empty sample.
pub fn mean_rounded<I>(values: I) -> Option<u32>
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    if count == 0 {
        None
    } else {
        Some(clamp_percent(sum / count as f64))
    }
}

/// Percentage text as shown on screen: `80%`.
pub fn format_percent(value: u32) -> String {
    format!("{value}%")
}

/// One-decimal text: `4.4`, `0.0`.
pub fn format_rating(value: f64) -> String {
    format!("{:.1}", round_one_decimal(value))
}

/// Split a whole into integer percentages that always sum to 100.
///
/// Each part is rounded independently; the residual is then applied to the
/// largest part (the first one on ties). If the largest part cannot absorb a
/// negative residual, the remainder moves on to the next largest. An all-zero
/// input yields all zeros.
pub fn pie_percentages(counts: &[f64]) -> Vec<u32> {
    let total: f64 = counts.iter().filter(|c| c.is_finite() && **c > 0.0).sum();
    if total <= 0.0 {
        return vec![0; counts.len()];
    }

    let mut parts: Vec<i64> = counts
        .iter()
        .map(|&c| {
            if c.is_finite() && c > 0.0 {
                round_half_up(100.0 * c / total)
            } else {
                0
            }
        })
        .collect();

    let mut residual = 100 - parts.iter().sum::<i64>();
    if residual != 0 {
        let mut order: Vec<usize> = (0..parts.len()).collect();
        // Stable sort keeps the first index ahead on ties.
        order.sort_by(|&a, &b| parts[b].cmp(&parts[a]));
        for idx in order {
            if residual == 0 {
                break;
            }
            let adjusted = (parts[idx] + residual).max(0);
            residual -= adjusted - parts[idx];
            parts[idx] = adjusted;
        }
    }

    parts.into_iter().map(|p| p as u32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_rounds_up() {
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.49), 2);
        assert_eq!(round_half_up(0.0), 0);
        assert_eq!(round_half_up(f64::NAN), 0);
    }

    #[test]
    fn one_decimal() {
        assert_eq!(round_one_decimal(4.4), 4.4);
        assert_eq!(round_one_decimal(4.25), 4.3);
        assert_eq!(round_one_decimal(22.0 / 5.0), 4.4);
    }

    #[test]
    fn percent_of_empty_population_is_zero() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(2, 4), 50);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(5, 5), 100);
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean_rounded(std::iter::empty()), None);
        assert_eq!(mean_rounded([80.0, 61.0]), Some(71));
        assert_eq!(mean_rounded([70.5]), Some(71));
    }

    #[test]
    fn formatting() {
        assert_eq!(format_percent(80), "80%");
        assert_eq!(format_rating(4.4), "4.4");
        assert_eq!(format_rating(0.0), "0.0");
    }

    #[test]
    fn pie_thirds_sum_to_hundred() {
        // 33.33 x3 rounds to 99; the first largest absorbs the residual.
        assert_eq!(pie_percentages(&[1.0, 1.0, 1.0]), vec![34, 33, 33]);
    }

    #[test]
    fn pie_over_rounding_subtracts_from_largest() {
        // 50.5 / 24.75 / 24.75 rounds to 51 + 25 + 25 = 101.
        let parts = pie_percentages(&[202.0, 99.0, 99.0]);
        assert_eq!(parts, vec![50, 25, 25]);
    }

    #[test]
    fn pie_exact_split_is_untouched() {
        assert_eq!(pie_percentages(&[54.0, 28.0, 18.0]), vec![54, 28, 18]);
        assert_eq!(pie_percentages(&[1.0, 0.0]), vec![100, 0]);
    }

    #[test]
    fn pie_of_nothing_is_all_zero() {
        assert_eq!(pie_percentages(&[0.0, 0.0]), vec![0, 0]);
        assert!(pie_percentages(&[]).is_empty());
    }
}
