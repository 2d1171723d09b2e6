// =============================================================================
// Correlation Matrix & Candidate-Pair Screen
// =============================================================================
//
// Pearson correlation over the panel's close-price columns, flattened into
// ordered (x, y, corr) triples for the uncorrelated-pair screen.  Pairs with
// |corr| below the threshold are momentum candidates: products that do not
// move together.
// =============================================================================

use std::collections::HashSet;

use crate::market_data::Panel;

/// Pearson correlation coefficient of two equal-length series.
///
/// Returns NaN when the series are mismatched, shorter than two points, or
/// either side has (near-)zero variance.
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.len() < 2 {
        return f64::NAN;
    }

    let n = a.len() as f64;
    let mean_a: f64 = a.iter().sum::<f64>() / n;
    let mean_b: f64 = b.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;

    for i in 0..a.len() {
        let diff_a = a[i] - mean_a;
        let diff_b = b[i] - mean_b;
        cov += diff_a * diff_b;
        var_a += diff_a * diff_a;
        var_b += diff_b * diff_b;
    }

    if var_a < 1e-10 || var_b < 1e-10 {
        return f64::NAN;
    }

    cov / (var_a.sqrt() * var_b.sqrt())
}

/// Symmetric pairwise correlation table over panel columns.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

/// One flattened matrix entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrPair {
    pub x: String,
    pub y: String,
    pub corr: f64,
}

impl CorrelationMatrix {
    /// Compute the full pairwise correlation matrix of the panel's columns.
    pub fn from_panel(panel: &Panel) -> Self {
        let n = panel.num_columns();
        let mut values = vec![vec![f64::NAN; n]; n];

        for i in 0..n {
            for j in i..n {
                let corr = pearson(panel.column(i), panel.column(j));
                values[i][j] = corr;
                values[j][i] = corr;
            }
        }

        Self {
            labels: panel.columns.clone(),
            values,
        }
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Flatten every ordered (x, y) entry — diagonal included — and sort
    /// ascending by correlation.
    pub fn pairs_sorted(&self) -> Vec<CorrPair> {
        let n = self.len();
        let mut pairs = Vec::with_capacity(n * n);

        for i in 0..n {
            for j in 0..n {
                pairs.push(CorrPair {
                    x: self.labels[i].clone(),
                    y: self.labels[j].clone(),
                    corr: self.values[i][j],
                });
            }
        }

        pairs.sort_by(|a, b| a.corr.total_cmp(&b.corr));
        pairs
    }
}

/// Screen sorted pairs down to the uncorrelated candidates: |corr| strictly
/// below `threshold`, de-duplicated by exact correlation value (first
/// occurrence wins).
///
/// Value-based de-duplication collapses the mirror (y, x) duplicate of every
/// pair; it would also collapse genuinely distinct pairs that happen to share
/// a bit-identical correlation, which is kept for output compatibility with
/// the screen this replaces.  The diagonal (corr = 1.0) and NaN entries never
/// pass the threshold.
pub fn uncorrelated_pairs(pairs: &[CorrPair], threshold: f64) -> Vec<CorrPair> {
    let mut seen: HashSet<u64> = HashSet::new();
    let mut out = Vec::new();

    for pair in pairs {
        if pair.corr.abs() >= threshold {
            continue;
        }
        if seen.insert(pair.corr.to_bits()) {
            out.push(pair.clone());
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::{Panel, PriceSeries};
    use chrono::NaiveDate;

    fn panel_from(columns: &[(&str, Vec<f64>)]) -> Panel {
        // One extra trailing day per series: Panel::assemble drops the final row.
        let series = columns
            .iter()
            .map(|(name, vals)| {
                let mut points: Vec<(NaiveDate, f64)> = vals
                    .iter()
                    .enumerate()
                    .map(|(i, v)| {
                        (
                            NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
                                + chrono::Days::new(i as u64),
                            *v,
                        )
                    })
                    .collect();
                let last = points.last().expect("nonempty").0 + chrono::Days::new(1);
                points.push((last, 0.0));
                PriceSeries::new(*name, points)
            })
            .collect();
        Panel::assemble(series)
    }

    #[test]
    fn pearson_perfect_and_inverse() {
        let a: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..20).map(|i| 3.0 * i as f64 + 7.0).collect();
        let c: Vec<f64> = (0..20).map(|i| -(i as f64)).collect();

        assert!((pearson(&a, &b) - 1.0).abs() < 1e-12);
        assert!((pearson(&a, &c) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_degenerate_is_nan() {
        let flat = vec![5.0; 20];
        let a: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert!(pearson(&flat, &a).is_nan());
        assert!(pearson(&a[..5], &a[..4]).is_nan());
    }

    #[test]
    fn screen_reports_uncorrelated_pairs_only() {
        // A and C move together; B oscillates independently of both.
        let a: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let c: Vec<f64> = (0..30)
            .map(|i| 200.0 + 2.0 * i as f64 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        let b: Vec<f64> = (0..30)
            .map(|i| 50.0 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();

        let panel = panel_from(&[("a", a), ("b", b), ("c", c)]);
        let matrix = CorrelationMatrix::from_panel(&panel);

        assert!(matrix.get(0, 2) > 0.9, "a and c should be highly correlated");

        let candidates = uncorrelated_pairs(&matrix.pairs_sorted(), 0.25);

        // One survivor per unordered uncorrelated pair: (b,a) and (b,c).
        assert_eq!(candidates.len(), 2);
        for pair in &candidates {
            assert!(pair.x == "b" || pair.y == "b");
            assert!(pair.corr.abs() < 0.25);
        }
        assert!(
            !candidates
                .iter()
                .any(|p| (p.x == "a" && p.y == "c") || (p.x == "c" && p.y == "a")),
            "the correlated pair must not be reported"
        );
    }

    #[test]
    fn screen_excludes_diagonal() {
        let a: Vec<f64> = (0..30).map(|i| (i as f64 * 0.7).sin()).collect();
        let b: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();

        let panel = panel_from(&[("a", a), ("b", b)]);
        let matrix = CorrelationMatrix::from_panel(&panel);
        let candidates = uncorrelated_pairs(&matrix.pairs_sorted(), 0.25);

        assert!(candidates.iter().all(|p| p.x != p.y));
    }

    #[test]
    fn legacy_lower_bound_was_vacuous() {
        // The screen once also required abs(corr) > -0.25; an absolute value
        // can never fail that bound, so dropping it changes nothing.
        let a: Vec<f64> = (0..30).map(|i| (i as f64 * 0.7).sin()).collect();
        let b: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();

        let panel = panel_from(&[("a", a), ("b", b)]);
        let pairs = CorrelationMatrix::from_panel(&panel).pairs_sorted();

        for pair in pairs.iter().filter(|p| !p.corr.is_nan()) {
            assert!(pair.corr.abs() > -0.25);
        }
        let with_bound: Vec<_> = pairs
            .iter()
            .filter(|p| p.corr.abs() > -0.25 && p.corr.abs() < 0.25)
            .collect();
        let without_bound: Vec<_> = pairs.iter().filter(|p| p.corr.abs() < 0.25).collect();
        assert_eq!(with_bound.len(), without_bound.len());
    }

    #[test]
    fn dedup_collapses_bit_identical_values() {
        let pairs = vec![
            CorrPair {
                x: "a".into(),
                y: "b".into(),
                corr: 0.125,
            },
            CorrPair {
                x: "c".into(),
                y: "d".into(),
                corr: 0.125,
            },
            CorrPair {
                x: "a".into(),
                y: "c".into(),
                corr: 0.2,
            },
        ];

        let out = uncorrelated_pairs(&pairs, 0.25);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].x, "a");
        assert_eq!(out[0].y, "b");
    }
}
