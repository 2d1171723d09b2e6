// =============================================================================
// Price Panel — outer-joined daily close series with gap filling
// =============================================================================
//
// A Panel is built once per run from one PriceSeries per instrument:
//
//   1. Outer-join all series on calendar date.
//   2. Drop the final row (the current, possibly partial, trading day).
//   3. Drop columns that carry no data at all.
//   4. Forward-fill, then backward-fill, so no cell is left missing.
// =============================================================================

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

/// Named ordered sequence of (date, close) pairs for one instrument.
///
/// Dates are strictly increasing with no duplicates; the fetch layer builds
/// series in exchange order which already satisfies this.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub name: String,
    pub points: Vec<(NaiveDate, f64)>,
}

impl PriceSeries {
    pub fn new(name: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }
}

/// Fully-populated table keyed by date with one column per instrument.
///
/// `values` is column-major: `values[c][r]` is the close of column `c` on
/// `dates[r]`.
#[derive(Debug, Clone)]
pub struct Panel {
    pub dates: Vec<NaiveDate>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl Panel {
    /// Outer-join the given series on date, drop the final row, drop
    /// all-missing columns, then forward-fill and backward-fill gaps.
    ///
    /// Returns an empty panel when no series carries any usable data.
    pub fn assemble(series: Vec<PriceSeries>) -> Self {
        // Union of all observed dates, sorted.
        let mut date_set: BTreeSet<NaiveDate> = BTreeSet::new();
        for s in &series {
            for (date, _) in &s.points {
                date_set.insert(*date);
            }
        }

        let mut dates: Vec<NaiveDate> = date_set.into_iter().collect();

        // Drop the final (possibly partial/current) day.
        dates.pop();

        if dates.is_empty() {
            return Self {
                dates: Vec::new(),
                columns: Vec::new(),
                values: Vec::new(),
            };
        }

        let mut columns = Vec::new();
        let mut values = Vec::new();

        for s in series {
            let by_date: HashMap<NaiveDate, f64> = s.points.into_iter().collect();
            let raw: Vec<Option<f64>> = dates.iter().map(|d| by_date.get(d).copied()).collect();

            // Columns with no data at all are dropped entirely.
            if raw.iter().all(Option::is_none) {
                continue;
            }

            columns.push(s.name);
            values.push(fill_gaps(raw));
        }

        Self {
            dates,
            columns,
            values,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Close series of a column by index.
    pub fn column(&self, idx: usize) -> &[f64] {
        &self.values[idx]
    }
}

/// Forward-fill then backward-fill a column known to contain at least one
/// value.
fn fill_gaps(raw: Vec<Option<f64>>) -> Vec<f64> {
    let mut filled: Vec<Option<f64>> = Vec::with_capacity(raw.len());

    let mut last = None;
    for cell in &raw {
        if cell.is_some() {
            last = *cell;
        }
        filled.push(last);
    }

    // Leading gap: backfill from the first observed value.
    let mut next = None;
    for i in (0..filled.len()).rev() {
        if filled[i].is_some() {
            next = filled[i];
        } else {
            filled[i] = next;
        }
    }

    filled.into_iter().flatten().collect()
}
