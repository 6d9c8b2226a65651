use chrono::NaiveDate;

use super::{count_in_window, latest_publication_date};
use crate::models::FilteredCase;
use crate::report::{Cell, Table};

const WEEK_DAYS: i64 = 7;

/// Cases in the last seven days against the seven days before
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trend {
    pub last_7_days: usize,
    pub previous_7_days: usize,
}

impl Trend {
    pub fn change(&self) -> String {
        format_change(self.last_7_days, self.previous_7_days)
    }
}

/// Trend anchored at the latest publication date in the input
pub fn current(cases: &[FilteredCase]) -> Trend {
    match latest_publication_date(cases) {
        Some(anchor) => current_at(cases, anchor),
        None => Trend {
            last_7_days: 0,
            previous_7_days: 0,
        },
    }
}

/// Counts in `(anchor - 7d, anchor]` and `(anchor - 14d, anchor - 7d]`
pub fn current_at(cases: &[FilteredCase], anchor: NaiveDate) -> Trend {
    Trend {
        last_7_days: count_in_window(cases, anchor, WEEK_DAYS),
        previous_7_days: count_in_window(
            cases,
            anchor - chrono::Duration::days(WEEK_DAYS),
            WEEK_DAYS,
        ),
    }
}

/// Signed percent change, `+∞%` when there is nothing to compare against
pub fn format_change(current: usize, previous: usize) -> String {
    if previous == 0 {
        return "+∞%".to_string();
    }

    let pct = ((current as f64 - previous as f64) / previous as f64 * 100.0).round() as i64;
    let sign = if pct >= 0 { "+" } else { "" };
    format!("{}{}%", sign, pct)
}

/// One row per labelled trend
pub fn trend_table(rows: &[(String, Trend)]) -> Table {
    let mut table = Table::new(
        "Art",
        vec![
            "Letzte 7 Tage".to_string(),
            "Vorherige 7 Tage".to_string(),
            "Veränderung".to_string(),
        ],
    );
    for (label, trend) in rows {
        table.push_row(
            label.clone(),
            vec![
                Cell::from(trend.last_7_days),
                Cell::from(trend.previous_7_days),
                Cell::from(trend.change()),
            ],
        );
    }
    table
}
