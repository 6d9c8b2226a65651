pub mod districts;
pub mod history;
pub mod trend;

pub use districts::{district_rates, district_table, DistrictRow};
pub use history::{by_year_and_week, week_label, week_series, year_to_date, WeekMatrix};
pub use trend::{current, current_at, format_change, trend_table, Trend};

use chrono::NaiveDate;

use crate::models::FilteredCase;

/// Latest publication date among the cases; the anchor for trailing windows
pub fn latest_publication_date(cases: &[FilteredCase]) -> Option<NaiveDate> {
    cases.iter().map(|c| c.publication_date).max()
}

/// Cases published in `(end - days, end]`
pub fn count_in_window(cases: &[FilteredCase], end: NaiveDate, days: i64) -> usize {
    in_window(cases, end, days).count()
}

pub(crate) fn in_window(
    cases: &[FilteredCase],
    end: NaiveDate,
    days: i64,
) -> impl Iterator<Item = &FilteredCase> {
    let start = end - chrono::Duration::days(days);
    cases
        .iter()
        .filter(move |c| c.publication_date > start && c.publication_date <= end)
}
