use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};

use super::latest_publication_date;
use crate::models::FilteredCase;
use crate::report::{Cell, Table};

const WEEK_INDEX: &str = "Woche";

/// ISO (year, week) of a date. Late December can fall into week 1 of the next
/// ISO year and early January into week 52/53 of the previous one.
pub fn iso_year_week(date: NaiveDate) -> (i32, u32) {
    let week = date.iso_week();
    (week.year(), week.week())
}

/// Label used for week series rows, e.g. `2021W3`
pub fn week_label(year: i32, week: u32) -> String {
    format!("{}W{}", year, week)
}

/// Inverse of [`week_label`], used to order merged week series
pub fn parse_week_label(label: &str) -> Option<(i32, u32)> {
    let (year, week) = label.split_once('W')?;
    Some((year.parse().ok()?, week.parse().ok()?))
}

/// Sparse case counts per ISO year and week
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekMatrix {
    counts: BTreeMap<i32, BTreeMap<u32, usize>>,
}

impl WeekMatrix {
    /// Count for a cell; `None` means no case fell into it
    pub fn get(&self, year: i32, week: u32) -> Option<usize> {
        self.counts.get(&year)?.get(&week).copied()
    }

    pub fn years(&self) -> impl Iterator<Item = i32> + '_ {
        self.counts.keys().copied()
    }

    /// All weeks with data in any year, ascending
    pub fn weeks(&self) -> Vec<u32> {
        let mut weeks: Vec<u32> = self
            .counts
            .values()
            .flat_map(|w| w.keys().copied())
            .collect();
        weeks.sort_unstable();
        weeks.dedup();
        weeks
    }

    pub fn total(&self) -> usize {
        self.counts.values().flat_map(|w| w.values()).sum()
    }

    /// Weeks as rows, years as columns; empty cells where no case fell
    pub fn to_table(&self) -> Table {
        let columns = self.years().map(|y| y.to_string()).collect();
        let mut table = Table::new(WEEK_INDEX, columns);

        for week in self.weeks() {
            let cells = self
                .years()
                .map(|year| match self.get(year, week) {
                    Some(count) => Cell::from(count),
                    None => Cell::Empty,
                })
                .collect();
            table.push_row(week.to_string(), cells);
        }

        table
    }
}

/// Group cases by the ISO (year, week) of their publication date
pub fn by_year_and_week(cases: &[FilteredCase]) -> WeekMatrix {
    let mut matrix = WeekMatrix::default();
    for case in cases {
        let (year, week) = iso_year_week(case.publication_date);
        *matrix
            .counts
            .entry(year)
            .or_default()
            .entry(week)
            .or_default() += 1;
    }
    matrix
}

/// One row per ISO week with data, chronological, single column named `label`
pub fn week_series(cases: &[FilteredCase], label: &str) -> Table {
    let mut counts: BTreeMap<(i32, u32), usize> = BTreeMap::new();
    for case in cases {
        *counts.entry(iso_year_week(case.publication_date)).or_default() += 1;
    }

    let mut table = Table::new(WEEK_INDEX, vec![label.to_string()]);
    for ((year, week), count) in counts {
        table.push_row(week_label(year, week), vec![Cell::from(count)]);
    }
    table
}

/// Weeks of the anchor's ISO year and the year before, up to the anchor's week.
///
/// Columns are years, or year plus debtor category when every case in the
/// window carries the company flag. A column stays empty before its first
/// week with data and is zero-filled afterwards.
pub fn year_to_date(cases: &[FilteredCase]) -> Table {
    let Some(anchor) = latest_publication_date(cases) else {
        return Table::new(WEEK_INDEX, Vec::new());
    };
    let (anchor_year, anchor_week) = iso_year_week(anchor);
    let years = [anchor_year - 1, anchor_year];

    let in_window: Vec<(i32, u32, Option<bool>)> = cases
        .iter()
        .map(|c| {
            let (year, week) = iso_year_week(c.publication_date);
            (year, week, c.is_company())
        })
        .filter(|(year, week, _)| years.contains(year) && *week <= anchor_week)
        .collect();

    let split = !in_window.is_empty() && in_window.iter().all(|(_, _, c)| c.is_some());

    let mut series = Vec::new();
    for year in years {
        if split {
            series.push(Series::new(format!("{} Privatpersonen", year), year, Some(false)));
            series.push(Series::new(format!("{} Unternehmen", year), year, Some(true)));
        } else {
            series.push(Series::new(year.to_string(), year, None));
        }
    }

    for (year, week, company) in &in_window {
        for s in series.iter_mut().filter(|s| s.matches(*year, *company)) {
            *s.counts.entry(*week).or_default() += 1;
        }
    }

    // First week with data per year, shared by the split columns of that year
    let first_week = |year: i32| {
        in_window
            .iter()
            .filter(|(y, _, _)| *y == year)
            .map(|(_, w, _)| *w)
            .min()
    };

    let columns = series.iter().map(|s| s.name.clone()).collect();
    let mut table = Table::new(WEEK_INDEX, columns);
    for week in 1..=anchor_week {
        let cells = series
            .iter()
            .map(|s| match first_week(s.year) {
                Some(start) if week >= start && has_iso_week(s.year, week) => {
                    Cell::from(s.counts.get(&week).copied().unwrap_or(0))
                }
                _ => Cell::Empty,
            })
            .collect();
        table.push_row(week.to_string(), cells);
    }

    table
}

/// Only some ISO years have a week 53
fn has_iso_week(year: i32, week: u32) -> bool {
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).is_some()
}

struct Series {
    name: String,
    year: i32,
    company: Option<bool>,
    counts: BTreeMap<u32, usize>,
}

impl Series {
    fn new(name: String, year: i32, company: Option<bool>) -> Self {
        Self {
            name,
            year,
            company,
            counts: BTreeMap::new(),
        }
    }

    fn matches(&self, year: i32, company: Option<bool>) -> bool {
        year == self.year && (self.company.is_none() || self.company == company)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{case_on, date};

    fn cases_on(dates: &[NaiveDate]) -> Vec<FilteredCase> {
        dates.iter().map(|d| case_on(*d, "Bonn")).collect()
    }

    #[test]
    fn test_iso_week_at_year_boundary() {
        // Monday 2019-12-30 belongs to 2020-W01
        assert_eq!(iso_year_week(date(2019, 12, 30)), (2020, 1));
        // Friday 2021-01-01 belongs to 2020-W53
        assert_eq!(iso_year_week(date(2021, 1, 1)), (2020, 53));
        assert_eq!(iso_year_week(date(2021, 1, 4)), (2021, 1));
    }

    #[test]
    fn test_matrix_groups_by_iso_year() {
        let cases = cases_on(&[
            date(2019, 12, 30),
            date(2020, 1, 2),
            date(2021, 1, 1),
            date(2021, 1, 4),
        ]);
        let matrix = by_year_and_week(&cases);

        assert_eq!(matrix.get(2020, 1), Some(2));
        assert_eq!(matrix.get(2019, 1), None);
        assert_eq!(matrix.get(2020, 53), Some(1));
        assert_eq!(matrix.get(2021, 53), None);
        assert_eq!(matrix.get(2021, 1), Some(1));
        assert_eq!(matrix.years().collect::<Vec<_>>(), vec![2020, 2021]);
        assert_eq!(matrix.total(), 4);
    }

    #[test]
    fn test_matrix_table_leaves_missing_cells_empty() {
        let cases = cases_on(&[date(2020, 1, 6), date(2020, 1, 7), date(2021, 1, 11)]);
        let table = by_year_and_week(&cases).to_table();

        assert_eq!(table.index_name(), "Woche");
        assert_eq!(table.columns(), &["2020".to_string(), "2021".to_string()]);
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["2"]);
        assert_eq!(table.row("2").unwrap(), &[Cell::Int(2), Cell::Int(1)]);

        let cases = cases_on(&[date(2020, 1, 6), date(2021, 1, 18)]);
        let table = by_year_and_week(&cases).to_table();
        assert_eq!(table.get("2", "2021"), Some(&Cell::Empty));
        assert_eq!(table.get("3", "2020"), Some(&Cell::Empty));
    }

    #[test]
    fn test_week_series_is_chronological() {
        let cases = cases_on(&[date(2021, 3, 1), date(2020, 12, 31), date(2021, 1, 15)]);
        let table = week_series(&cases, "Insolvenzverfahren");

        assert_eq!(
            table.keys().collect::<Vec<_>>(),
            vec!["2020W53", "2021W2", "2021W9"]
        );
        assert_eq!(table.get("2021W9", "Insolvenzverfahren"), Some(&Cell::Int(1)));
    }

    #[test]
    fn test_parse_week_label() {
        assert_eq!(parse_week_label("2021W9"), Some((2021, 9)));
        assert_eq!(parse_week_label(&week_label(2020, 53)), Some((2020, 53)));
        assert_eq!(parse_week_label("Gesamt"), None);
    }

    #[test]
    fn test_year_to_date_by_year() {
        // anchor 2021-01-20 is 2021-W03
        let cases = cases_on(&[
            date(2020, 1, 8),  // 2020-W02
            date(2020, 6, 1),  // outside the window
            date(2021, 1, 6),  // 2021-W01
            date(2021, 1, 20), // 2021-W03
        ]);
        let table = year_to_date(&cases);

        assert_eq!(table.columns(), &["2020".to_string(), "2021".to_string()]);
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["1", "2", "3"]);
        assert_eq!(table.row("1").unwrap(), &[Cell::Empty, Cell::Int(1)]);
        assert_eq!(table.row("2").unwrap(), &[Cell::Int(1), Cell::Int(0)]);
        assert_eq!(table.row("3").unwrap(), &[Cell::Int(0), Cell::Int(1)]);
    }

    #[test]
    fn test_year_to_date_split_by_company_flag() {
        let mut cases = cases_on(&[date(2021, 1, 6), date(2021, 1, 7), date(2020, 1, 1)]);
        cases[0].record.is_company = Some(true);
        cases[1].record.is_company = Some(false);
        // 2020-01-01 is 2020-W01
        cases[2].record.is_company = Some(false);

        let table = year_to_date(&cases);
        assert_eq!(
            table.columns(),
            &[
                "2020 Privatpersonen".to_string(),
                "2020 Unternehmen".to_string(),
                "2021 Privatpersonen".to_string(),
                "2021 Unternehmen".to_string(),
            ]
        );
        assert_eq!(
            table.row("1").unwrap(),
            &[Cell::Int(1), Cell::Int(0), Cell::Int(1), Cell::Int(1)]
        );
    }

    #[test]
    fn test_year_to_date_week_53_missing_in_previous_year() {
        // anchor 2021-01-01 is 2020-W53; 2019 has only 52 ISO weeks
        let cases = cases_on(&[date(2019, 12, 20), date(2021, 1, 1)]);
        let table = year_to_date(&cases);

        assert_eq!(table.columns(), &["2019".to_string(), "2020".to_string()]);
        assert_eq!(table.len(), 53);
        assert_eq!(table.row("51").unwrap(), &[Cell::Int(1), Cell::Empty]);
        assert_eq!(table.row("52").unwrap(), &[Cell::Int(0), Cell::Empty]);
        assert_eq!(table.row("53").unwrap(), &[Cell::Empty, Cell::Int(1)]);
        assert!(table.to_csv().unwrap().ends_with(b"52,0,\n53,,1\n"));
    }

    #[test]
    fn test_year_to_date_empty_input() {
        let table = year_to_date(&[]);
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }
}
