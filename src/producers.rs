use std::fmt;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::aggregate::history::parse_week_label;
use crate::aggregate::{
    by_year_and_week, current, district_rates, district_table, trend_table, week_series,
    year_to_date,
};
use crate::config::Config;
use crate::filter::CaseFilter;
use crate::models::{CaseKind, FilteredCase, InsolvencyType};
use crate::population::PopulationTable;
use crate::report::{EmitOutcome, ReportEmitter, Table};
use crate::source::RecordStore;

/// Label of private insolvency columns and rows
pub const PRIVATE_LABEL: &str = "Privatinsolvenzen";

/// Shared state of one batch run: the memoized filter and the report sink
pub struct RunContext<S: RecordStore, E: ReportEmitter> {
    filter: CaseFilter<S>,
    emitter: E,
    population: PopulationTable,
    district_window_days: i64,
}

impl<S: RecordStore, E: ReportEmitter> RunContext<S, E> {
    pub fn new(
        store: S,
        emitter: E,
        population: PopulationTable,
        federal_state: impl Into<String>,
        district_window_days: i64,
    ) -> Self {
        Self {
            filter: CaseFilter::new(store, federal_state),
            emitter,
            population,
            district_window_days,
        }
    }

    pub fn from_config(store: S, emitter: E, config: &Config) -> Result<Self> {
        let population = PopulationTable::load(config.reports.population_table.as_deref())?;
        Ok(Self::new(
            store,
            emitter,
            population,
            config.source.federal_state.clone(),
            config.reports.district_window_days,
        ))
    }

    pub fn filter(&self) -> &CaseFilter<S> {
        &self.filter
    }

    /// Get the emitter for direct access
    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    fn district_report(&self, cases: &[FilteredCase], label: &str) -> Result<Table> {
        let rows = district_rates(
            cases,
            &self.population,
            self.filter.federal_state(),
            self.district_window_days,
        )
        .with_context(|| format!("Failed to compute district rates for {}", label))?;
        Ok(district_table(&rows, label))
    }

    fn emit(&self, table: &Table, name: &str, changed: &mut Vec<String>) -> Result<()> {
        let outcome = self
            .emitter
            .emit(table, name)
            .with_context(|| format!("Failed to emit {}", name))?;

        match outcome {
            EmitOutcome::Written => {
                info!(report = name, rows = table.len(), "Report updated");
                changed.push(name.to_string());
            }
            EmitOutcome::Unchanged => debug!(report = name, "Report unchanged"),
        }
        Ok(())
    }
}

/// Report producers in the order the batch runs them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Producer {
    Private,
    ClearCaches,
    Regular,
    Both,
}

impl Producer {
    pub const ALL: [Producer; 4] = [
        Producer::Private,
        Producer::ClearCaches,
        Producer::Regular,
        Producer::Both,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Producer::Private => "private",
            Producer::ClearCaches => "clear_caches",
            Producer::Regular => "regular",
            Producer::Both => "both",
        }
    }

    /// Run the producer, returning the names of reports whose content changed
    pub fn run<S: RecordStore, E: ReportEmitter>(
        self,
        ctx: &mut RunContext<S, E>,
    ) -> Result<Vec<String>> {
        match self {
            Producer::Private => write_private(ctx),
            Producer::ClearCaches => {
                ctx.filter.clear_caches();
                Ok(Vec::new())
            }
            Producer::Regular => write_regular(ctx),
            Producer::Both => write_both(ctx),
        }
    }
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn write_private<S: RecordStore, E: ReportEmitter>(
    ctx: &mut RunContext<S, E>,
) -> Result<Vec<String>> {
    let outcome = ctx.filter.filter(InsolvencyType::Private)?;
    let cases = outcome.cases(CaseKind::ProceedingOpened);
    let mut changed = Vec::new();

    let districts = ctx.district_report(cases, PRIVATE_LABEL)?;
    ctx.emit(&districts, "private_by_district_name.csv", &mut changed)?;
    ctx.emit(
        &by_year_and_week(cases).to_table(),
        "private_by_year_by_week.csv",
        &mut changed,
    )?;
    ctx.emit(
        &week_series(cases, PRIVATE_LABEL),
        "private_by_week.csv",
        &mut changed,
    )?;
    ctx.emit(&year_to_date(cases), "private_year_to_date.csv", &mut changed)?;
    ctx.emit(
        &trend_table(&[(PRIVATE_LABEL.to_string(), current(cases))]),
        "private_current.csv",
        &mut changed,
    )?;

    Ok(changed)
}

fn write_regular<S: RecordStore, E: ReportEmitter>(
    ctx: &mut RunContext<S, E>,
) -> Result<Vec<String>> {
    let outcome = ctx.filter.filter(InsolvencyType::Regular)?;
    let mut changed = Vec::new();
    let mut district_tables = Vec::new();
    let mut week_tables = Vec::new();

    for kind in CaseKind::ALL {
        let cases = outcome.cases(kind);
        let label = kind.label();

        let districts = ctx.district_report(cases, label)?;
        ctx.emit(
            &districts,
            &format!("regular_by_district_name_{}.csv", kind.key()),
            &mut changed,
        )?;
        ctx.emit(
            &by_year_and_week(cases).to_table(),
            &format!("regular_by_year_by_week_{}.csv", kind.key()),
            &mut changed,
        )?;

        let weeks = week_series(cases, label);
        ctx.emit(
            &weeks,
            &format!("regular_by_week_{}.csv", kind.key()),
            &mut changed,
        )?;

        district_tables.push(districts);
        week_tables.push(weeks);
    }

    ctx.emit(
        &Table::join("Name", &district_tables),
        "regular_by_district_name_merged.csv",
        &mut changed,
    )?;

    let mut weeks = Table::join("Woche", &week_tables);
    weeks.sort_rows_by(|a, b| parse_week_label(a).cmp(&parse_week_label(b)));
    ctx.emit(&weeks, "regular_by_week_merged.csv", &mut changed)?;

    Ok(changed)
}

fn write_both<S: RecordStore, E: ReportEmitter>(
    ctx: &mut RunContext<S, E>,
) -> Result<Vec<String>> {
    let private = ctx.filter.filter(InsolvencyType::Private)?;
    let regular = ctx.filter.filter(InsolvencyType::Regular)?;

    let private_trend = trend_table(&[(
        PRIVATE_LABEL.to_string(),
        current(private.cases(CaseKind::ProceedingOpened)),
    )]);
    let regular_trends: Vec<Table> = CaseKind::ALL
        .iter()
        .map(|kind| trend_table(&[(kind.label().to_string(), current(regular.cases(*kind)))]))
        .collect();

    let mut trends = vec![private_trend];
    trends.extend(regular_trends);
    let both = Table::concat("Art", &trends);

    let mut changed = Vec::new();
    ctx.emit(&both, "both_current.csv", &mut changed)?;
    Ok(changed)
}
