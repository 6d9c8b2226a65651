use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::models::{CaseKind, CaseRecord, FilteredCase, InsolvencyType};
use crate::source::{self, RecordStore};

/// Rejection counters for one case kind. Diagnostic only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub total_cases: usize,
    pub no_residences: usize,
    pub duplicate_count: usize,
}

/// Kept cases and statistics for one insolvency type
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    cases: BTreeMap<CaseKind, Vec<FilteredCase>>,
    stats: BTreeMap<CaseKind, FilterStats>,
}

impl FilterOutcome {
    /// Kept cases of a kind in (publication date, file order)
    pub fn cases(&self, kind: CaseKind) -> &[FilteredCase] {
        self.cases.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn stats(&self, kind: CaseKind) -> FilterStats {
        self.stats.get(&kind).copied().unwrap_or_default()
    }
}

/// Per-run memo of filter outcomes, one entry per insolvency type
#[derive(Debug, Default)]
pub struct FilterCache {
    outcomes: HashMap<InsolvencyType, Arc<FilterOutcome>>,
}

impl FilterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_try_insert_with(
        &mut self,
        insolvency_type: InsolvencyType,
        f: impl FnOnce() -> Result<FilterOutcome>,
    ) -> Result<Arc<FilterOutcome>> {
        if let Some(outcome) = self.outcomes.get(&insolvency_type) {
            debug!(insolvency_type = %insolvency_type, "Filter cache hit");
            return Ok(Arc::clone(outcome));
        }

        let outcome = Arc::new(f()?);
        self.outcomes.insert(insolvency_type, Arc::clone(&outcome));
        Ok(outcome)
    }

    pub fn clear(&mut self) {
        self.outcomes.clear();
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// Region filter and deduplicator over a record store
pub struct CaseFilter<S: RecordStore> {
    store: S,
    federal_state: String,
    cache: FilterCache,
}

impl<S: RecordStore> CaseFilter<S> {
    pub fn new(store: S, federal_state: impl Into<String>) -> Self {
        Self {
            store,
            federal_state: federal_state.into(),
            cache: FilterCache::new(),
        }
    }

    pub fn federal_state(&self) -> &str {
        &self.federal_state
    }

    /// Filtered cases for an insolvency type, computed once per run
    pub fn filter(&mut self, insolvency_type: InsolvencyType) -> Result<Arc<FilterOutcome>> {
        let Self {
            store,
            federal_state,
            cache,
        } = self;
        cache.get_or_try_insert_with(insolvency_type, || {
            filter_store(&*store, federal_state.as_str(), insolvency_type)
        })
    }

    /// Drop memoized outcomes so the next call re-reads the store
    pub fn clear_caches(&mut self) {
        self.cache.clear();
        debug!("Cleared filter cache");
    }

    pub fn cache(&self) -> &FilterCache {
        &self.cache
    }

    /// Get the store for direct access
    pub fn store(&self) -> &S {
        &self.store
    }
}

/// Walk every source file of an insolvency type and keep relevant, unique cases
pub fn filter_store<S: RecordStore + ?Sized>(
    store: &S,
    federal_state: &str,
    insolvency_type: InsolvencyType,
) -> Result<FilterOutcome> {
    let mut state = FilterState::new(insolvency_type, federal_state);

    for file_name in store.list(insolvency_type)? {
        let date = source::publication_date(&file_name)?;
        let file = store.load(insolvency_type, &file_name)?;

        for kind in CaseKind::ALL {
            for record in file.cases(kind) {
                state.process(&file_name, date, kind, record)?;
            }
        }
    }

    let outcome = state.finish();
    log_outcome(insolvency_type, &outcome);
    Ok(outcome)
}

struct FilterState<'a> {
    insolvency_type: InsolvencyType,
    federal_state: &'a str,
    seen: HashMap<CaseKind, HashSet<(String, String)>>,
    outcome: FilterOutcome,
}

impl<'a> FilterState<'a> {
    fn new(insolvency_type: InsolvencyType, federal_state: &'a str) -> Self {
        let mut outcome = FilterOutcome::default();
        for kind in CaseKind::ALL {
            outcome.cases.insert(kind, Vec::new());
            outcome.stats.insert(kind, FilterStats::default());
        }

        Self {
            insolvency_type,
            federal_state,
            seen: HashMap::new(),
            outcome,
        }
    }

    fn process(
        &mut self,
        file_name: &str,
        date: chrono::NaiveDate,
        kind: CaseKind,
        record: &CaseRecord,
    ) -> Result<(), PipelineError> {
        let stats = self.outcome.stats.entry(kind).or_default();
        stats.total_cases += 1;

        if record.residences.is_empty() {
            stats.no_residences += 1;
            return Ok(());
        }

        // Out of region, not an error
        if record.residence_in(self.federal_state).is_none() {
            return Ok(());
        }

        let malformed = |field| PipelineError::MalformedRecord {
            insolvency_type: self.insolvency_type,
            kind,
            file: file_name.to_string(),
            field,
        };
        let court = record
            .court
            .clone()
            .ok_or_else(|| malformed("courtcase-court"))?;
        let case_number = record
            .case_number
            .clone()
            .ok_or_else(|| malformed("courtcase-aktenzeichen"))?;

        let key = (court, case_number);
        let seen = self.seen.entry(kind).or_default();
        if seen.contains(&key) {
            stats.duplicate_count += 1;
            return Ok(());
        }

        let (court, case_number) = key.clone();
        seen.insert(key);

        self.outcome.cases.entry(kind).or_default().push(FilteredCase {
            kind,
            court,
            case_number,
            publication_date: date,
            record: record.clone(),
        });

        Ok(())
    }

    fn finish(self) -> FilterOutcome {
        self.outcome
    }
}

fn log_outcome(insolvency_type: InsolvencyType, outcome: &FilterOutcome) {
    for kind in CaseKind::ALL {
        let stats = outcome.stats(kind);
        let no_residences_pct = if stats.total_cases == 0 {
            0.0
        } else {
            (stats.no_residences as f64 / stats.total_cases as f64 * 1000.0).round() / 10.0
        };

        info!(
            insolvency_type = %insolvency_type,
            kind = %kind,
            total = stats.total_cases,
            no_residences = stats.no_residences,
            no_residences_pct,
            kept = outcome.cases(kind).len(),
            duplicates = stats.duplicate_count,
            "Filtered cases"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{date, record, residence};
    use crate::models::SourceFile;
    use crate::source::MemoryRecordStore;

    const NRW: &str = "Nordrhein-Westfalen";

    fn file_with(kind: CaseKind, records: Vec<CaseRecord>) -> SourceFile {
        let mut file = SourceFile::default();
        match kind {
            CaseKind::ProceedingOpened => file.verfahreneroeffnet = records,
            CaseKind::DismissedForLackOfAssets => file.abweisungmangelsmasse = records,
            CaseKind::PrecautionaryMeasures => file.sicherungsmassnahmen = records,
        }
        file
    }

    fn in_nrw(court: &str, case_number: &str) -> CaseRecord {
        record(court, case_number, vec![residence("Köln, Stadt", NRW)])
    }

    #[test]
    fn test_duplicate_keeps_earliest() {
        let mut store = MemoryRecordStore::new();
        store.insert(
            InsolvencyType::Regular,
            "2021-01-11.json",
            file_with(CaseKind::ProceedingOpened, vec![in_nrw("A", "1")]),
        );
        store.insert(
            InsolvencyType::Regular,
            "2021-01-04.json",
            file_with(CaseKind::ProceedingOpened, vec![in_nrw("A", "1")]),
        );

        let outcome = filter_store(&store, NRW, InsolvencyType::Regular).unwrap();
        let cases = outcome.cases(CaseKind::ProceedingOpened);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].publication_date, date(2021, 1, 4));
        assert_eq!(outcome.stats(CaseKind::ProceedingOpened).duplicate_count, 1);
        assert_eq!(outcome.stats(CaseKind::ProceedingOpened).total_cases, 2);
    }

    #[test]
    fn test_dedup_key_includes_court_and_kind() {
        let mut file = file_with(
            CaseKind::ProceedingOpened,
            vec![in_nrw("A", "1"), in_nrw("B", "1")],
        );
        file.sicherungsmassnahmen = vec![in_nrw("A", "1")];

        let mut store = MemoryRecordStore::new();
        store.insert(InsolvencyType::Regular, "2021-01-04.json", file);

        let outcome = filter_store(&store, NRW, InsolvencyType::Regular).unwrap();
        assert_eq!(outcome.cases(CaseKind::ProceedingOpened).len(), 2);
        assert_eq!(outcome.cases(CaseKind::PrecautionaryMeasures).len(), 1);
        assert_eq!(outcome.stats(CaseKind::ProceedingOpened).duplicate_count, 0);
    }

    #[test]
    fn test_region_and_residence_filtering() {
        let records = vec![
            record("A", "1", vec![]),
            record("A", "2", vec![residence("München", "Bayern")]),
            record(
                "A",
                "3",
                vec![residence("München", "Bayern"), residence("Bonn, Stadt", NRW)],
            ),
        ];
        let mut store = MemoryRecordStore::new();
        store.insert(
            InsolvencyType::Private,
            "2021-02-01.json",
            file_with(CaseKind::ProceedingOpened, records),
        );

        let outcome = filter_store(&store, NRW, InsolvencyType::Private).unwrap();
        let cases = outcome.cases(CaseKind::ProceedingOpened);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].case_number, "3");

        let stats = outcome.stats(CaseKind::ProceedingOpened);
        assert_eq!(stats.total_cases, 3);
        assert_eq!(stats.no_residences, 1);
        assert_eq!(stats.duplicate_count, 0);
    }

    #[test]
    fn test_out_of_region_record_may_lack_keys() {
        let broken = CaseRecord {
            residences: vec![residence("Hamburg", "Hamburg")],
            ..Default::default()
        };

        let mut store = MemoryRecordStore::new();
        store.insert(
            InsolvencyType::Private,
            "2021-02-01.json",
            file_with(CaseKind::ProceedingOpened, vec![broken]),
        );

        let outcome = filter_store(&store, NRW, InsolvencyType::Private).unwrap();
        assert!(outcome.cases(CaseKind::ProceedingOpened).is_empty());
    }

    #[test]
    fn test_malformed_record_is_fatal() {
        let mut broken = in_nrw("A", "1");
        broken.case_number = None;

        let mut store = MemoryRecordStore::new();
        store.insert(
            InsolvencyType::Private,
            "2021-02-01.json",
            file_with(CaseKind::DismissedForLackOfAssets, vec![broken]),
        );

        let err = filter_store(&store, NRW, InsolvencyType::Private).unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::MalformedRecord { field, kind, .. }) => {
                assert_eq!(*field, "courtcase-aktenzeichen");
                assert_eq!(*kind, CaseKind::DismissedForLackOfAssets);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_file_name_is_fatal() {
        let mut store = MemoryRecordStore::new();
        store.insert(InsolvencyType::Private, "latest.json", SourceFile::default());

        let err = filter_store(&store, NRW, InsolvencyType::Private).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InvalidFileName(_))
        ));
    }

    #[test]
    fn test_kept_order_follows_file_then_record_order() {
        let mut store = MemoryRecordStore::new();
        store.insert(
            InsolvencyType::Regular,
            "2021-01-05.json",
            file_with(CaseKind::ProceedingOpened, vec![in_nrw("A", "3")]),
        );
        store.insert(
            InsolvencyType::Regular,
            "2021-01-04.json",
            file_with(
                CaseKind::ProceedingOpened,
                vec![in_nrw("A", "2"), in_nrw("A", "1")],
            ),
        );

        let outcome = filter_store(&store, NRW, InsolvencyType::Regular).unwrap();
        let numbers: Vec<_> = outcome
            .cases(CaseKind::ProceedingOpened)
            .iter()
            .map(|c| c.case_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["2", "1", "3"]);
    }

    #[test]
    fn test_cache_per_type_and_clear() {
        let mut store = MemoryRecordStore::new();
        store.insert(
            InsolvencyType::Private,
            "2021-01-04.json",
            file_with(CaseKind::ProceedingOpened, vec![in_nrw("A", "1")]),
        );
        store.insert(
            InsolvencyType::Regular,
            "2021-01-04.json",
            file_with(CaseKind::ProceedingOpened, vec![in_nrw("A", "1")]),
        );

        let mut filter = CaseFilter::new(store, NRW);
        filter.filter(InsolvencyType::Private).unwrap();
        filter.filter(InsolvencyType::Private).unwrap();
        assert_eq!(filter.store().load_count(), 1);
        assert_eq!(filter.cache().len(), 1);

        filter.filter(InsolvencyType::Regular).unwrap();
        assert_eq!(filter.store().load_count(), 2);
        assert_eq!(filter.cache().len(), 2);

        filter.clear_caches();
        assert!(filter.cache().is_empty());
        filter.filter(InsolvencyType::Private).unwrap();
        assert_eq!(filter.store().load_count(), 3);
    }
}
