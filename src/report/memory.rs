use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::Result;

use super::{EmitOutcome, ReportEmitter, Table};

/// Keeps emitted tables in memory, keyed by destination name
#[derive(Default)]
pub struct MemoryEmitter {
    tables: Mutex<BTreeMap<String, Table>>,
}

impl MemoryEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Table> {
        self.lock().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Table>> {
        // A poisoned map is still readable
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ReportEmitter for MemoryEmitter {
    fn emit(&self, table: &Table, name: &str) -> Result<EmitOutcome> {
        let mut tables = self.lock();
        if tables.get(name) == Some(table) {
            return Ok(EmitOutcome::Unchanged);
        }
        tables.insert(name.to_string(), table.clone());
        Ok(EmitOutcome::Written)
    }
}
