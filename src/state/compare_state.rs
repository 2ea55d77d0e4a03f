use std::collections::HashMap;

use crate::async_compare::CompareResult;
use crate::compare::types::{ComparisonRecord, FileStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adoption {
    Adopted(usize),
    /// A newer comparison was triggered after this one; result dropped.
    Stale,
    /// The comparison failed; previous records kept.
    Failed(String),
}

/// Latest adopted comparison plus the bookkeeping needed to reject results
/// from superseded triggers.
pub struct CompareState {
    pub records: Vec<ComparisonRecord>,
    pub loading: bool,
    /// Generation of the most recent trigger.
    requested: u64,
    /// Generation the current `records` came from, 0 if none yet.
    adopted: u64,
}

impl Default for CompareState {
    fn default() -> Self {
        Self::new()
    }
}

impl CompareState {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            loading: false,
            requested: 0,
            adopted: 0,
        }
    }

    /// Register a new trigger and return its generation.
    pub fn begin(&mut self) -> u64 {
        self.requested += 1;
        self.loading = true;
        self.requested
    }

    pub fn adopted_generation(&self) -> u64 {
        self.adopted
    }

    /// Last-write-wins by trigger order: only the result of the latest
    /// trigger replaces the records, whatever order results arrive in.
    pub fn apply(&mut self, result: CompareResult) -> Adoption {
        if result.generation < self.requested {
            tracing::debug!(
                generation = result.generation,
                current = self.requested,
                "dropping stale comparison"
            );
            return Adoption::Stale;
        }
        self.loading = false;
        match result.records {
            Ok(records) => {
                let count = records.len();
                self.records = records;
                self.adopted = result.generation;
                Adoption::Adopted(count)
            }
            Err(e) => Adoption::Failed(format!("{:#}", anyhow::Error::new(e))),
        }
    }

    pub fn counts(&self) -> HashMap<FileStatus, usize> {
        let mut counts = HashMap::new();
        for record in &self.records {
            *counts.entry(record.status).or_insert(0) += 1;
        }
        counts
    }

    /// Workspace paths of every new or modified file.
    pub fn pushable_paths(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| r.status.is_pushable())
            .map(|r| r.path.clone())
            .collect()
    }
}
