//! Trait for cancer-study mutation data access.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dtda_common::{DtdaError, MutationType, Result};
use serde::{Deserialize, Serialize};

/// One mutation observed in one sequenced case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub gene_symbol: String,
    /// Protein change as reported, e.g. `V600E` or `E746_A750del`.
    pub amino_acid_change: String,
}

impl MutationRecord {
    pub fn new(gene_symbol: &str, amino_acid_change: &str) -> Self {
        Self {
            gene_symbol: gene_symbol.to_string(),
            amino_acid_change: amino_acid_change.to_string(),
        }
    }
}

/// Trait for accessing study-level mutation data.
#[async_trait]
pub trait StudySource: Send + Sync {
    /// Concrete study IDs whose identifier matches the prefix.
    async fn list_studies(&self, prefix: &str) -> Result<Vec<String>>;

    /// Number of sequenced cases in the study.
    async fn count_sequenced_cases(&self, study_id: &str) -> Result<u64>;

    /// Mutation records restricted to `genes` and `mutation_type`, in source order.
    async fn fetch_mutations(
        &self,
        study_id: &str,
        genes: &[&str],
        mutation_type: &MutationType,
    ) -> Result<Vec<MutationRecord>>;
}

// ── Mock Implementation for Testing ────────────────────────────────────────

#[derive(Default)]
pub struct MockStudySource {
    studies: HashMap<String, Vec<String>>,
    case_counts: HashMap<String, u64>,
    mutations: HashMap<String, Vec<(MutationType, MutationRecord)>>,
    failing_studies: Vec<String>,
    list_calls: AtomicUsize,
    mutation_calls: AtomicUsize,
}

impl MockStudySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the studies listed for a prefix.
    pub fn with_studies(mut self, prefix: &str, study_ids: &[&str]) -> Self {
        self.studies
            .entry(prefix.to_string())
            .or_default()
            .extend(study_ids.iter().map(|s| s.to_string()));
        self
    }

    pub fn with_case_count(mut self, study_id: &str, cases: u64) -> Self {
        self.case_counts.insert(study_id.to_string(), cases);
        self
    }

    /// Add a missense record.
    pub fn with_mutation(self, study_id: &str, gene: &str, change: &str) -> Self {
        self.with_typed_mutation(study_id, MutationType::Missense, gene, change)
    }

    pub fn with_typed_mutation(
        mut self,
        study_id: &str,
        mutation_type: MutationType,
        gene: &str,
        change: &str,
    ) -> Self {
        self.mutations
            .entry(study_id.to_string())
            .or_default()
            .push((mutation_type, MutationRecord::new(gene, change)));
        self
    }

    /// Mutation fetches for this study time out.
    pub fn with_failing_study(mut self, study_id: &str) -> Self {
        self.failing_studies.push(study_id.to_string());
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn mutation_calls(&self) -> usize {
        self.mutation_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StudySource for MockStudySource {
    async fn list_studies(&self, prefix: &str) -> Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.studies.get(prefix).cloned().unwrap_or_default())
    }

    async fn count_sequenced_cases(&self, study_id: &str) -> Result<u64> {
        Ok(self.case_counts.get(study_id).copied().unwrap_or(0))
    }

    async fn fetch_mutations(
        &self,
        study_id: &str,
        genes: &[&str],
        mutation_type: &MutationType,
    ) -> Result<Vec<MutationRecord>> {
        self.mutation_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_studies.iter().any(|s| s == study_id) {
            return Err(DtdaError::DatabaseTimeout {
                query: format!("mutations of {}", study_id),
                timeout_secs: 10,
            });
        }
        Ok(self
            .mutations
            .get(study_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|(t, r)| t == mutation_type && genes.contains(&r.gene_symbol.as_str()))
                    .map(|(_, r)| r.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}
