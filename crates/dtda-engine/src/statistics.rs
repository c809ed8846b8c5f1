//! Disease mutation statistics.
//!
//! Pipeline: disease id → study prefixes → concrete studies → per-study
//! mutation records over the gene panel → most-mutated gene per study →
//! effect classification of that gene's mutations → cross-study
//! normalisation.

use std::sync::Arc;

use dtda_common::{DtdaError, MutationEffect, MutationType, Result};
use dtda_sources::{DiseaseStudyMap, MutationRecord, StudySource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::gene_panel::default_gene_panel;
use crate::mutation_effect::MutationMatcher;

// ── Result types ────────────────────────────────────────────────────────────

/// Raw effect counts for one gene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectTally {
    pub activate: u64,
    pub deactivate: u64,
    pub other: u64,
}

impl EffectTally {
    pub fn record(&mut self, effect: Option<MutationEffect>) {
        match effect {
            Some(MutationEffect::Activate)   => self.activate += 1,
            Some(MutationEffect::Deactivate) => self.deactivate += 1,
            None                             => self.other += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.activate + self.deactivate + self.other
    }

    /// `None` when nothing was tallied.
    pub fn distribution(&self) -> Option<EffectDistribution> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let total = total as f64;
        Some(EffectDistribution {
            activate: self.activate as f64 / total,
            deactivate: self.deactivate as f64 / total,
            other: self.other as f64 / total,
        })
    }
}

/// Effect probabilities; the three fields sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectDistribution {
    pub activate: f64,
    pub deactivate: f64,
    pub other: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneMutationStats {
    pub gene: String,
    pub mutated_cases: u64,
    /// `mutated_cases` over all sequenced cases of the disease's studies.
    pub case_fraction: f64,
    pub effects: EffectTally,
    pub effect_distribution: Option<EffectDistribution>,
}

/// Per-gene statistics in the order genes were first recorded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MutationStatistics {
    pub sequenced_cases: u64,
    pub studies: Vec<String>,
    pub genes: Vec<GeneMutationStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopMutation {
    pub gene: String,
    /// Case fraction as a whole percentage, truncated.
    pub percent: u32,
    pub case_fraction: f64,
}

impl MutationStatistics {
    /// Turn accumulated counts into fractions and distributions.
    pub fn normalise(
        studies: Vec<String>,
        sequenced_cases: u64,
        accumulated: Vec<(String, u64, EffectTally)>,
    ) -> Self {
        if sequenced_cases == 0 && !accumulated.is_empty() {
            warn!("No sequenced cases across studies; case fractions set to 0");
        }
        let genes = accumulated
            .into_iter()
            .map(|(gene, mutated_cases, effects)| {
                let case_fraction = if sequenced_cases == 0 {
                    0.0
                } else {
                    mutated_cases as f64 / sequenced_cases as f64
                };
                let effect_distribution = effects.distribution();
                if effect_distribution.is_none() {
                    warn!(gene = %gene, "No classified mutations; effect distribution undefined");
                }
                GeneMutationStats { gene, mutated_cases, case_fraction, effects, effect_distribution }
            })
            .collect();
        Self { sequenced_cases, studies, genes }
    }

    pub fn get(&self, gene: &str) -> Option<&GeneMutationStats> {
        self.genes.iter().find(|g| g.gene == gene)
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Genes by case fraction, highest first; ties keep recording order.
    pub fn ranked(&self) -> Vec<&GeneMutationStats> {
        let mut ranked: Vec<&GeneMutationStats> = self.genes.iter().collect();
        ranked.sort_by(|a, b| {
            b.case_fraction
                .partial_cmp(&a.case_fraction)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }

    pub fn top(&self) -> Option<TopMutation> {
        self.ranked().first().map(|g| TopMutation {
            gene: g.gene.clone(),
            percent: (g.case_fraction * 100.0) as u32,
            case_fraction: g.case_fraction,
        })
    }
}

/// Most frequent gene among `records`; on a tie, the gene seen first.
pub fn top_gene(records: &[MutationRecord]) -> Option<&str> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for record in records {
        match counts.iter_mut().find(|(g, _)| *g == record.gene_symbol) {
            Some((_, n)) => *n += 1,
            None => counts.push((record.gene_symbol.as_str(), 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (gene, n) in counts {
        if best.map_or(true, |(_, best_n)| n > best_n) {
            best = Some((gene, n));
        }
    }
    best.map(|(gene, _)| gene)
}

// ── Aggregator ──────────────────────────────────────────────────────────────

pub struct DiseaseMutationAggregator {
    studies: Arc<dyn StudySource>,
    disease_map: Arc<DiseaseStudyMap>,
    matcher: Arc<MutationMatcher>,
    gene_panel: Vec<String>,
}

impl DiseaseMutationAggregator {
    pub fn new(
        studies: Arc<dyn StudySource>,
        disease_map: Arc<DiseaseStudyMap>,
        matcher: Arc<MutationMatcher>,
    ) -> Self {
        Self { studies, disease_map, matcher, gene_panel: default_gene_panel() }
    }

    /// Replace the default pathway gene panel.
    pub fn with_gene_panel(mut self, genes: Vec<String>) -> Self {
        self.gene_panel = genes;
        self
    }

    /// Concrete study IDs for a disease, first-seen order, no repeats.
    pub async fn resolve_studies(&self, disease: &str) -> Result<Vec<String>> {
        let prefixes = self
            .disease_map
            .prefixes(disease)
            .ok_or_else(|| DtdaError::DiseaseNotFound(disease.to_string()))?;

        let mut study_ids: Vec<String> = Vec::new();
        for prefix in prefixes {
            for id in self.studies.list_studies(prefix).await? {
                if !study_ids.contains(&id) {
                    study_ids.push(id);
                }
            }
        }

        if study_ids.is_empty() {
            return Err(DtdaError::DiseaseNotFound(disease.to_string()));
        }
        Ok(study_ids)
    }

    #[instrument(skip(self))]
    pub async fn get_mutation_statistics(
        &self,
        disease: &str,
        mutation_type: &MutationType,
    ) -> Result<MutationStatistics> {
        let study_ids = self.resolve_studies(disease).await?;
        let panel: Vec<&str> = self.gene_panel.iter().map(String::as_str).collect();
        info!(
            n_studies = study_ids.len(),
            n_genes = panel.len(),
            "Found studies and gene panel"
        );

        let mut sequenced_cases: u64 = 0;
        let mut accumulated: Vec<(String, u64, EffectTally)> = Vec::new();

        for study_id in &study_ids {
            sequenced_cases += self.studies.count_sequenced_cases(study_id).await?;
            let records = self.studies.fetch_mutations(study_id, &panel, mutation_type).await?;

            let Some(top) = top_gene(&records) else {
                info!(study_id = %study_id, "Found no genes");
                continue;
            };
            debug!(study_id = %study_id, top_gene = top, n_records = records.len(), "Top gene for study");

            let idx = match accumulated.iter().position(|(g, _, _)| g == top) {
                Some(idx) => idx,
                None => {
                    accumulated.push((top.to_string(), 0, EffectTally::default()));
                    accumulated.len() - 1
                }
            };

            for record in records.iter().filter(|r| r.gene_symbol == top) {
                let effect = self
                    .matcher
                    .find_mutation_effect(&record.gene_symbol, &record.amino_acid_change)
                    .await?;
                let (_, cases, tally) = &mut accumulated[idx];
                *cases += 1;
                tally.record(effect);
            }
        }

        Ok(MutationStatistics::normalise(study_ids, sequenced_cases, accumulated))
    }

    /// Gene with the highest missense case fraction for the disease.
    pub async fn get_top_mutation(&self, disease: &str) -> Result<Option<TopMutation>> {
        let stats = self.get_mutation_statistics(disease, &MutationType::Missense).await?;
        let top = stats.top();
        if top.is_none() {
            warn!(disease, "No mutation statistics");
        }
        Ok(top)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
