//! `Dtda`: one handle over the resolvers, sharing the statement source and
//! owning the caches for the life of the engine.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use dtda_common::{
    ActiveFormAssertion, Agent, DrugRef, ModCondition, MutationEffect, MutationType,
    RelationStatement, Result, StatementType,
};
use dtda_sources::{DiseaseStudyMap, StatementSource, StudySource};

use crate::cache::build_cache;
use crate::mechanisms::{MechanismFinder, Polarity};
use crate::mutation_effect::MutationMatcher;
use crate::relations::RelationResolver;
use crate::statistics::{DiseaseMutationAggregator, MutationStatistics, TopMutation};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound on each drug/target relation query.
    pub relation_timeout: Duration,
    /// Evidence channel a drug/target statement must cite.
    pub evidence_source: String,
    /// `None` keeps every entry.
    pub relation_cache_capacity: Option<usize>,
    pub active_form_cache_capacity: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            relation_timeout: Duration::from_secs(10),
            evidence_source: "tas".to_string(),
            relation_cache_capacity: None,
            active_form_cache_capacity: None,
        }
    }
}

pub struct Dtda {
    relations: RelationResolver,
    matcher: Arc<MutationMatcher>,
    aggregator: DiseaseMutationAggregator,
    mechanisms: MechanismFinder,
}

impl Dtda {
    pub fn new(
        statements: Arc<dyn StatementSource>,
        studies: Arc<dyn StudySource>,
        disease_map: Arc<DiseaseStudyMap>,
        config: EngineConfig,
    ) -> Self {
        let relations = RelationResolver::new(
            Arc::clone(&statements),
            build_cache(config.relation_cache_capacity),
            build_cache(config.relation_cache_capacity),
            config.relation_timeout,
            config.evidence_source,
        );
        let matcher = Arc::new(MutationMatcher::new(
            Arc::clone(&statements),
            build_cache(config.active_form_cache_capacity),
        ));
        let aggregator = DiseaseMutationAggregator::new(studies, disease_map, Arc::clone(&matcher));
        let mechanisms = MechanismFinder::new(statements);

        Self { relations, matcher, aggregator, mechanisms }
    }

    /// Replace the default pathway gene panel used for mutation statistics.
    pub fn with_gene_panel(mut self, genes: Vec<String>) -> Self {
        self.aggregator = self.aggregator.with_gene_panel(genes);
        self
    }

    pub async fn find_target_drugs(&self, target: &Agent) -> Result<BTreeSet<DrugRef>> {
        self.relations.find_target_drugs(target).await
    }

    pub async fn find_drug_targets(&self, drug: &Agent) -> Result<BTreeSet<String>> {
        self.relations.find_drug_targets(drug).await
    }

    pub async fn is_nominal_drug_target(&self, drug: &Agent, target: &Agent) -> Result<bool> {
        self.relations.is_nominal_drug_target(drug, target).await
    }

    pub async fn find_mutation_effect(
        &self,
        protein_name: &str,
        amino_acid_change: &str,
    ) -> Result<Option<MutationEffect>> {
        self.matcher.find_mutation_effect(protein_name, amino_acid_change).await
    }

    pub async fn get_mutation_statistics(
        &self,
        disease: &str,
        mutation_type: &MutationType,
    ) -> Result<MutationStatistics> {
        self.aggregator.get_mutation_statistics(disease, mutation_type).await
    }

    pub async fn get_top_mutation(&self, disease: &str) -> Result<Option<TopMutation>> {
        self.aggregator.get_top_mutation(disease).await
    }

    pub async fn find_modification_activity(
        &self,
        agent: &Agent,
        modification: &ModCondition,
        polarity: Polarity,
    ) -> Result<Vec<ActiveFormAssertion>> {
        self.mechanisms.find_modification_activity(agent, modification, polarity).await
    }

    pub async fn find_immediate_relations(
        &self,
        subject: Option<&Agent>,
        object: Option<&Agent>,
        statement_type: Option<StatementType>,
    ) -> Result<Vec<RelationStatement>> {
        self.mechanisms.find_immediate_relations(subject, object, statement_type).await
    }

    pub fn relations(&self) -> &RelationResolver {
        &self.relations
    }

    pub fn matcher(&self) -> &MutationMatcher {
        &self.matcher
    }
}
