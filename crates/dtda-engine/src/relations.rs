//! Memoised drug ↔ target resolution.
//!
//! Two caches are kept because they record different things: a key present
//! in `drug_targets` means *all* targets of that drug alias are known, while
//! a drug showing up as a value of `target_drugs` says nothing about its
//! other targets.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use dtda_common::{
    Agent, DrugRef, DtdaError, LookupKey, Namespace, RelationStatement, Result, StatementType,
};
use dtda_sources::{RelationQuery, StatementSource};
use tracing::{debug, error, info, instrument};

use crate::cache::ResultCache;
use crate::terms::extract_terms;

pub type TargetDrugCache = Arc<dyn ResultCache<LookupKey, BTreeSet<DrugRef>>>;
pub type DrugTargetCache = Arc<dyn ResultCache<LookupKey, BTreeSet<String>>>;

pub struct RelationResolver {
    source: Arc<dyn StatementSource>,
    target_drugs: TargetDrugCache,
    drug_targets: DrugTargetCache,
    timeout: Duration,
    evidence_source: String,
}

impl RelationResolver {
    pub fn new(
        source: Arc<dyn StatementSource>,
        target_drugs: TargetDrugCache,
        drug_targets: DrugTargetCache,
        timeout: Duration,
        evidence_source: impl Into<String>,
    ) -> Self {
        Self { source, target_drugs, drug_targets, timeout, evidence_source: evidence_source.into() }
    }

    /// Drugs inhibiting `target`, each with its PubChem CID when grounded.
    ///
    /// Targets without an HGNC id yield an empty set. A timeout yields an
    /// empty set for this call and leaves the cache untouched.
    #[instrument(skip(self, target), fields(target = %target.name))]
    pub async fn find_target_drugs(&self, target: &Agent) -> Result<BTreeSet<DrugRef>> {
        let Some(hgnc) = target.hgnc_id() else {
            debug!("Target has no HGNC grounding");
            return Ok(BTreeSet::new());
        };
        let key = LookupKey::new(hgnc, Namespace::Hgnc);

        if let Some(drugs) = self.target_drugs.get(&key) {
            debug!(%key, n = drugs.len(), "Target drugs served from cache");
            return Ok(drugs);
        }

        let query = self.inhibition_query().object(key.clone());
        let stmts = match self.query(&query).await {
            Ok(stmts) => stmts,
            Err(e) if e.is_timeout() => return Ok(BTreeSet::new()),
            Err(e) => return Err(e),
        };

        let drugs: BTreeSet<DrugRef> = stmts
            .iter()
            .map(|s| DrugRef {
                name: s.subject.name.clone(),
                pubchem_id: s.subject.db_ref(&Namespace::Pubchem).map(String::from),
            })
            .collect();
        info!(%key, n_drugs = drugs.len(), "Resolved target drugs");
        self.target_drugs.insert(key, drugs.clone());
        Ok(drugs)
    }

    /// Names of all targets of `drug`, unioned over every alias key.
    ///
    /// Keys that time out are skipped and stay uncached.
    #[instrument(skip(self, drug), fields(drug = %drug.name))]
    pub async fn find_drug_targets(&self, drug: &Agent) -> Result<BTreeSet<String>> {
        let mut all_targets = BTreeSet::new();

        for key in extract_terms(drug)? {
            let targets = match self.drug_targets.get(&key) {
                Some(cached) => cached,
                None => {
                    let query = self.inhibition_query().subject(key.clone());
                    let stmts = match self.query(&query).await {
                        Ok(stmts) => stmts,
                        Err(e) if e.is_timeout() => continue,
                        Err(e) => return Err(e),
                    };
                    let targets: BTreeSet<String> = stmts.into_iter().map(|s| s.object.name).collect();
                    self.drug_targets.insert(key.clone(), targets.clone());
                    targets
                }
            };
            debug!(%key, n = targets.len(), "Drug alias resolved");
            all_targets.extend(targets);
        }

        Ok(all_targets)
    }

    /// Whether `target` is among the known targets of `drug`.
    ///
    /// An empty target set is reported as `DrugNotFound`, whether the drug
    /// is unknown or merely has no recorded targets.
    pub async fn is_nominal_drug_target(&self, drug: &Agent, target: &Agent) -> Result<bool> {
        let targets = self.find_drug_targets(drug).await?;
        if targets.is_empty() {
            return Err(DtdaError::DrugNotFound(drug.name.clone()));
        }
        Ok(targets.contains(&target.name))
    }

    fn inhibition_query(&self) -> RelationQuery {
        RelationQuery::new()
            .of_type(StatementType::Inhibition)
            .evidence_from(self.evidence_source.as_str())
    }

    /// One bounded relation query. Elapsed time becomes `DatabaseTimeout`.
    async fn query(&self, query: &RelationQuery) -> Result<Vec<RelationStatement>> {
        match tokio::time::timeout(self.timeout, self.source.query_relations(query)).await {
            Ok(Ok(stmts)) => Ok(stmts),
            Ok(Err(e)) => {
                if e.is_timeout() {
                    error!(query = %query.describe(), "{}", e);
                }
                Err(e)
            }
            Err(_) => {
                let err = DtdaError::DatabaseTimeout {
                    query: query.describe(),
                    timeout_secs: self.timeout.as_secs(),
                };
                error!("{}", err);
                Err(err)
            }
        }
    }

    pub fn cached_target_keys(&self) -> usize {
        self.target_drugs.len()
    }

    pub fn cached_drug_keys(&self) -> usize {
        self.drug_targets.len()
    }

    pub fn is_drug_key_cached(&self, key: &LookupKey) -> bool {
        self.drug_targets.contains(key)
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
