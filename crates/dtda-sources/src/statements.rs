//! Trait for statement database access.
//!
//! Provides an abstraction over the biomedical statement store, allowing the
//! engine to resolve drug/target relations and active forms without being
//! coupled to the REST client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use dtda_common::{
    ActiveFormAssertion, Agent, DtdaError, LookupKey, Namespace, RelationStatement, Result,
    StatementType,
};

/// Filter for a two-agent relation lookup. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationQuery {
    pub subject: Option<LookupKey>,
    pub object: Option<LookupKey>,
    pub statement_type: Option<StatementType>,
    /// Keep only statements with at least one evidence from this source.
    pub evidence_source: Option<String>,
}

impl RelationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, key: LookupKey) -> Self {
        self.subject = Some(key);
        self
    }

    pub fn object(mut self, key: LookupKey) -> Self {
        self.object = Some(key);
        self
    }

    pub fn of_type(mut self, statement_type: StatementType) -> Self {
        self.statement_type = Some(statement_type);
        self
    }

    pub fn evidence_from(mut self, source_api: impl Into<String>) -> Self {
        self.evidence_source = Some(source_api.into());
        self
    }

    /// Apply the evidence filter.
    pub fn admits(&self, stmt: &RelationStatement) -> bool {
        match &self.evidence_source {
            Some(source) => stmt.has_evidence_from(source),
            None => true,
        }
    }

    /// Human-readable form used in log lines and timeout errors,
    /// e.g. `Imatinib@TEXT Inhibition None`.
    pub fn describe(&self) -> String {
        let term = |k: &Option<LookupKey>| {
            k.as_ref().map(LookupKey::to_query_term).unwrap_or_else(|| "None".to_string())
        };
        let verb = self
            .statement_type
            .as_ref()
            .map(|t| t.as_str().to_string())
            .unwrap_or_else(|| "any".to_string());
        format!("{} {} {}", term(&self.subject), verb, term(&self.object))
    }
}

/// Trait for accessing biomedical statements.
///
/// Implementations can use:
/// - INDRA DB REST API (remote)
/// - Mock data (testing)
///
/// Implementations report a service-side timeout as `DtdaError::DatabaseTimeout`;
/// callers may additionally bound the call with their own timer.
#[async_trait]
pub trait StatementSource: Send + Sync {
    /// Relation statements matching the query, in source order.
    async fn query_relations(&self, query: &RelationQuery) -> Result<Vec<RelationStatement>>;

    /// Active-form assertions about an agent, given as a bare name or an
    /// `id@NS` term. Returned in source order.
    async fn query_active_forms(&self, agent_term: &str) -> Result<Vec<ActiveFormAssertion>>;
}

/// True if `agent` is what `key` refers to: the grounding in that namespace,
/// or the display name for free-text keys.
pub fn agent_matches_key(agent: &Agent, key: &LookupKey) -> bool {
    if agent.db_ref(&key.namespace) == Some(key.id.as_str()) {
        return true;
    }
    key.namespace == Namespace::Text && agent.name == key.id
}

// ── Mock Implementation for Testing ────────────────────────────────────────

/// Mock statement store with scripted content, timeouts and call counting.
#[derive(Default)]
pub struct MockStatementSource {
    relations: Vec<RelationStatement>,
    active_forms: Vec<ActiveFormAssertion>,
    timeout_keys: Vec<LookupKey>,
    active_form_timeouts: Vec<String>,
    delay: Option<Duration>,
    relation_calls: AtomicUsize,
    active_form_calls: AtomicUsize,
    seen_queries: Mutex<Vec<RelationQuery>>,
}

impl MockStatementSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a relation statement.
    pub fn with_relation(mut self, stmt: RelationStatement) -> Self {
        self.relations.push(stmt);
        self
    }

    /// Add an active-form assertion.
    pub fn with_active_form(mut self, assertion: ActiveFormAssertion) -> Self {
        self.active_forms.push(assertion);
        self
    }

    /// Relation queries naming this key as subject or object time out.
    pub fn with_timeout_for(mut self, key: LookupKey) -> Self {
        self.timeout_keys.push(key);
        self
    }

    /// Active-form queries for this term time out.
    pub fn with_active_form_timeout(mut self, agent_term: &str) -> Self {
        self.active_form_timeouts.push(agent_term.to_string());
        self
    }

    /// Sleep before answering any query.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn relation_calls(&self) -> usize {
        self.relation_calls.load(Ordering::SeqCst)
    }

    pub fn active_form_calls(&self) -> usize {
        self.active_form_calls.load(Ordering::SeqCst)
    }

    /// Every relation query received, in order.
    pub fn seen_queries(&self) -> Vec<RelationQuery> {
        self.seen_queries.lock().map(|q| q.clone()).unwrap_or_default()
    }

    async fn maybe_delay(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl StatementSource for MockStatementSource {
    async fn query_relations(&self, query: &RelationQuery) -> Result<Vec<RelationStatement>> {
        self.relation_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen_queries.lock() {
            seen.push(query.clone());
        }
        self.maybe_delay().await;

        let times_out = [&query.subject, &query.object]
            .into_iter()
            .flatten()
            .any(|k| self.timeout_keys.contains(k));
        if times_out {
            return Err(DtdaError::DatabaseTimeout { query: query.describe(), timeout_secs: 10 });
        }

        Ok(self
            .relations
            .iter()
            .filter(|s| query.statement_type.as_ref().map_or(true, |t| &s.statement_type == t))
            .filter(|s| query.subject.as_ref().map_or(true, |k| agent_matches_key(&s.subject, k)))
            .filter(|s| query.object.as_ref().map_or(true, |k| agent_matches_key(&s.object, k)))
            .filter(|s| query.admits(s))
            .cloned()
            .collect())
    }

    async fn query_active_forms(&self, agent_term: &str) -> Result<Vec<ActiveFormAssertion>> {
        self.active_form_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_delay().await;

        if self.active_form_timeouts.iter().any(|t| t == agent_term) {
            return Err(DtdaError::DatabaseTimeout {
                query: format!("{} ActiveForm", agent_term),
                timeout_secs: 10,
            });
        }

        let key = match agent_term.split_once('@') {
            Some((id, ns)) => LookupKey::new(id, Namespace::from_tag(ns)),
            None => LookupKey::text(agent_term),
        };
        Ok(self
            .active_forms
            .iter()
            .filter(|af| {
                let agent = Agent { name: af.agent.name.clone(), db_refs: af.agent.db_refs.clone() };
                agent_matches_key(&agent, &key)
            })
            .cloned()
            .collect())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
