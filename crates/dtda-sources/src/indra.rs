//! INDRA DB REST client.
//!
//! The INDRA database aggregates mechanistic statements (Inhibition,
//! Activation, ActiveForm, …) extracted by text-mining readers and imported
//! from curated resources such as the Target Affinity Spectrum (`tas`).
//!
//! Endpoint: `{base}/statements/from_agents`
//!
//! Statements arrive as INDRA JSON keyed by statement hash, one page at a
//! time (`offset` / `next_offset`); they are decoded here into the typed
//! records from `dtda_common::statements`.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use dtda_common::sandbox::SandboxClient;
use dtda_common::{
    ActiveFormAssertion, Agent, AgentState, DtdaError, Evidence, ModCondition, MutCondition,
    Namespace, RelationStatement, Result, StatementType,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::statements::{RelationQuery, StatementSource};

pub const INDRA_DB_URL: &str = "https://db.indra.bio";

const SERVICE: &str = "INDRA DB";

/// INDRA DB REST client.
pub struct IndraDbClient {
    client: SandboxClient,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl IndraDbClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = SandboxClient::for_base_urls(&[base_url], timeout)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }

    /// Fetch every page of a `from_agents` query and return the raw statement objects.
    async fn fetch_statements(&self, params: Vec<(&str, String)>, what: &str) -> Result<Vec<Value>> {
        let params = &params;
        collect_pages(move |offset| self.fetch_page(params, offset, what)).await
    }

    async fn fetch_page(&self, params: &[(&str, String)], offset: u64, what: &str) -> Result<StatementsPage> {
        let url = format!("{}/statements/from_agents", self.base_url);
        let mut query = params.to_vec();
        query.push(("format", "json".to_string()));
        query.push(("ev_limit", "10".to_string()));
        if offset > 0 {
            query.push(("offset", offset.to_string()));
        }
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.clone()));
        }

        let resp = self
            .client
            .get(&url)?
            .query(&query)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, what))?;

        let status = resp.status();
        if status == reqwest::StatusCode::GATEWAY_TIMEOUT {
            return Err(self.timeout_error(what));
        }
        if !status.is_success() {
            return Err(DtdaError::Upstream { service: SERVICE, status: status.as_u16() });
        }

        let page: StatementsPage = resp.json().await.map_err(|e| self.map_transport_error(e, what))?;
        debug!(offset, n = page.statements.len(), next_offset = ?page.next_offset, "Statement page fetched");
        Ok(page)
    }

    /// The request URL carries the API key, so it is stripped from transport errors.
    fn map_transport_error(&self, err: reqwest::Error, what: &str) -> DtdaError {
        if err.is_timeout() {
            self.timeout_error(what)
        } else {
            DtdaError::Http(err.without_url())
        }
    }

    fn timeout_error(&self, what: &str) -> DtdaError {
        let err = DtdaError::DatabaseTimeout {
            query: what.to_string(),
            timeout_secs: self.timeout.as_secs(),
        };
        warn!("{}", err);
        err
    }
}

#[async_trait]
impl StatementSource for IndraDbClient {
    #[instrument(skip(self))]
    async fn query_relations(&self, query: &RelationQuery) -> Result<Vec<RelationStatement>> {
        let mut params = Vec::new();
        if let Some(subject) = &query.subject {
            params.push(("subject", subject.to_query_term()));
        }
        if let Some(object) = &query.object {
            params.push(("object", object.to_query_term()));
        }
        if let Some(t) = &query.statement_type {
            params.push(("type", t.as_str().to_string()));
        }

        let raw = self.fetch_statements(params, &query.describe()).await?;
        let n_raw = raw.len();
        let statements: Vec<RelationStatement> = raw
            .iter()
            .filter_map(parse_relation)
            .filter(|s| query.admits(s))
            .collect();

        debug!(query = %query.describe(), n_raw, n_kept = statements.len(), "Relation query answered");
        Ok(statements)
    }

    #[instrument(skip(self))]
    async fn query_active_forms(&self, agent_term: &str) -> Result<Vec<ActiveFormAssertion>> {
        let params = vec![
            ("agent0", agent_term.to_string()),
            ("type", StatementType::ActiveForm.as_str().to_string()),
        ];
        let what = format!("{} ActiveForm", agent_term);
        let raw = self.fetch_statements(params, &what).await?;
        let assertions: Vec<ActiveFormAssertion> = raw.iter().filter_map(parse_active_form).collect();

        debug!(agent = agent_term, n = assertions.len(), "Active forms fetched");
        Ok(assertions)
    }
}

// ── INDRA JSON decoding ─────────────────────────────────────────────────────

/// One page of a statement query. Statements are keyed by hash.
#[derive(Debug, Default, Deserialize)]
struct StatementsPage {
    #[serde(default)]
    statements: serde_json::Map<String, Value>,
    next_offset: Option<u64>,
    statement_limit: Option<u64>,
}

impl StatementsPage {
    /// Offset of the following page; `None` once a short or empty page arrives.
    fn next(&self, requested: u64) -> Option<u64> {
        let n = self.statements.len() as u64;
        if n == 0 || self.statement_limit.is_some_and(|limit| n < limit) {
            return None;
        }
        let next = self
            .next_offset
            .or_else(|| self.statement_limit.map(|_| requested + n))?;
        (next > requested).then_some(next)
    }
}

const MAX_PAGES: usize = 100;

/// Follow the paging of a statement query, keeping the first copy of each hash.
async fn collect_pages<F, Fut>(mut fetch_page: F) -> Result<Vec<Value>>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<StatementsPage>>,
{
    let mut seen = HashSet::new();
    let mut statements = Vec::new();
    let mut offset = 0;
    for _ in 0..MAX_PAGES {
        let page = fetch_page(offset).await?;
        let next = page.next(offset);
        for (hash, stmt) in page.statements {
            if seen.insert(hash) {
                statements.push(stmt);
            }
        }
        match next {
            Some(next) => offset = next,
            None => return Ok(statements),
        }
    }
    warn!(max_pages = MAX_PAGES, n = statements.len(), "Statement paging stopped at page cap");
    Ok(statements)
}

#[derive(Debug, Deserialize)]
struct WireAgent {
    name: String,
    #[serde(default)]
    db_refs: BTreeMap<String, Value>,
    #[serde(default)]
    mutations: Vec<WireMutation>,
    #[serde(default)]
    mods: Vec<WireMod>,
}

#[derive(Debug, Deserialize)]
struct WireMutation {
    position: Option<Value>,
    residue_from: Option<String>,
    residue_to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMod {
    mod_type: String,
    residue: Option<String>,
    position: Option<Value>,
    #[serde(default = "bool_true")]
    is_modified: bool,
}

fn bool_true() -> bool { true }

#[derive(Debug, Deserialize)]
struct WireEvidence {
    #[serde(default)]
    source_api: String,
    pmid: Option<String>,
    text: Option<String>,
}

/// Scalars in INDRA JSON are sometimes numbers, sometimes strings.
fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn db_refs_from_wire(raw: &BTreeMap<String, Value>) -> BTreeMap<Namespace, String> {
    raw.iter()
        .filter_map(|(ns, id)| Some((Namespace::from_tag(ns), scalar_to_string(id)?)))
        .collect()
}

fn agent_from_wire(v: &Value) -> Option<WireAgent> {
    serde_json::from_value(v.clone()).ok()
}

fn into_agent(w: WireAgent) -> Agent {
    Agent { name: w.name, db_refs: db_refs_from_wire(&w.db_refs) }
}

fn evidence_from_wire(stmt: &Value) -> Vec<Evidence> {
    stmt.get("evidence")
        .and_then(|ev| serde_json::from_value::<Vec<WireEvidence>>(ev.clone()).ok())
        .unwrap_or_default()
        .into_iter()
        .map(|e| Evidence { source_api: e.source_api, pmid: e.pmid, text: e.text })
        .collect()
}

/// Decode a two-agent statement. Agent roles differ by statement class
/// (`subj`/`obj`, `enz`/`sub`, two-member `Complex`); anything else is skipped.
pub(crate) fn parse_relation(stmt: &Value) -> Option<RelationStatement> {
    let statement_type = StatementType::from_name(stmt.get("type")?.as_str()?);

    let (subject, object) = if let Some(members) = stmt.get("members").and_then(Value::as_array) {
        match members.as_slice() {
            [a, b] => (agent_from_wire(a)?, agent_from_wire(b)?),
            _ => return None,
        }
    } else {
        let subj = stmt.get("subj").or_else(|| stmt.get("enz"))?;
        let obj = stmt.get("obj").or_else(|| stmt.get("sub"))?;
        (agent_from_wire(subj)?, agent_from_wire(obj)?)
    };

    Some(RelationStatement {
        statement_type,
        subject: into_agent(subject),
        object: into_agent(object),
        evidence: evidence_from_wire(stmt),
    })
}

/// Decode an `ActiveForm` statement.
pub(crate) fn parse_active_form(stmt: &Value) -> Option<ActiveFormAssertion> {
    if stmt.get("type")?.as_str()? != "ActiveForm" {
        return None;
    }
    let wire = agent_from_wire(stmt.get("agent")?)?;

    let agent = AgentState {
        name: wire.name,
        db_refs: db_refs_from_wire(&wire.db_refs),
        mutations: wire
            .mutations
            .into_iter()
            .map(|m| MutCondition {
                position: m.position.as_ref().and_then(scalar_to_string),
                residue_from: m.residue_from,
                residue_to: m.residue_to,
            })
            .collect(),
        mods: wire
            .mods
            .into_iter()
            .map(|m| ModCondition {
                mod_type: m.mod_type,
                residue: m.residue,
                position: m.position.as_ref().and_then(scalar_to_string),
                is_modified: m.is_modified,
            })
            .collect(),
    };

    Some(ActiveFormAssertion {
        agent,
        activity: stmt.get("activity").and_then(Value::as_str).unwrap_or("activity").to_string(),
        is_active: stmt.get("is_active").and_then(Value::as_bool).unwrap_or(true),
        evidence: evidence_from_wire(stmt),
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────
