//! Mechanism lookups: does a modification switch an agent on (or off), and
//! which statements directly link two agents.

use std::collections::HashSet;
use std::sync::Arc;

use dtda_common::{
    ActiveFormAssertion, Agent, LookupKey, ModCondition, Namespace, RelationStatement, Result,
    StatementType,
};
use dtda_sources::{RelationQuery, StatementSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Activating,
    Inhibiting,
}

impl Polarity {
    pub fn from_label(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "activating" | "activate"                 => Some(Polarity::Activating),
            "inhibiting" | "inhibit" | "deactivating" => Some(Polarity::Inhibiting),
            _                                         => None,
        }
    }

    fn admits(&self, is_active: bool) -> bool {
        is_active == (*self == Polarity::Activating)
    }
}

/// Namespaces tried, in order, when one key must stand for an agent.
const KEY_PRIORITY: &[Namespace] = &[Namespace::Hgnc, Namespace::Fplx, Namespace::Chebi, Namespace::Text];

/// Most specific grounding of `agent`, falling back to its name as text.
pub fn best_lookup_key(agent: &Agent) -> LookupKey {
    KEY_PRIORITY
        .iter()
        .find_map(|ns| agent.db_ref(ns).map(|id| LookupKey::new(id, ns.clone())))
        .unwrap_or_else(|| LookupKey::text(agent.name.clone()))
}

fn mod_matches(m: &ModCondition, wanted: &ModCondition) -> bool {
    m.mod_type.eq_ignore_ascii_case(&wanted.mod_type)
        && m.residue == wanted.residue
        && m.position == wanted.position
}

pub struct MechanismFinder {
    source: Arc<dyn StatementSource>,
}

impl MechanismFinder {
    pub fn new(source: Arc<dyn StatementSource>) -> Self {
        Self { source }
    }

    /// Active-form assertions stating that `agent` carrying `modification`
    /// is active (or inactive, per `polarity`). Queried once per grounding;
    /// duplicates across groundings are dropped. Empty means no mechanism
    /// is known.
    #[instrument(skip(self, agent, modification), fields(agent = %agent.name))]
    pub async fn find_modification_activity(
        &self,
        agent: &Agent,
        modification: &ModCondition,
        polarity: Polarity,
    ) -> Result<Vec<ActiveFormAssertion>> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for key in agent.grounding_keys() {
            let term = key.to_query_term();
            debug!(term = %term, "Checking namespace");
            for af in self.source.query_active_forms(&term).await? {
                let hit = polarity.admits(af.is_active)
                    && af.agent.mods.iter().any(|m| mod_matches(m, modification));
                if hit && seen.insert(af.matches_key()) {
                    found.push(af);
                }
            }
        }

        info!(n = found.len(), "Found matching active forms");
        Ok(found)
    }

    /// Statements between `subject` and `object` (either may be open) of the
    /// given type, or of any type when `statement_type` is `None`.
    #[instrument(skip(self, subject, object))]
    pub async fn find_immediate_relations(
        &self,
        subject: Option<&Agent>,
        object: Option<&Agent>,
        statement_type: Option<StatementType>,
    ) -> Result<Vec<RelationStatement>> {
        let query = RelationQuery {
            subject: subject.map(best_lookup_key),
            object: object.map(best_lookup_key),
            statement_type,
            evidence_source: None,
        };
        info!(query = %query.describe(), "Looking up immediate relations");
        self.source.query_relations(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtda_common::{AgentState, Evidence};
    use dtda_sources::MockStatementSource;

    fn map2k1_phospho(residue: &str, position: &str, is_active: bool) -> ActiveFormAssertion {
        let mut state = AgentState::new("MAP2K1")
            .with_mod(ModCondition::new("phosphorylation", Some(residue), Some(position)));
        state.db_refs.insert(Namespace::Hgnc, "6840".to_string());
        state.db_refs.insert(Namespace::Uniprot, "Q02750".to_string());
        ActiveFormAssertion::new(state, is_active)
    }

    fn map2k1() -> Agent {
        Agent::new("MAP2K1")
            .with_ref(Namespace::Hgnc, "6840")
            .with_ref(Namespace::Uniprot, "Q02750")
    }

    #[test]
    fn test_best_key_priority() {
        let agent = Agent::new("RAS")
            .with_ref(Namespace::Text, "Ras")
            .with_ref(Namespace::Fplx, "RAS");
        assert_eq!(best_lookup_key(&agent), LookupKey::new("RAS", Namespace::Fplx));

        let agent = agent.with_ref(Namespace::Hgnc, "9967");
        assert_eq!(best_lookup_key(&agent), LookupKey::new("9967", Namespace::Hgnc));

        assert_eq!(best_lookup_key(&Agent::new("ERK")), LookupKey::text("ERK"));
    }

    #[test]
    fn test_polarity_labels() {
        assert_eq!(Polarity::from_label("ACTIVATING"), Some(Polarity::Activating));
        assert_eq!(Polarity::from_label("inhibiting"), Some(Polarity::Inhibiting));
        assert_eq!(Polarity::from_label("sideways"), None);
    }

    #[tokio::test]
    async fn test_modification_activity_dedups_across_groundings() {
        let source = Arc::new(
            MockStatementSource::new()
                .with_active_form(map2k1_phospho("S", "218", true))
                .with_active_form(map2k1_phospho("S", "222", true))
                .with_active_form(map2k1_phospho("S", "218", false)),
        );
        let finder = MechanismFinder::new(source.clone());

        let wanted = ModCondition::new("phosphorylation", Some("S"), Some("218"));
        let found = finder
            .find_modification_activity(&map2k1(), &wanted, Polarity::Activating)
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert!(found[0].is_active);
        assert_eq!(source.active_form_calls(), 2);
    }

    #[tokio::test]
    async fn test_modification_activity_missing_mechanism() {
        let source = Arc::new(MockStatementSource::new().with_active_form(map2k1_phospho("S", "218", true)));
        let finder = MechanismFinder::new(source);

        let wanted = ModCondition::new("ubiquitination", Some("K"), Some("104"));
        let found = finder
            .find_modification_activity(&map2k1(), &wanted, Polarity::Activating)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_immediate_relations_any_type_no_evidence_filter() {
        let braf = Agent::new("BRAF").with_ref(Namespace::Hgnc, "1097");
        let stmt = |t: StatementType, src: &str| RelationStatement {
            statement_type: t,
            subject: braf.clone(),
            object: map2k1(),
            evidence: vec![Evidence::from_source(src)],
        };
        let source = Arc::new(
            MockStatementSource::new()
                .with_relation(stmt(StatementType::Phosphorylation, "reach"))
                .with_relation(stmt(StatementType::Activation, "signor")),
        );
        let finder = MechanismFinder::new(source.clone());

        let all = finder.find_immediate_relations(Some(&braf), Some(&map2k1()), None).await.unwrap();
        assert_eq!(all.len(), 2);

        let phospho = finder
            .find_immediate_relations(Some(&braf), None, Some(StatementType::Phosphorylation))
            .await
            .unwrap();
        assert_eq!(phospho.len(), 1);

        let seen = source.seen_queries();
        assert_eq!(seen[0].subject, Some(LookupKey::new("1097", Namespace::Hgnc)));
        assert_eq!(seen[0].evidence_source, None);
    }
}
