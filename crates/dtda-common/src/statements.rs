//! Typed statement records returned by the statement database.
//!
//! Two shapes are needed: two-agent relations (`Inhibition`, `Activation`, …)
//! and active-form assertions about a single agent in a given state.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::{Agent, AminoAcidChange, Namespace};

// ---------------------------------------------------------------------------
// Statement type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementType {
    Inhibition,
    Activation,
    Phosphorylation,
    Dephosphorylation,
    ActiveForm,
    Complex,
    IncreaseAmount,
    DecreaseAmount,
    Other(String),
}

impl StatementType {
    pub fn from_name(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "inhibition"        => StatementType::Inhibition,
            "activation"        => StatementType::Activation,
            "phosphorylation"   => StatementType::Phosphorylation,
            "dephosphorylation" => StatementType::Dephosphorylation,
            "activeform"        => StatementType::ActiveForm,
            "complex"           => StatementType::Complex,
            "increaseamount"    => StatementType::IncreaseAmount,
            "decreaseamount"    => StatementType::DecreaseAmount,
            _                   => StatementType::Other(s.trim().to_string()),
        }
    }

    /// Class name used by the statement database.
    pub fn as_str(&self) -> &str {
        match self {
            StatementType::Inhibition        => "Inhibition",
            StatementType::Activation        => "Activation",
            StatementType::Phosphorylation   => "Phosphorylation",
            StatementType::Dephosphorylation => "Dephosphorylation",
            StatementType::ActiveForm        => "ActiveForm",
            StatementType::Complex           => "Complex",
            StatementType::IncreaseAmount    => "IncreaseAmount",
            StatementType::DecreaseAmount    => "DecreaseAmount",
            StatementType::Other(s)          => s.as_str(),
        }
    }
}

impl fmt::Display for StatementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evidence {
    /// Reader or curated database that produced the evidence, e.g. "tas".
    pub source_api: String,
    pub pmid: Option<String>,
    pub text: Option<String>,
}

impl Evidence {
    pub fn from_source(source_api: impl Into<String>) -> Self {
        Self { source_api: source_api.into(), pmid: None, text: None }
    }
}

// ---------------------------------------------------------------------------
// Relation statements
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationStatement {
    pub statement_type: StatementType,
    pub subject: Agent,
    pub object: Agent,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

impl RelationStatement {
    pub fn has_evidence_from(&self, source_api: &str) -> bool {
        self.evidence.iter().any(|ev| ev.source_api == source_api)
    }
}

// ---------------------------------------------------------------------------
// Agent state conditions
// ---------------------------------------------------------------------------

/// A point mutation carried by an agent. Fields are kept as reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutCondition {
    pub position: Option<String>,
    pub residue_from: Option<String>,
    pub residue_to: Option<String>,
}

impl MutCondition {
    pub fn new(residue_from: &str, position: &str, residue_to: &str) -> Self {
        Self {
            position: Some(position.to_string()),
            residue_from: Some(residue_from.to_string()),
            residue_to: Some(residue_to.to_string()),
        }
    }

    /// Exact residue/position/residue equality with a parsed substitution.
    pub fn matches(&self, change: &AminoAcidChange) -> bool {
        let same_residue = |reported: &Option<String>, wanted: char| {
            let mut chars = reported.as_deref().unwrap_or("").trim().chars();
            chars.next() == Some(wanted) && chars.next().is_none()
        };
        let same_position = self
            .position
            .as_deref()
            .and_then(|p| p.trim().parse::<u32>().ok())
            == Some(change.position);

        same_position
            && same_residue(&self.residue_from, change.wild_type)
            && same_residue(&self.residue_to, change.substitute)
    }
}

/// A post-translational modification carried by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModCondition {
    pub mod_type: String,
    pub residue: Option<String>,
    pub position: Option<String>,
    pub is_modified: bool,
}

impl ModCondition {
    pub fn new(mod_type: &str, residue: Option<&str>, position: Option<&str>) -> Self {
        Self {
            mod_type: mod_type.to_string(),
            residue: residue.map(String::from),
            position: position.map(String::from),
            is_modified: true,
        }
    }
}

/// An agent together with the state it is asserted to be in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub name: String,
    #[serde(default)]
    pub db_refs: BTreeMap<Namespace, String>,
    #[serde(default)]
    pub mutations: Vec<MutCondition>,
    #[serde(default)]
    pub mods: Vec<ModCondition>,
}

impl AgentState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_refs: BTreeMap::new(),
            mutations: Vec::new(),
            mods: Vec::new(),
        }
    }

    pub fn with_mutation(mut self, mutation: MutCondition) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn with_mod(mut self, modification: ModCondition) -> Self {
        self.mods.push(modification);
        self
    }
}

// ---------------------------------------------------------------------------
// Active form assertion
// ---------------------------------------------------------------------------

/// "Agent in this state is (not) active."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveFormAssertion {
    pub agent: AgentState,
    pub activity: String,
    pub is_active: bool,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

impl ActiveFormAssertion {
    pub fn new(agent: AgentState, is_active: bool) -> Self {
        Self { agent, activity: "activity".to_string(), is_active, evidence: Vec::new() }
    }

    /// The agent's mutation, when it carries exactly one.
    pub fn single_mutation(&self) -> Option<&MutCondition> {
        match self.agent.mutations.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Content key ignoring evidence; two assertions with the same key say
    /// the same thing.
    pub fn matches_key(&self) -> String {
        let mods: Vec<String> = self
            .agent
            .mods
            .iter()
            .map(|m| {
                format!(
                    "{}:{}:{}:{}",
                    m.mod_type,
                    m.residue.as_deref().unwrap_or(""),
                    m.position.as_deref().unwrap_or(""),
                    m.is_modified
                )
            })
            .collect();
        let muts: Vec<String> = self
            .agent
            .mutations
            .iter()
            .map(|m| {
                format!(
                    "{}{}{}",
                    m.residue_from.as_deref().unwrap_or(""),
                    m.position.as_deref().unwrap_or(""),
                    m.residue_to.as_deref().unwrap_or("")
                )
            })
            .collect();
        format!(
            "ActiveForm({}|{}|{}|{}|{})",
            self.agent.name,
            mods.join(","),
            muts.join(","),
            self.activity,
            self.is_active
        )
    }
}
