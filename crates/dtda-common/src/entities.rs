/// Entity references, lookup keys and mutation descriptors shared by the
/// statement and study sources and the query engine.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Namespace
// ---------------------------------------------------------------------------

/// Grounding namespace of an external identifier.
///
/// Tags are parsed case-insensitively and legacy aliases are folded into the
/// canonical variant here, so the rest of the workspace never compares raw
/// namespace strings. Unrecognised tags are kept (upper-cased) in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Namespace {
    Hgnc,
    Fplx,
    Chebi,
    Pubchem,
    Chembl,
    Uniprot,
    Mesh,
    Drugbank,
    HmsLincs,
    Lincs,
    Text,
    Other(String),
}

impl Namespace {
    /// Parse a namespace tag, folding aliases (`BE` → `FPLX`, `UNIPROT` → `UP`).
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_uppercase().as_str() {
            "HGNC"                    => Namespace::Hgnc,
            "FPLX" | "BE"             => Namespace::Fplx,
            "CHEBI"                   => Namespace::Chebi,
            "PUBCHEM"                 => Namespace::Pubchem,
            "CHEMBL"                  => Namespace::Chembl,
            "UP" | "UNIPROT"          => Namespace::Uniprot,
            "MESH"                    => Namespace::Mesh,
            "DRUGBANK"                => Namespace::Drugbank,
            "HMS-LINCS" | "HMSLINCS"  => Namespace::HmsLincs,
            "LINCS"                   => Namespace::Lincs,
            "TEXT"                    => Namespace::Text,
            other                     => Namespace::Other(other.to_string()),
        }
    }

    /// Canonical tag used in `id@NS` query terms.
    pub fn as_str(&self) -> &str {
        match self {
            Namespace::Hgnc      => "HGNC",
            Namespace::Fplx      => "FPLX",
            Namespace::Chebi     => "CHEBI",
            Namespace::Pubchem   => "PUBCHEM",
            Namespace::Chembl    => "CHEMBL",
            Namespace::Uniprot   => "UP",
            Namespace::Mesh      => "MESH",
            Namespace::Drugbank  => "DRUGBANK",
            Namespace::HmsLincs  => "HMS-LINCS",
            Namespace::Lincs     => "LINCS",
            Namespace::Text      => "TEXT",
            Namespace::Other(s)  => s.as_str(),
        }
    }
}

impl From<String> for Namespace {
    fn from(tag: String) -> Self {
        Namespace::from_tag(&tag)
    }
}

impl From<Namespace> for String {
    fn from(ns: Namespace) -> Self {
        ns.as_str().to_string()
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Agent (entity reference)
// ---------------------------------------------------------------------------

/// A named biological entity (gene, protein family, drug) with its groundings.
/// At most one identifier per namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub name: String,
    #[serde(default)]
    pub db_refs: BTreeMap<Namespace, String>,
}

impl Agent {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), db_refs: BTreeMap::new() }
    }

    /// Add (or replace) the identifier for a namespace.
    pub fn with_ref(mut self, namespace: Namespace, id: impl Into<String>) -> Self {
        self.db_refs.insert(namespace, id.into());
        self
    }

    pub fn db_ref(&self, namespace: &Namespace) -> Option<&str> {
        self.db_refs.get(namespace).map(String::as_str)
    }

    pub fn hgnc_id(&self) -> Option<&str> {
        self.db_ref(&Namespace::Hgnc)
    }

    /// One lookup key per grounding the agent already carries.
    pub fn grounding_keys(&self) -> impl Iterator<Item = LookupKey> + '_ {
        self.db_refs
            .iter()
            .map(|(ns, id)| LookupKey::new(id.clone(), ns.clone()))
    }
}

// ---------------------------------------------------------------------------
// Lookup key
// ---------------------------------------------------------------------------

/// (identifier, namespace) pair used both as a cache key and as a query term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LookupKey {
    pub id: String,
    pub namespace: Namespace,
}

impl LookupKey {
    pub fn new(id: impl Into<String>, namespace: Namespace) -> Self {
        Self { id: id.into(), namespace }
    }

    /// Free-text key.
    pub fn text(id: impl Into<String>) -> Self {
        Self::new(id, Namespace::Text)
    }

    /// `id@NS` form understood by the statement database.
    pub fn to_query_term(&self) -> String {
        format!("{}@{}", self.id, self.namespace)
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.namespace)
    }
}

// ---------------------------------------------------------------------------
// Drug reference
// ---------------------------------------------------------------------------

/// A drug found to inhibit a target: display name and PubChem CID if grounded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DrugRef {
    pub name: String,
    pub pubchem_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Amino acid substitution
// ---------------------------------------------------------------------------

fn substitution_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Prefix match: trailing text after the substituted residue is ignored.
    RE.get_or_init(|| Regex::new(r"^([A-Z])([0-9]+)([A-Z])").expect("valid substitution regex"))
}

/// Single-residue substitution in compact notation, e.g. `V600E`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AminoAcidChange {
    pub wild_type: char,
    pub position: u32,
    pub substitute: char,
}

impl AminoAcidChange {
    /// Parse `<letter><digits><letter>`.
    ///
    /// Returns `None` for anything else (in-frame deletions, frameshifts,
    /// splice notations); those are expected inputs, not errors.
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = substitution_regex().captures(raw)?;
        let wild_type = caps.get(1)?.as_str().chars().next()?;
        let position: u32 = caps.get(2)?.as_str().parse().ok()?;
        let substitute = caps.get(3)?.as_str().chars().next()?;
        Some(Self { wild_type, position, substitute })
    }
}

impl fmt::Display for AminoAcidChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.wild_type, self.position, self.substitute)
    }
}

// ---------------------------------------------------------------------------
// Mutation effect / type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationEffect {
    Activate,
    Deactivate,
}

impl MutationEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationEffect::Activate   => "activate",
            MutationEffect::Deactivate => "deactivate",
        }
    }
}

/// Mutation classes as reported by the study source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationType {
    Missense,
    Nonsense,
    Frameshift,
    InFrameDeletion,
    InFrameInsertion,
    SpliceSite,
    Synonymous,
    Unknown,
}

impl MutationType {
    /// Accepts both short labels (`missense`) and cBioPortal MAF classes
    /// (`Missense_Mutation`, `Frame_Shift_Del`).
    pub fn from_label(s: &str) -> Self {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "missense" | "missense_mutation"                       => MutationType::Missense,
            "nonsense" | "nonsense_mutation" | "nonstop_mutation"  => MutationType::Nonsense,
            "frameshift" | "frame_shift_del" | "frame_shift_ins"   => MutationType::Frameshift,
            "inframe_deletion" | "in_frame_del"                    => MutationType::InFrameDeletion,
            "inframe_insertion" | "in_frame_ins"                   => MutationType::InFrameInsertion,
            "splice_site" | "splice_region"                        => MutationType::SpliceSite,
            "synonymous" | "silent"                                => MutationType::Synonymous,
            _                                                      => MutationType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MutationType::Missense         => "missense",
            MutationType::Nonsense         => "nonsense",
            MutationType::Frameshift       => "frameshift",
            MutationType::InFrameDeletion  => "inframe_deletion",
            MutationType::InFrameInsertion => "inframe_insertion",
            MutationType::SpliceSite       => "splice_site",
            MutationType::Synonymous       => "synonymous",
            MutationType::Unknown          => "unknown",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
