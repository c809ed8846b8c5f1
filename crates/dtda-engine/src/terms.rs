//! Alternate lookup keys for an entity.

use std::collections::BTreeSet;

use dtda_common::{Agent, DtdaError, LookupKey, Result};

/// Every key worth probing the statement database with for `agent`:
/// its groundings, a hyphen-free variant of the name, and the
/// capitalised/upper/lower-case forms of the name. Duplicates collapse.
pub fn extract_terms(agent: &Agent) -> Result<BTreeSet<LookupKey>> {
    let name = agent.name.as_str();
    if name.trim().is_empty() {
        return Err(DtdaError::InvalidEntity("entity has no name".to_string()));
    }

    let mut terms: BTreeSet<LookupKey> = agent.grounding_keys().collect();

    if name.contains('-') {
        terms.insert(LookupKey::text(name.replace('-', "")));
    }

    terms.insert(LookupKey::text(capitalize(name)));
    terms.insert(LookupKey::text(name.to_uppercase()));
    terms.insert(LookupKey::text(name.to_lowercase()));

    Ok(terms)
}

/// First character upper-case, the rest lower-case.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtda_common::Namespace;
    use pretty_assertions::assert_eq;

    fn texts(terms: &BTreeSet<LookupKey>) -> Vec<String> {
        terms
            .iter()
            .filter(|k| k.namespace == Namespace::Text)
            .map(|k| k.id.clone())
            .collect()
    }

    #[test]
    fn test_name_variants_only() {
        let terms = extract_terms(&Agent::new("vemurafenib")).unwrap();
        assert_eq!(texts(&terms), vec!["VEMURAFENIB", "Vemurafenib", "vemurafenib"]);
    }

    #[test]
    fn test_size_counts_refs_and_hyphen_variant() {
        let agent = Agent::new("PLX-4032")
            .with_ref(Namespace::Chebi, "CHEBI:63637")
            .with_ref(Namespace::Pubchem, "42611257");
        let terms = extract_terms(&agent).unwrap();

        assert_eq!(terms.len(), 3 + 2 + 1);
        assert!(terms.contains(&LookupKey::text("PLX4032")));
        assert!(terms.contains(&LookupKey::text("Plx-4032")));
        assert!(terms.contains(&LookupKey::new("42611257", Namespace::Pubchem)));
    }

    #[test]
    fn test_existing_text_ref_collapses() {
        let agent = Agent::new("Imatinib").with_ref(Namespace::Text, "Imatinib");
        assert_eq!(extract_terms(&agent).unwrap().len(), 3);
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = extract_terms(&Agent::new("  ")).unwrap_err();
        assert!(matches!(err, DtdaError::InvalidEntity(_)));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("sELUMETINIB"), "Selumetinib");
        assert_eq!(capitalize("x"), "X");
        assert_eq!(capitalize(""), "");
    }
}
