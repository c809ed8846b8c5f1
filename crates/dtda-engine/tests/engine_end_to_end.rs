//! End-to-end scenarios through the `Dtda` facade over mock sources.

use std::sync::Arc;
use std::time::Duration;

use dtda_common::{
    ActiveFormAssertion, Agent, AgentState, DtdaError, Evidence, LookupKey, ModCondition,
    MutCondition, MutationEffect, MutationType, Namespace, RelationStatement, StatementType,
};
use dtda_engine::{Dtda, EngineConfig, Polarity};
use dtda_sources::{DiseaseStudyMap, MockStatementSource, MockStudySource};
use pretty_assertions::assert_eq;

fn tas_inhibition(drug: Agent, target: Agent) -> RelationStatement {
    RelationStatement {
        statement_type: StatementType::Inhibition,
        subject: drug,
        object: target,
        evidence: vec![Evidence::from_source("tas")],
    }
}

fn selumetinib() -> Agent {
    Agent::new("selumetinib")
        .with_ref(Namespace::Chebi, "CHEBI:90227")
        .with_ref(Namespace::Pubchem, "10127622")
}

fn map2k1() -> Agent {
    Agent::new("MAP2K1").with_ref(Namespace::Hgnc, "6840")
}

fn braf() -> Agent {
    Agent::new("BRAF").with_ref(Namespace::Hgnc, "1097")
}

fn statements() -> MockStatementSource {
    let braf_v600e = ActiveFormAssertion::new(
        AgentState::new("BRAF").with_mutation(MutCondition::new("V", "600", "E")),
        true,
    );
    let mut map2k1_s218 = AgentState::new("MAP2K1")
        .with_mod(ModCondition::new("phosphorylation", Some("S"), Some("218")));
    map2k1_s218.db_refs.insert(Namespace::Hgnc, "6840".to_string());

    MockStatementSource::new()
        .with_relation(tas_inhibition(selumetinib(), map2k1()))
        .with_relation(tas_inhibition(Agent::new("Vemurafenib").with_ref(Namespace::Pubchem, "42611257"), braf()))
        .with_active_form(braf_v600e)
        .with_active_form(ActiveFormAssertion::new(map2k1_s218, true))
}

fn melanoma_studies() -> MockStudySource {
    MockStudySource::new()
        .with_studies("skcm", &["skcm_tcga", "skcm_yale"])
        .with_case_count("skcm_tcga", 3)
        .with_case_count("skcm_yale", 1)
        .with_mutation("skcm_tcga", "BRAF", "V600E")
        .with_mutation("skcm_tcga", "BRAF", "V600E")
        .with_mutation("skcm_tcga", "BRAF", "G469A")
        .with_mutation("skcm_tcga", "KRAS", "Q61R")
        .with_mutation("skcm_yale", "KRAS", "Q61R")
        .with_mutation("skcm_yale", "KRAS", "Q61K")
        .with_typed_mutation("skcm_yale", MutationType::Nonsense, "PTEN", "R130*")
}

fn engine(statements: Arc<MockStatementSource>, studies: MockStudySource) -> Dtda {
    let map = DiseaseStudyMap::from_tsv_str("skcm\tEFO_0000756\nlaml\tEFO_0000222\n").unwrap();
    Dtda::new(statements, Arc::new(studies), Arc::new(map), EngineConfig::default())
}

#[tokio::test]
async fn drug_and_target_lookups() {
    let statements = Arc::new(statements());
    let dtda = engine(statements.clone(), MockStudySource::new());

    let targets = dtda.find_drug_targets(&selumetinib()).await.unwrap();
    assert_eq!(targets.into_iter().collect::<Vec<_>>(), vec!["MAP2K1"]);
    assert!(dtda.is_nominal_drug_target(&selumetinib(), &map2k1()).await.unwrap());

    let calls = statements.relation_calls();
    dtda.find_drug_targets(&selumetinib()).await.unwrap();
    assert_eq!(statements.relation_calls(), calls);

    let drugs = dtda.find_target_drugs(&braf()).await.unwrap();
    assert_eq!(drugs.len(), 1);
    let drug = drugs.iter().next().unwrap();
    assert_eq!(drug.name, "Vemurafenib");
    assert_eq!(drug.pubchem_id.as_deref(), Some("42611257"));
}

#[tokio::test]
async fn unknown_drug_is_reported() {
    let dtda = engine(Arc::new(statements()), MockStudySource::new());
    let err = dtda
        .is_nominal_drug_target(&Agent::new("notadrug"), &braf())
        .await
        .unwrap_err();
    assert!(matches!(err, DtdaError::DrugNotFound(_)));
}

#[tokio::test]
async fn melanoma_top_mutation() {
    let dtda = engine(Arc::new(statements()), melanoma_studies());

    let stats = dtda.get_mutation_statistics("EFO_0000756", &MutationType::Missense).await.unwrap();
    assert_eq!(stats.sequenced_cases, 4);
    assert_eq!(stats.studies, vec!["skcm_tcga", "skcm_yale"]);

    let genes: Vec<&str> = stats.genes.iter().map(|g| g.gene.as_str()).collect();
    assert_eq!(genes, vec!["BRAF", "KRAS"]);

    let braf = stats.get("BRAF").unwrap();
    assert_eq!(braf.mutated_cases, 3);
    assert_eq!((braf.effects.activate, braf.effects.other), (2, 1));

    let kras = serde_json::to_value(stats.get("KRAS").unwrap()).unwrap();
    assert_eq!(kras["mutated_cases"], 2);
    assert_eq!(kras["effect_distribution"]["other"], 1.0);

    let top = dtda.get_top_mutation("EFO_0000756").await.unwrap().unwrap();
    assert_eq!(top.gene, "BRAF");
    assert_eq!(top.percent, 75);

    assert_eq!(
        dtda.find_mutation_effect("BRAF", "V600E").await.unwrap(),
        Some(MutationEffect::Activate)
    );
}

#[tokio::test]
async fn disease_without_studies() {
    let dtda = engine(Arc::new(statements()), melanoma_studies());
    assert!(matches!(
        dtda.get_top_mutation("EFO_0000222").await,
        Err(DtdaError::DiseaseNotFound(_))
    ));
    assert!(matches!(
        dtda.get_top_mutation("EFO_0000000").await,
        Err(DtdaError::DiseaseNotFound(_))
    ));
}

#[tokio::test]
async fn mechanism_lookups() {
    let dtda = engine(Arc::new(statements()), MockStudySource::new());

    let wanted = ModCondition::new("phosphorylation", Some("S"), Some("218"));
    let found = dtda
        .find_modification_activity(&map2k1(), &wanted, Polarity::Activating)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert!(dtda
        .find_modification_activity(&map2k1(), &wanted, Polarity::Inhibiting)
        .await
        .unwrap()
        .is_empty());

    let relations = dtda
        .find_immediate_relations(Some(&selumetinib()), Some(&map2k1()), Some(StatementType::Inhibition))
        .await
        .unwrap();
    assert_eq!(relations.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn bounded_caches_and_timeouts() {
    let statements = Arc::new(
        statements()
            .with_timeout_for(LookupKey::text("SELUMETINIB"))
            .with_delay(Duration::from_millis(50)),
    );
    let config = EngineConfig {
        relation_cache_capacity: Some(2),
        ..EngineConfig::default()
    };
    let map = DiseaseStudyMap::default();
    let dtda = Dtda::new(statements, Arc::new(MockStudySource::new()), Arc::new(map), config);

    let targets = dtda.find_drug_targets(&selumetinib()).await.unwrap();
    assert!(targets.contains("MAP2K1"));
    assert_eq!(dtda.relations().cached_drug_keys(), 2);
    assert!(!dtda.relations().is_drug_key_cached(&LookupKey::text("SELUMETINIB")));
}
