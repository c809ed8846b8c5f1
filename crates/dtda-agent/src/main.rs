//! DTDA — disease, target and drug queries over INDRA DB and cBioPortal.
//! Entry point for the command-line binary.

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dtda_common::{Agent, ModCondition, MutationType, Namespace, StatementType};
use dtda_engine::{Dtda, Polarity};
use dtda_sources::{CbioPortalClient, DiseaseStudyMap, IndraDbClient};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dtda")]
#[command(version)]
#[command(about = "Drug/target resolution, mutation effects and disease mutation statistics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Targets inhibited by a drug
    DrugTargets {
        name: String,
        /// Extra grounding, e.g. CHEBI:CHEBI:63637 or PUBCHEM:42611257
        #[arg(long = "ref", value_name = "NS:ID")]
        refs: Vec<String>,
    },

    /// Drugs inhibiting a gene target
    TargetDrugs {
        name: String,
        #[arg(long)]
        hgnc: String,
    },

    /// Whether a drug nominally targets a gene
    IsTarget { drug: String, target: String },

    /// Effect of a substitution such as V600E on a protein
    MutationEffect { protein: String, change: String },

    /// Per-gene mutation statistics for a disease (EFO id)
    MutationStats {
        disease: String,
        #[arg(long, default_value = "missense")]
        mutation_type: String,
    },

    /// Most frequently mutated gene for a disease (EFO id)
    TopMutation { disease: String },

    /// Active forms of an agent carrying a modification
    ModificationActivity {
        name: String,
        #[arg(long = "ref", value_name = "NS:ID")]
        refs: Vec<String>,
        #[arg(long, default_value = "phosphorylation")]
        mod_type: String,
        #[arg(long)]
        residue: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long, default_value = "activating")]
        polarity: String,
    },

    /// Statements directly linking two agents
    Relations {
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        object: Option<String>,
        /// Statement type; omit for any
        #[arg(long = "type")]
        statement_type: Option<String>,
    },
}

/// `NS:ID` → (namespace, id). Only the first colon separates.
fn parse_ref(raw: &str) -> anyhow::Result<(Namespace, String)> {
    match raw.split_once(':') {
        Some((ns, id)) if !ns.is_empty() && !id.is_empty() => Ok((Namespace::from_tag(ns), id.to_string())),
        _ => bail!("Expected NS:ID, got {}", raw),
    }
}

fn agent_with_refs(name: &str, refs: &[String]) -> anyhow::Result<Agent> {
    refs.iter().try_fold(Agent::new(name), |agent, raw| {
        let (ns, id) = parse_ref(raw)?;
        Ok(agent.with_ref(ns, id))
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn build_engine(config: &config::Config) -> anyhow::Result<Dtda> {
    let disease_map = DiseaseStudyMap::load(&config.resources.disease_map)
        .context("Disease map is required at startup")?;
    info!(n_diseases = disease_map.len(), "Disease map loaded");

    let api_key = config.indra_api_key();
    if api_key.is_none() {
        warn!("No INDRA DB API key (set indra_db.api_key or DTDA_INDRA_API_KEY)");
    }
    let statements = IndraDbClient::new(
        &config.indra_db.url,
        api_key,
        Duration::from_secs(config.indra_db.timeout_secs),
    )?;
    let studies = CbioPortalClient::new(
        &config.cbioportal.url,
        Duration::from_secs(config.cbioportal.timeout_secs),
    )?;

    Ok(Dtda::new(
        Arc::new(statements),
        Arc::new(studies),
        Arc::new(disease_map),
        config.engine_config(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dtda=debug,info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::load()?;
    info!(
        indra = %config.indra_db.url,
        cbioportal = %config.cbioportal.url,
        "Configuration loaded"
    );
    let dtda = build_engine(&config)?;

    match cli.command {
        Command::DrugTargets { name, refs } => {
            let drug = agent_with_refs(&name, &refs)?;
            print_json(&dtda.find_drug_targets(&drug).await?)
        }
        Command::TargetDrugs { name, hgnc } => {
            let target = Agent::new(name).with_ref(Namespace::Hgnc, hgnc);
            print_json(&dtda.find_target_drugs(&target).await?)
        }
        Command::IsTarget { drug, target } => {
            let is_target = dtda
                .is_nominal_drug_target(&Agent::new(drug.as_str()), &Agent::new(target.as_str()))
                .await?;
            print_json(&json!({ "drug": drug, "target": target, "is_target": is_target }))
        }
        Command::MutationEffect { protein, change } => {
            let effect = dtda.find_mutation_effect(&protein, &change).await?;
            print_json(&json!({ "protein": protein, "change": change, "effect": effect }))
        }
        Command::MutationStats { disease, mutation_type } => {
            let mutation_type = MutationType::from_label(&mutation_type);
            print_json(&dtda.get_mutation_statistics(&disease, &mutation_type).await?)
        }
        Command::TopMutation { disease } => print_json(&dtda.get_top_mutation(&disease).await?),
        Command::ModificationActivity { name, refs, mod_type, residue, position, polarity } => {
            let agent = agent_with_refs(&name, &refs)?;
            let Some(polarity) = Polarity::from_label(&polarity) else {
                bail!("Unknown polarity {}, expected activating or inhibiting", polarity);
            };
            let modification = ModCondition::new(&mod_type, residue.as_deref(), position.as_deref());
            print_json(&dtda.find_modification_activity(&agent, &modification, polarity).await?)
        }
        Command::Relations { subject, object, statement_type } => {
            let subject = subject.map(Agent::new);
            let object = object.map(Agent::new);
            let statement_type = statement_type.as_deref().map(StatementType::from_name);
            let stmts = dtda
                .find_immediate_relations(subject.as_ref(), object.as_ref(), statement_type)
                .await?;
            print_json(&stmts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ref_splits_on_first_colon() {
        let (ns, id) = parse_ref("CHEBI:CHEBI:63637").unwrap();
        assert_eq!(ns, Namespace::Chebi);
        assert_eq!(id, "CHEBI:63637");
        assert!(parse_ref("HGNC").is_err());
        assert!(parse_ref(":1097").is_err());
    }

    #[test]
    fn test_agent_with_refs() {
        let agent = agent_with_refs("BRAF", &["hgnc:1097".to_string(), "UP:P15056".to_string()]).unwrap();
        assert_eq!(agent.hgnc_id(), Some("1097"));
        assert_eq!(agent.db_ref(&Namespace::Uniprot), Some("P15056"));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["dtda", "target-drugs", "BRAF", "--hgnc", "1097"]).unwrap();
        assert!(matches!(cli.command, Command::TargetDrugs { ref hgnc, .. } if hgnc == "1097"));

        let cli = Cli::try_parse_from(["dtda", "mutation-stats", "EFO_0000756"]).unwrap();
        assert!(matches!(cli.command, Command::MutationStats { ref mutation_type, .. } if mutation_type == "missense"));

        let cli = Cli::try_parse_from([
            "dtda", "drug-targets", "vemurafenib", "--ref", "CHEBI:CHEBI:63637", "--ref", "PUBCHEM:42611257",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::DrugTargets { ref refs, .. } if refs.len() == 2));
    }
}
