//! cBioPortal REST API client.
//! Docs: https://www.cbioportal.org/api/swagger-ui/index.html
//!
//! Study conventions relied on here: every study `X` publishes a sample list
//! `X_sequenced` and a mutation profile `X_mutations`.
//!
//! Mutation queries are restricted to the requested genes on the server, by
//! Entrez id; symbols are resolved once per client and remembered.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use dtda_common::sandbox::SandboxClient;
use dtda_common::{DtdaError, MutationType, Result};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::studies::{MutationRecord, StudySource};

pub const CBIOPORTAL_API_URL: &str = "https://www.cbioportal.org/api";

const SERVICE: &str = "cBioPortal";

pub struct CbioPortalClient {
    client: SandboxClient,
    base_url: String,
    timeout: Duration,
    /// HUGO symbol → Entrez id; `None` for symbols the portal does not know.
    entrez_ids: Mutex<HashMap<String, Option<u64>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StudyDto {
    study_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SampleListDto {
    #[serde(default)]
    sample_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MutationDto {
    gene: Option<GeneDto>,
    #[serde(default)]
    protein_change: String,
    #[serde(default)]
    mutation_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneDto {
    hugo_gene_symbol: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneIdDto {
    entrez_gene_id: u64,
    hugo_gene_symbol: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MutationFilterDto<'a> {
    entrez_gene_ids: &'a [u64],
    sample_list_id: &'a str,
}

impl CbioPortalClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = SandboxClient::for_base_urls(&[base_url], timeout)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            entrez_ids: Mutex::new(HashMap::new()),
        })
    }

    /// GET and decode; 404 yields `Ok(None)`.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let url = format!("{}{}", self.base_url, path);
        self.send_json(self.client.get(&url)?.query(params), path).await
    }

    /// POST a JSON body and decode; 404 yields `Ok(None)`.
    async fn post_json<B, T>(&self, path: &str, params: &[(&str, &str)], body: &B) -> Result<Option<T>>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        self.send_json(self.client.post(&url)?.query(params).json(body), path).await
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<Option<T>> {
        let resp = request.send().await.map_err(|e| self.map_transport_error(e, path))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::GATEWAY_TIMEOUT => Err(self.timeout_error(path)),
            s if !s.is_success() => Err(DtdaError::Upstream { service: SERVICE, status: s.as_u16() }),
            _ => Ok(Some(resp.json().await.map_err(|e| self.map_transport_error(e, path))?)),
        }
    }

    fn map_transport_error(&self, err: reqwest::Error, what: &str) -> DtdaError {
        if err.is_timeout() {
            self.timeout_error(what)
        } else {
            DtdaError::Http(err.without_url())
        }
    }

    fn timeout_error(&self, what: &str) -> DtdaError {
        warn!(service = SERVICE, path = what, "Request timed out");
        DtdaError::DatabaseTimeout { query: what.to_string(), timeout_secs: self.timeout.as_secs() }
    }

    /// Entrez ids for the given symbols, in symbol order. Unknown symbols are dropped.
    async fn entrez_ids(&self, genes: &[&str]) -> Result<Vec<u64>> {
        let missing: Vec<&str> = {
            let known = self.entrez_ids.lock().unwrap_or_else(PoisonError::into_inner);
            genes.iter().copied().filter(|g| !known.contains_key(*g)).collect()
        };

        if !missing.is_empty() {
            let found: Vec<GeneIdDto> = self
                .post_json("/genes/fetch", &[("geneIdType", "HUGO_GENE_SYMBOL")], &missing)
                .await?
                .unwrap_or_default();
            debug!(n_requested = missing.len(), n_found = found.len(), "Gene ids resolved");

            let mut known = self.entrez_ids.lock().unwrap_or_else(PoisonError::into_inner);
            record_entrez_ids(&mut known, &missing, found);
        }

        let known = self.entrez_ids.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(genes.iter().filter_map(|g| known.get(*g).copied().flatten()).collect())
    }
}

/// Remember resolved ids, and remember misses so they are not asked for again.
fn record_entrez_ids(known: &mut HashMap<String, Option<u64>>, requested: &[&str], found: Vec<GeneIdDto>) {
    for gene in found {
        known.insert(gene.hugo_gene_symbol, Some(gene.entrez_gene_id));
    }
    for symbol in requested {
        known.entry(symbol.to_string()).or_insert(None);
    }
}

#[async_trait]
impl StudySource for CbioPortalClient {
    #[instrument(skip(self))]
    async fn list_studies(&self, prefix: &str) -> Result<Vec<String>> {
        let studies: Vec<StudyDto> = self
            .get_json("/studies", &[("keyword", prefix), ("projection", "SUMMARY")])
            .await?
            .unwrap_or_default();
        Ok(filter_study_ids(prefix, studies.into_iter().map(|s| s.study_id)))
    }

    #[instrument(skip(self))]
    async fn count_sequenced_cases(&self, study_id: &str) -> Result<u64> {
        let path = format!("/sample-lists/{}_sequenced", study_id);
        let list: Option<SampleListDto> = self.get_json(&path, &[]).await?;
        Ok(list.map(|l| l.sample_count).unwrap_or(0))
    }

    #[instrument(skip(self, genes))]
    async fn fetch_mutations(
        &self,
        study_id: &str,
        genes: &[&str],
        mutation_type: &MutationType,
    ) -> Result<Vec<MutationRecord>> {
        let entrez_gene_ids = self.entrez_ids(genes).await?;
        if entrez_gene_ids.is_empty() {
            warn!(study_id, "No gene in the panel resolved to an Entrez id");
            return Ok(Vec::new());
        }

        let path = format!("/molecular-profiles/{}_mutations/mutations/fetch", study_id);
        let sample_list = format!("{}_sequenced", study_id);
        let filter = MutationFilterDto { entrez_gene_ids: &entrez_gene_ids, sample_list_id: &sample_list };
        let raw: Vec<MutationDto> = self
            .post_json(&path, &[("projection", "DETAILED")], &filter)
            .await?
            .unwrap_or_default();

        let n_raw = raw.len();
        let records = select_mutations(raw, genes, mutation_type);
        debug!(study_id, n_raw, n_kept = records.len(), "Mutations fetched");
        Ok(records)
    }
}

/// Keyword search is fuzzy; keep only IDs that actually contain the prefix.
fn filter_study_ids(prefix: &str, ids: impl Iterator<Item = String>) -> Vec<String> {
    let needle = prefix.to_lowercase();
    ids.filter(|id| id.to_lowercase().contains(&needle)).collect()
}

fn select_mutations(raw: Vec<MutationDto>, genes: &[&str], mutation_type: &MutationType) -> Vec<MutationRecord> {
    raw.into_iter()
        .filter(|m| &MutationType::from_label(&m.mutation_type) == mutation_type)
        .filter_map(|m| {
            let gene = m.gene?.hugo_gene_symbol;
            if !genes.contains(&gene.as_str()) {
                return None;
            }
            Some(MutationRecord { gene_symbol: gene, amino_acid_change: m.protein_change })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filter_study_ids_by_prefix() {
        let ids = vec!["skcm_tcga".to_string(), "skcm_broad".to_string(), "brca_tcga".to_string()];
        assert_eq!(filter_study_ids("SKCM", ids.into_iter()), vec!["skcm_tcga", "skcm_broad"]);
    }

    #[test]
    fn test_select_mutations_decodes_and_filters() {
        let raw: Vec<MutationDto> = serde_json::from_str(
            r#"[
                {"gene": {"hugoGeneSymbol": "BRAF"}, "proteinChange": "V600E", "mutationType": "Missense_Mutation"},
                {"gene": {"hugoGeneSymbol": "TP53"}, "proteinChange": "R175H", "mutationType": "Missense_Mutation"},
                {"gene": {"hugoGeneSymbol": "BRAF"}, "proteinChange": "X", "mutationType": "Splice_Site"},
                {"proteinChange": "G12D", "mutationType": "Missense_Mutation"}
            ]"#,
        )
        .unwrap();

        let records = select_mutations(raw, &["BRAF", "KRAS"], &MutationType::Missense);
        assert_eq!(records, vec![MutationRecord::new("BRAF", "V600E")]);
    }

    #[test]
    fn test_mutation_filter_body() {
        let ids = [673, 3845];
        let filter = MutationFilterDto { entrez_gene_ids: &ids, sample_list_id: "skcm_tcga_sequenced" };
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            serde_json::json!({"entrezGeneIds": [673, 3845], "sampleListId": "skcm_tcga_sequenced"})
        );
    }

    #[test]
    fn test_record_entrez_ids_remembers_misses() {
        let found: Vec<GeneIdDto> = serde_json::from_str(
            r#"[{"entrezGeneId": 673, "hugoGeneSymbol": "BRAF", "type": "protein-coding"}]"#,
        )
        .unwrap();
        let mut known = HashMap::new();
        record_entrez_ids(&mut known, &["BRAF", "NOTAGENE"], found);

        assert_eq!(known.get("BRAF"), Some(&Some(673)));
        assert_eq!(known.get("NOTAGENE"), Some(&None));
    }

    #[tokio::test]
    async fn test_known_symbols_skip_gene_lookup() {
        // Nothing listens on this port, so any request would fail
        let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let client = CbioPortalClient::new(&format!("http://127.0.0.1:{}", port), Duration::from_secs(2)).unwrap();
        {
            let mut known = client.entrez_ids.lock().unwrap();
            known.insert("BRAF".to_string(), Some(673));
            known.insert("NOTAGENE".to_string(), None);
        }
        assert_eq!(client.entrez_ids(&["NOTAGENE", "BRAF"]).await.unwrap(), vec![673]);

        let err = client.entrez_ids(&["KRAS"]).await.unwrap_err();
        assert!(matches!(err, DtdaError::Http(_)));
        assert!(!err.to_string().contains(&port.to_string()));
    }

    #[test]
    fn test_client_rejects_unparseable_url() {
        assert!(CbioPortalClient::new("", Duration::from_secs(10)).is_err());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_live_skcm_studies() {
        let client = CbioPortalClient::new(CBIOPORTAL_API_URL, Duration::from_secs(30)).unwrap();
        let studies = client.list_studies("skcm").await.unwrap();
        assert!(!studies.is_empty());
    }
}
