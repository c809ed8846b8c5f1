//! Disease → study-prefix table.
//!
//! Loaded once at startup from a two-column TSV: `study_prefix<TAB>disease_id`.
//! One disease may appear on several lines; its prefixes keep file order.
//! Lines starting with `#` are comments.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

#[derive(Debug, Clone, Default)]
pub struct DiseaseStudyMap {
    prefixes: HashMap<String, Vec<String>>,
}

impl DiseaseStudyMap {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read disease map {}", path.display()))?;
        Self::from_tsv_str(&text).with_context(|| format!("Malformed disease map {}", path.display()))
    }

    pub fn from_tsv_str(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .comment(Some(b'#'))
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut map = Self::default();
        for (i, row) in reader.records().enumerate() {
            let row = row.with_context(|| format!("Unreadable row {}", i + 1))?;
            let (Some(prefix), Some(disease)) = (row.get(0), row.get(1)) else {
                anyhow::bail!("Row {} has {} fields, expected 2", i + 1, row.len());
            };
            let (prefix, disease) = (prefix.trim(), disease.trim());
            if prefix.is_empty() || disease.is_empty() {
                anyhow::bail!("Row {} has an empty field", i + 1);
            }
            map.insert(disease, prefix);
        }
        Ok(map)
    }

    /// Add a prefix for a disease; repeated pairs are ignored.
    pub fn insert(&mut self, disease_id: &str, prefix: &str) {
        let entry = self.prefixes.entry(disease_id.to_string()).or_default();
        if !entry.iter().any(|p| p == prefix) {
            entry.push(prefix.to_string());
        }
    }

    pub fn prefixes(&self, disease_id: &str) -> Option<&[String]> {
        self.prefixes.get(disease_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for DiseaseStudyMap {
    /// Build from `(disease_id, prefix)` pairs.
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut map = Self::default();
        for (disease, prefix) in iter {
            map.insert(disease, prefix);
        }
        map
    }
}
