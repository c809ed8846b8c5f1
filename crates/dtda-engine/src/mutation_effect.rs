//! Residue-level mutation effect lookup against active-form assertions.

use std::sync::Arc;

use dtda_common::{ActiveFormAssertion, AminoAcidChange, MutationEffect, Result};
use dtda_sources::StatementSource;
use tracing::{debug, info, instrument};

use crate::cache::ResultCache;

pub type ActiveFormCache = Arc<dyn ResultCache<String, Arc<Vec<ActiveFormAssertion>>>>;

pub struct MutationMatcher {
    source: Arc<dyn StatementSource>,
    active_forms: ActiveFormCache,
}

impl MutationMatcher {
    pub fn new(source: Arc<dyn StatementSource>, active_forms: ActiveFormCache) -> Self {
        Self { source, active_forms }
    }

    /// Whether `amino_acid_change` (e.g. `V600E`) activates or deactivates
    /// `protein_name`, according to the first matching active-form assertion.
    ///
    /// Notation other than a single substitution gives `None` without any
    /// lookup. Source errors, timeouts included, are returned to the caller.
    #[instrument(skip(self))]
    pub async fn find_mutation_effect(
        &self,
        protein_name: &str,
        amino_acid_change: &str,
    ) -> Result<Option<MutationEffect>> {
        let Some(change) = AminoAcidChange::parse(amino_acid_change) else {
            debug!("Not a single-residue substitution");
            return Ok(None);
        };

        let assertions = self.active_forms_of(protein_name).await?;
        Ok(effect_of(&assertions, &change))
    }

    async fn active_forms_of(&self, protein_name: &str) -> Result<Arc<Vec<ActiveFormAssertion>>> {
        let key = protein_name.to_string();
        if let Some(cached) = self.active_forms.get(&key) {
            debug!(protein = protein_name, "Already have active forms");
            return Ok(cached);
        }

        info!(protein = protein_name, "Looking up active forms");
        let fetched = Arc::new(self.source.query_active_forms(protein_name).await?);
        self.active_forms.insert(key, Arc::clone(&fetched));
        Ok(fetched)
    }

    pub fn cached_proteins(&self) -> usize {
        self.active_forms.len()
    }
}

/// First assertion, in source order, whose single mutation is `change`.
pub fn effect_of(assertions: &[ActiveFormAssertion], change: &AminoAcidChange) -> Option<MutationEffect> {
    assertions
        .iter()
        .find(|af| af.single_mutation().is_some_and(|m| m.matches(change)))
        .map(|af| if af.is_active { MutationEffect::Activate } else { MutationEffect::Deactivate })
}
