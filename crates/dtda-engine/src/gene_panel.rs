//! Curated signalling-pathway gene lists used to restrict mutation queries.

pub const RTK_SIGNALING: &[&str] = &[
    "EGFR", "ERBB2", "ERBB3", "ERBB4", "PDGFA", "PDGFB", "PDGFRA", "PDGFRB", "KIT", "FGF1",
    "FGFR1", "IGF1", "IGF1R", "VEGFA", "VEGFB", "KDR",
];

pub const PI3K_SIGNALING: &[&str] = &[
    "PIK3CA", "PIK3R1", "PIK3R2", "PTEN", "PDPK1", "AKT1", "AKT2", "FOXO1", "FOXO3", "MTOR",
    "RICTOR", "TSC1", "TSC2", "RHEB", "AKT1S1", "RPTOR", "MLST8",
];

pub const MAPK_SIGNALING: &[&str] = &[
    "KRAS", "HRAS", "BRAF", "RAF1", "MAP3K1", "MAP3K2", "MAP3K3", "MAP3K4", "MAP3K5", "MAP2K1",
    "MAP2K2", "MAP2K3", "MAP2K4", "MAP2K5", "MAPK1", "MAPK3", "MAPK4", "MAPK6", "MAPK7", "MAPK8",
    "MAPK9", "MAPK12", "MAPK14", "DAB2", "RASSF1", "RAB25",
];

/// Union of the three pathway lists, in list order, without repeats.
pub fn default_gene_panel() -> Vec<String> {
    let mut panel: Vec<String> = Vec::new();
    for gene in RTK_SIGNALING.iter().chain(PI3K_SIGNALING).chain(MAPK_SIGNALING) {
        if !panel.iter().any(|g| g == gene) {
            panel.push(gene.to_string());
        }
    }
    panel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panel_is_union_of_lists() {
        let panel = default_gene_panel();
        assert_eq!(panel.len(), RTK_SIGNALING.len() + PI3K_SIGNALING.len() + MAPK_SIGNALING.len());
        assert_eq!(panel.first().map(String::as_str), Some("EGFR"));
        assert!(panel.iter().any(|g| g == "BRAF"));
        assert!(!panel.iter().any(|g| g == "TP53"));
    }
}
