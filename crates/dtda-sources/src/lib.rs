//! dtda-sources — External capabilities consumed by the DTDA engine.
//!
//! Each capability is a trait with a live HTTP client and an in-memory mock
//! living next to it:
//! - `StatementSource`: biomedical statements (INDRA DB REST)
//! - `StudySource`: cancer studies and their mutations (cBioPortal)
//!
//! `DiseaseStudyMap` is the static disease → study-prefix table.

pub mod statements;
pub mod indra;
pub mod studies;
pub mod cbioportal;
pub mod disease_map;

pub use cbioportal::CbioPortalClient;
pub use disease_map::DiseaseStudyMap;
pub use indra::IndraDbClient;
pub use statements::{MockStatementSource, RelationQuery, StatementSource};
pub use studies::{MockStudySource, MutationRecord, StudySource};
