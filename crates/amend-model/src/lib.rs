#![forbid(unsafe_code)]
//! AMEND archive model SSOT.

mod fit;
mod geography;
mod indicator;
mod manifest;
mod matching;
mod observation;
mod report;

pub use fit::{FitDiagnostics, FitSummary};
pub use geography::{
    parse_block_group_id, BlockGroupId, GeoLevel, GeoUnitId, ValidationError, BLOCK_GROUP_ID_LEN,
    UNIT_NAME_MAX_LEN,
};
pub use indicator::{BlockGroupProfile, IndicatorKind, IndicatorValue};
pub use manifest::{
    ArchiveManifest, SourceChecksum, TableStats, TimestampPolicy, MANIFEST_VERSION,
};
pub use matching::{
    similarity, MatchOutcome, MatchReport, MunicipalityMatchPolicy, MATCH_THRESHOLD_DEFAULT,
};
pub use observation::{
    CsoOutfall, EnforcementAction, PenaltyConfidence, PortalIncident, TownPopulation,
};
pub use report::AssignmentReport;

pub const CRATE_NAME: &str = "amend-model";
