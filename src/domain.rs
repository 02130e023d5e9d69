use serde::{Deserialize, Serialize};

/// One sequencing run as recorded in the tracking database. Field
/// validation (the withdrawn flag, nullable accessions) happens at the
/// fetcher boundary so the join never sees raw rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneRecord {
    pub internal_project_name: String,
    pub internal_sample_name: String,
    pub lane_name: String,
    pub run_accession: Option<String>,
    pub withdrawn: bool,
    pub project_ssid: i64,
    pub sample_accession: Option<String>,
    pub study_accession: Option<String>,
    pub species_name: String,
}

/// A {study accession, run accession} pair confirming a run is published
/// in the archive. Produced by expanding the compact run-id ranges ENA
/// returns per study.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRunRecord {
    pub study_accession: String,
    pub run_accession: String,
}

/// One study/sample pair as known to the registry of record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub project_ssid: i64,
    pub study_accession: Option<String>,
    pub study_title: Option<String>,
    pub study_name: Option<String>,
    pub sample_name: Option<String>,
    pub sample_accession: Option<String>,
    pub sample_common_name: Option<String>,
    pub sample_organism: Option<String>,
    pub sample_public_name: Option<String>,
    pub sample_strain: Option<String>,
    pub sample_supplier_name: Option<String>,
}

/// The registry's sample-level columns, shared by both sample-join passes.
/// Both passes must expose the same column set; `join::check_join_schema`
/// enforces that before the field-wise combine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SampleFields {
    pub sample_name: Option<String>,
    pub sample_accession: Option<String>,
    pub sample_common_name: Option<String>,
    pub sample_organism: Option<String>,
    pub sample_public_name: Option<String>,
    pub sample_strain: Option<String>,
    pub sample_supplier_name: Option<String>,
}

impl SampleFields {
    pub const COLUMNS: [&'static str; 7] = [
        "sample_name",
        "sample_accession",
        "sample_common_name",
        "sample_organism",
        "sample_public_name",
        "sample_strain",
        "sample_supplier_name",
    ];

    pub fn from_registry(record: &RegistryRecord) -> Self {
        Self {
            sample_name: record.sample_name.clone(),
            sample_accession: record.sample_accession.clone(),
            sample_common_name: record.sample_common_name.clone(),
            sample_organism: record.sample_organism.clone(),
            sample_public_name: record.sample_public_name.clone(),
            sample_strain: record.sample_strain.clone(),
            sample_supplier_name: record.sample_supplier_name.clone(),
        }
    }

    /// Field-wise "first non-null wins", preferring `self`. Mirrors the
    /// precedence between the accession-matched and name-matched passes.
    pub fn combine_first(self, other: Self) -> Self {
        Self {
            sample_name: self.sample_name.or(other.sample_name),
            sample_accession: self.sample_accession.or(other.sample_accession),
            sample_common_name: self.sample_common_name.or(other.sample_common_name),
            sample_organism: self.sample_organism.or(other.sample_organism),
            sample_public_name: self.sample_public_name.or(other.sample_public_name),
            sample_strain: self.sample_strain.or(other.sample_strain),
            sample_supplier_name: self.sample_supplier_name.or(other.sample_supplier_name),
        }
    }
}

/// How a joined row found its registry sample match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    AccessionMatched,
    NameMatched,
    Unmatched,
}

/// The outer-joined union of one lane with its registry study/sample
/// match and archive confirmation. Every lane appears exactly once.
#[derive(Debug, Clone)]
pub struct JoinedRecord {
    pub lane: LaneRecord,
    pub study_title: Option<String>,
    pub study_name: Option<String>,
    pub sample: SampleFields,
    pub match_source: MatchSource,
    pub run_in_archive: bool,
    pub study_in_archive: bool,
}

/// A joined row plus the derived display fields.
#[derive(Debug, Clone)]
pub struct CanonicalRecord {
    pub joined: JoinedRecord,
    pub canonical_study_name: String,
    pub canonical_sample_name: String,
    pub canonical_strain: String,
}

impl CanonicalRecord {
    pub fn is_public(&self) -> bool {
        !self.joined.lane.withdrawn && self.joined.run_in_archive && self.joined.study_in_archive
    }
}
