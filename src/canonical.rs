use tracing::info;

use crate::domain::{CanonicalRecord, JoinedRecord};

/// First candidate that is present and not the empty string; otherwise the
/// supplied default. Empty strings count as absent everywhere in this
/// pipeline, same as nulls.
pub fn first_non_empty(candidates: &[Option<&str>], otherwise: &str) -> String {
    candidates
        .iter()
        .find_map(|candidate| candidate.filter(|value| !value.is_empty()))
        .unwrap_or(otherwise)
        .to_string()
}

/// Computes the canonical display fields for every joined row. The
/// registry's public names win; the tracking database's internal names are
/// the last resort before "Unknown".
pub fn add_canonical(joined: Vec<JoinedRecord>) -> Vec<CanonicalRecord> {
    info!("finding canonical names for things");
    joined.into_iter().map(canonicalize).collect()
}

fn canonicalize(joined: JoinedRecord) -> CanonicalRecord {
    let canonical_study_name = first_non_empty(
        &[
            joined.study_title.as_deref(),
            joined.study_name.as_deref(),
            Some(joined.lane.internal_project_name.as_str()),
        ],
        "Unknown",
    );
    let canonical_sample_name = first_non_empty(
        &[
            joined.sample.sample_public_name.as_deref(),
            joined.sample.sample_supplier_name.as_deref(),
            Some(joined.lane.internal_sample_name.as_str()),
        ],
        "Unknown",
    );
    let canonical_strain = first_non_empty(&[joined.sample.sample_strain.as_deref()], "Unknown");

    CanonicalRecord {
        joined,
        canonical_study_name,
        canonical_sample_name,
        canonical_strain,
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::{LaneRecord, MatchSource, SampleFields};

    use super::*;

    #[test]
    fn empty_string_is_skipped_not_present() {
        let value = first_non_empty(&[Some(""), Some("X"), Some("Y")], "Unknown");
        assert_eq!(value, "X");
    }

    #[test]
    fn all_absent_falls_back_to_default() {
        let value = first_non_empty(&[None, Some("")], "Unknown");
        assert_eq!(value, "Unknown");
    }

    #[test]
    fn study_chain_prefers_title_then_name_then_internal() {
        let lane = LaneRecord {
            internal_project_name: "Y".to_string(),
            internal_sample_name: "sample_1".to_string(),
            lane_name: "sample_1_1".to_string(),
            run_accession: None,
            withdrawn: false,
            project_ssid: 1,
            sample_accession: None,
            study_accession: None,
            species_name: "Escherichia coli".to_string(),
        };
        let joined = JoinedRecord {
            lane,
            study_title: Some(String::new()),
            study_name: Some("X".to_string()),
            sample: SampleFields::default(),
            match_source: MatchSource::Unmatched,
            run_in_archive: false,
            study_in_archive: false,
        };

        let canonical = canonicalize(joined);
        assert_eq!(canonical.canonical_study_name, "X");
        assert_eq!(canonical.canonical_sample_name, "sample_1");
        assert_eq!(canonical.canonical_strain, "Unknown");
    }
}
