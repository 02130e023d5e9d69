use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::domain::{ArchiveRunRecord, JoinedRecord, LaneRecord, MatchSource, RegistryRecord, SampleFields};
use crate::error::DatapagesError;

/// Joins the three record sets into one wide table: registry study fields
/// keyed on project ssid, registry sample fields via the two-pass sample
/// join, archive confirmation flags last. Every lane yields exactly one
/// output row whether or not anything matched.
pub fn join(
    lanes: Vec<LaneRecord>,
    archive_runs: &[ArchiveRunRecord],
    registry: &[RegistryRecord],
) -> Result<Vec<JoinedRecord>, DatapagesError> {
    info!("joining tracking, registry and archive data");
    let mut joined = join_lanes_with_registry(lanes, registry)?;
    merge_archive_status(&mut joined, archive_runs);
    Ok(joined)
}

/// One sample-join pass: rows keyed by a single join column, first
/// occurrence winning on duplicate keys.
struct SamplePass {
    rows: HashMap<String, SampleFields>,
}

impl SamplePass {
    fn build<F>(samples: &[SampleFields], key: F) -> Self
    where
        F: Fn(&SampleFields) -> Option<&str>,
    {
        let mut rows = HashMap::new();
        for sample in samples {
            if let Some(key) = key(sample) {
                rows.entry(key.to_string()).or_insert_with(|| sample.clone());
            }
        }
        Self { rows }
    }

    fn columns(&self) -> Vec<&'static str> {
        SampleFields::COLUMNS.to_vec()
    }

    fn get(&self, key: Option<&str>) -> Option<SampleFields> {
        key.and_then(|key| self.rows.get(key)).cloned()
    }
}

/// The two sample-join passes must carry identical column sets or the
/// field-wise combine silently mispairs values. Divergence is a structural
/// bug, never recoverable.
pub fn check_join_schema(
    accession_pass: &[&str],
    name_pass: &[&str],
) -> Result<(), DatapagesError> {
    let mut left = accession_pass.to_vec();
    let mut right = name_pass.to_vec();
    left.sort_unstable();
    right.sort_unstable();
    if left != right {
        return Err(DatapagesError::SchemaMismatch(format!(
            "{left:?} versus {right:?}"
        )));
    }
    Ok(())
}

fn join_lanes_with_registry(
    lanes: Vec<LaneRecord>,
    registry: &[RegistryRecord],
) -> Result<Vec<JoinedRecord>, DatapagesError> {
    // The registry has the public names for things, like the study title;
    // those win over the tracking database's internal names downstream.
    let mut study_by_ssid: HashMap<i64, (Option<String>, Option<String>)> = HashMap::new();
    let mut seen_studies = HashSet::new();
    for record in registry {
        let entry = (
            record.project_ssid,
            record.study_title.clone(),
            record.study_name.clone(),
        );
        if seen_studies.insert(entry) {
            study_by_ssid
                .entry(record.project_ssid)
                .or_insert_with(|| (record.study_title.clone(), record.study_name.clone()));
        }
    }

    let mut samples = Vec::new();
    let mut seen_samples = HashSet::new();
    for record in registry {
        let sample = SampleFields::from_registry(record);
        if seen_samples.insert(sample.clone()) {
            samples.push(sample);
        }
    }

    // Many registry entries share a sample accession with the tracking
    // entry; that is the joining key. When the registry never learned the
    // accession the internal sample name is the fallback key.
    let by_accession = SamplePass::build(&samples, |sample| sample.sample_accession.as_deref());
    let by_name = SamplePass::build(&samples, |sample| sample.sample_name.as_deref());
    check_join_schema(&by_accession.columns(), &by_name.columns())?;

    let mut joined = Vec::with_capacity(lanes.len());
    for lane in lanes {
        let (study_title, study_name) = study_by_ssid
            .get(&lane.project_ssid)
            .cloned()
            .unwrap_or((None, None));

        let accession_match = by_accession.get(lane.sample_accession.as_deref());
        let name_match = by_name.get(Some(lane.internal_sample_name.as_str()));
        let (sample, match_source) = match (accession_match, name_match) {
            (Some(by_acc), Some(by_name)) => {
                (by_acc.combine_first(by_name), MatchSource::AccessionMatched)
            }
            (Some(by_acc), None) => (by_acc, MatchSource::AccessionMatched),
            (None, Some(by_name)) => (by_name, MatchSource::NameMatched),
            (None, None) => (SampleFields::default(), MatchSource::Unmatched),
        };

        joined.push(JoinedRecord {
            lane,
            study_title,
            study_name,
            sample,
            match_source,
            run_in_archive: false,
            study_in_archive: false,
        });
    }
    Ok(joined)
}

/// Sets the archive confirmation flags. No match means `false`, not null.
fn merge_archive_status(joined: &mut [JoinedRecord], archive_runs: &[ArchiveRunRecord]) {
    info!("comparing with the details in the archive");
    let runs: HashSet<&str> = archive_runs
        .iter()
        .map(|record| record.run_accession.as_str())
        .collect();
    let studies: HashSet<&str> = archive_runs
        .iter()
        .map(|record| record.study_accession.as_str())
        .collect();
    for record in joined {
        record.run_in_archive = record
            .lane
            .run_accession
            .as_deref()
            .is_some_and(|acc| runs.contains(acc));
        record.study_in_archive = record
            .lane
            .study_accession
            .as_deref()
            .is_some_and(|acc| studies.contains(acc));
    }
}
