use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::DomainConfig;
use crate::domain::CanonicalRecord;

/// Column order of the published per-species tables.
pub const EXPORT_COLUMNS: [&str; 7] = [
    "Species",
    "Study Name",
    "Study Accession",
    "Sample Name",
    "Strain",
    "Run Accession",
    "Sample Accession",
];

/// The payload written to one per-species data file. Description and link
/// fields are pre-rendered HTML taken straight from the domain config.
#[derive(Debug, Clone, Serialize)]
pub struct SpeciesTable {
    pub columns: Vec<String>,
    pub count: usize,
    pub data: Vec<Vec<Value>>,
    pub description: String,
    pub published_data_description: String,
    pub pubmed_ids: Vec<u64>,
    pub links: String,
    pub species: String,
    pub updated: String,
}

/// Partitions the public rows by species-name prefix. Rows keep their
/// insertion order; species hidden in the config are omitted entirely.
pub fn build_species_tables(
    records: &[CanonicalRecord],
    domain: &DomainConfig,
    now: DateTime<Utc>,
) -> Vec<(String, SpeciesTable)> {
    info!("reformatting data for export");
    let public: Vec<&CanonicalRecord> = records.iter().filter(|record| record.is_public()).collect();
    let lowercase_species: Vec<String> = public
        .iter()
        .map(|record| record.joined.lane.species_name.to_lowercase())
        .collect();

    let mut tables = Vec::new();
    for species in domain.species_list() {
        if !domain.is_visible(species) {
            continue;
        }
        let mut prefixes = vec![species.to_lowercase()];
        prefixes.extend(domain.aliases(species).iter().map(|alias| alias.to_lowercase()));

        let data: Vec<Vec<Value>> = public
            .iter()
            .zip(&lowercase_species)
            .filter(|(_, name)| prefixes.iter().any(|prefix| name.starts_with(prefix)))
            .map(|(record, _)| export_row(record))
            .collect();

        tables.push((species.to_string(), table(domain, species, data, now)));
    }
    tables
}

/// The "publication list disabled" mode: every visible species gets an
/// explicitly empty table and nothing is fetched at all.
pub fn build_empty_tables(domain: &DomainConfig, now: DateTime<Utc>) -> Vec<(String, SpeciesTable)> {
    info!("building empty species data");
    domain
        .species_list()
        .into_iter()
        .filter(|species| domain.is_visible(species))
        .map(|species| (species.to_string(), table(domain, species, Vec::new(), now)))
        .collect()
}

fn table(
    domain: &DomainConfig,
    species: &str,
    data: Vec<Vec<Value>>,
    now: DateTime<Utc>,
) -> SpeciesTable {
    SpeciesTable {
        columns: EXPORT_COLUMNS.iter().map(|name| name.to_string()).collect(),
        count: data.len(),
        data,
        description: domain.description(species).to_string(),
        published_data_description: domain.published_data_description(species).to_string(),
        pubmed_ids: domain.pubmed_ids(species).to_vec(),
        links: domain.links(species).to_string(),
        species: species.to_string(),
        updated: now.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

fn export_row(record: &CanonicalRecord) -> Vec<Value> {
    let lane = &record.joined.lane;
    vec![
        Value::from(lane.species_name.as_str()),
        Value::from(record.canonical_study_name.as_str()),
        option_value(lane.study_accession.as_deref()),
        Value::from(record.canonical_sample_name.as_str()),
        Value::from(record.canonical_strain.as_str()),
        option_value(lane.run_accession.as_deref()),
        option_value(lane.sample_accession.as_deref()),
    ]
}

fn option_value(value: Option<&str>) -> Value {
    value.map(Value::from).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use crate::domain::{JoinedRecord, LaneRecord, MatchSource, SampleFields};

    use super::*;

    fn domain() -> DomainConfig {
        serde_json::from_str(
            r#"{
                "metadata": {"name": "bacteria", "title": "Bacteria", "list_data": true},
                "databases": ["prok_track"],
                "species": {
                    "Escherichia": {"aliases": ["E. coli"]},
                    "Salmonella": {},
                    "Yersinia": {"show": false}
                }
            }"#,
        )
        .unwrap()
    }

    fn record(species: &str, withdrawn: bool) -> CanonicalRecord {
        CanonicalRecord {
            joined: JoinedRecord {
                lane: LaneRecord {
                    internal_project_name: "P".to_string(),
                    internal_sample_name: "s".to_string(),
                    lane_name: "s_1".to_string(),
                    run_accession: Some("ERR001".to_string()),
                    withdrawn,
                    project_ssid: 1,
                    sample_accession: Some("ERS001".to_string()),
                    study_accession: Some("ERP001".to_string()),
                    species_name: species.to_string(),
                },
                study_title: None,
                study_name: None,
                sample: SampleFields::default(),
                match_source: MatchSource::Unmatched,
                run_in_archive: true,
                study_in_archive: true,
            },
            canonical_study_name: "Study".to_string(),
            canonical_sample_name: "Sample".to_string(),
            canonical_strain: "Unknown".to_string(),
        }
    }

    #[test]
    fn aliases_match_case_insensitively() {
        let records = vec![
            record("escherichia coli", false),
            record("E. coli strain K12", false),
            record("Salmonella enterica", false),
        ];
        let tables = build_species_tables(&records, &domain(), Utc::now());

        let (_, escherichia) = tables
            .iter()
            .find(|(species, _)| species == "Escherichia")
            .unwrap();
        assert_eq!(escherichia.count, 2);

        let (_, salmonella) = tables
            .iter()
            .find(|(species, _)| species == "Salmonella")
            .unwrap();
        assert_eq!(salmonella.count, 1);
    }

    #[test]
    fn hidden_species_are_omitted_not_empty() {
        let tables = build_species_tables(&[], &domain(), Utc::now());
        assert!(tables.iter().all(|(species, _)| species != "Yersinia"));
        assert_eq!(tables.len(), 2);
    }

    #[test]
    fn withdrawn_and_unconfirmed_rows_are_filtered() {
        let mut unconfirmed = record("Escherichia coli", false);
        unconfirmed.joined.run_in_archive = false;
        let records = vec![
            record("Escherichia coli", false),
            record("Escherichia coli", true),
            unconfirmed,
        ];
        let tables = build_species_tables(&records, &domain(), Utc::now());
        let (_, escherichia) = tables
            .iter()
            .find(|(species, _)| species == "Escherichia")
            .unwrap();
        assert_eq!(escherichia.count, 1);
    }

    #[test]
    fn empty_mode_covers_every_visible_species() {
        let tables = build_empty_tables(&domain(), Utc::now());
        let names: Vec<&str> = tables.iter().map(|(species, _)| species.as_str()).collect();
        assert_eq!(names, vec!["Escherichia", "Salmonella"]);
        assert!(tables.iter().all(|(_, table)| table.count == 0));
        assert_eq!(tables[0].1.columns, EXPORT_COLUMNS.to_vec());
    }
}
