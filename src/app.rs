use std::collections::BTreeSet;

use camino::Utf8Path;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{self, CachedDomainData};
use crate::canonical::add_canonical;
use crate::config::{DomainConfig, GlobalConfig};
use crate::domain::{ArchiveRunRecord, LaneRecord, RegistryRecord};
use crate::ena::ArchiveClient;
use crate::error::DatapagesError;
use crate::join;
use crate::registry::RegistryClient;
use crate::site;
use crate::species::{self, SpeciesTable};
use crate::tracking::TrackingClient;

#[derive(Debug, Clone, Serialize)]
pub struct DomainSummary {
    pub domain: String,
    pub data_dir: String,
    pub species: Vec<SpeciesCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeciesCount {
    pub species: String,
    pub filename: String,
    pub count: usize,
}

/// Orchestrates one batch run: fetch (or replay), join, canonicalize,
/// partition, publish. Generic over the three client traits so tests can
/// drive the whole pipeline with in-memory fixtures.
pub struct App<T: TrackingClient, A: ArchiveClient, R: RegistryClient> {
    tracking: T,
    archive: A,
    registry: R,
}

impl<T: TrackingClient, A: ArchiveClient, R: RegistryClient> App<T, A, R> {
    pub fn new(tracking: T, archive: A, registry: R) -> Self {
        Self {
            tracking,
            archive,
            registry,
        }
    }

    /// Regenerates and publishes one domain: data files plus index page.
    pub fn update_domain(
        &self,
        global: &GlobalConfig,
        domain: &DomainConfig,
        site_dir: &Utf8Path,
    ) -> Result<DomainSummary, DatapagesError> {
        let now = Utc::now();
        let tables = if domain.metadata.list_data {
            self.generate_tables(global, domain, now)?
        } else {
            species::build_empty_tables(domain, now)
        };

        let data_dir =
            site::write_domain_data_files(&tables, site_dir, &domain.metadata.name, now)?;
        let visible: Vec<&str> = domain
            .species_list()
            .into_iter()
            .filter(|species| domain.is_visible(species))
            .collect();
        site::write_domain_index(&visible, site_dir, &domain.metadata.name, &domain.metadata.title)?;

        Ok(DomainSummary {
            domain: domain.metadata.name.clone(),
            data_dir: data_dir.to_string(),
            species: tables
                .iter()
                .map(|(species, table)| SpeciesCount {
                    species: species.clone(),
                    filename: site::species_filename(species),
                    count: table.count,
                })
                .collect(),
        })
    }

    /// Runs the core pipeline for one domain and returns the per-species
    /// export tables. `now` is injected so repeated runs over the same
    /// source data produce identical payloads.
    pub fn generate_tables(
        &self,
        global: &GlobalConfig,
        domain: &DomainConfig,
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, SpeciesTable)>, DatapagesError> {
        let (lanes, archive_runs, studies) = match &global.load_cache_path {
            Some(cache_path) => {
                warn!("loading cached data from {cache_path}");
                let cached = cache::load(cache_path, &domain.metadata.name)?;
                (cached.lane_details, cached.ena_run_details, cached.ss_studies)
            }
            None => {
                info!("loading data from databases");
                self.fetch_all(domain)?
            }
        };

        if let Some(cache_path) = &global.save_cache_path {
            warn!("saving data to cache in {cache_path}");
            cache::save(
                cache_path,
                &domain.metadata.name,
                CachedDomainData {
                    project_ssids: project_ssids(&lanes),
                    ena_run_details: archive_runs.clone(),
                    lane_details: lanes.clone(),
                    ss_studies: studies.clone(),
                },
            )?;
        }

        let joined = join::join(lanes, &archive_runs, &studies)?;
        let canonical = add_canonical(joined);
        Ok(species::build_species_tables(&canonical, domain, now))
    }

    /// Fetches sequentially: tracking lanes first, then the archive and
    /// registry lookups driven by the identifiers the lanes revealed.
    fn fetch_all(
        &self,
        domain: &DomainConfig,
    ) -> Result<(Vec<LaneRecord>, Vec<ArchiveRunRecord>, Vec<RegistryRecord>), DatapagesError> {
        let mut lanes = Vec::new();
        for database in &domain.databases {
            lanes.extend(self.tracking.fetch_lanes(database)?);
        }

        let study_accessions: Vec<String> = lanes
            .iter()
            .filter_map(|lane| lane.study_accession.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let archive_runs = self.archive.run_accessions(&study_accessions)?;
        let studies = self.registry.fetch_studies(&project_ssids(&lanes))?;
        Ok((lanes, archive_runs, studies))
    }
}

fn project_ssids(lanes: &[LaneRecord]) -> Vec<i64> {
    lanes
        .iter()
        .map(|lane| lane.project_ssid)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
