use std::thread;
use std::time::Duration;

use mysql::prelude::Queryable;
use mysql::{OptsBuilder, Pool, PooledConn};
use tracing::info;

use crate::config::DbDetails;
use crate::domain::RegistryRecord;
use crate::error::DatapagesError;

/// Query batch size and pause, matching the archive client's politeness
/// settings for the shared registry server.
const MAX_SSIDS: usize = 20;
const BATCH_WAIT: Duration = Duration::from_secs(1);

pub trait RegistryClient: Send + Sync {
    /// Returns every study/sample pair the registry holds for the given
    /// project ssids.
    fn fetch_studies(&self, project_ssids: &[i64]) -> Result<Vec<RegistryRecord>, DatapagesError>;
}

pub struct MysqlRegistryClient {
    details: DbDetails,
}

impl MysqlRegistryClient {
    pub fn new(details: DbDetails) -> Self {
        Self { details }
    }

    fn connect(&self) -> Result<PooledConn, DatapagesError> {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(self.details.host.clone()))
            .tcp_port(self.details.port)
            .user(Some(self.details.user.clone()))
            .db_name(self.details.database.clone());
        let pool = Pool::new(opts).map_err(|err| DatapagesError::Registry(err.to_string()))?;
        pool.get_conn()
            .map_err(|err| DatapagesError::Registry(err.to_string()))
    }

    fn fetch_group(
        conn: &mut PooledConn,
        project_ssids: &[i64],
    ) -> Result<Vec<RegistryRecord>, DatapagesError> {
        if project_ssids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; project_ssids.len()].join(",");
        let query = format!(
            "\
SELECT  study.internal_id as project_ssid,
        study.accession_number as study_accession,
        study.study_title as study_title,
        study.name as study_name,
        sample.name as sample_name,
        sample.accession_number as sample_accession,
        sample.common_name as sample_common_name,
        sample.organism as sample_organism,
        sample.public_name as sample_public_name,
        sample.strain as sample_strain,
        sample.supplier_name as sample_supplier_name
FROM    current_studies study,
        current_study_samples study_sample,
        current_samples sample
WHERE   study.internal_id IN ({placeholders}) AND
        study_sample.study_internal_id=study.internal_id AND
        sample.internal_id=study_sample.sample_internal_id"
        );

        type RegistryRow = (
            i64,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        );
        conn.exec_map(
            query,
            project_ssids.to_vec(),
            |(
                project_ssid,
                study_accession,
                study_title,
                study_name,
                sample_name,
                sample_accession,
                sample_common_name,
                sample_organism,
                sample_public_name,
                sample_strain,
                sample_supplier_name,
            ): RegistryRow| RegistryRecord {
                project_ssid,
                study_accession,
                study_title,
                study_name,
                sample_name,
                sample_accession,
                sample_common_name,
                sample_organism,
                sample_public_name,
                sample_strain,
                sample_supplier_name,
            },
        )
        .map_err(|err| DatapagesError::Registry(err.to_string()))
    }
}

impl RegistryClient for MysqlRegistryClient {
    fn fetch_studies(&self, project_ssids: &[i64]) -> Result<Vec<RegistryRecord>, DatapagesError> {
        if project_ssids.is_empty() {
            return Ok(Vec::new());
        }
        info!(
            host = %self.details.host,
            projects = project_ssids.len(),
            "getting study details from registry database"
        );
        let mut conn = self.connect()?;
        let mut groups = project_ssids.chunks(MAX_SSIDS);
        let mut studies = match groups.next() {
            Some(group) => Self::fetch_group(&mut conn, group)?,
            None => Vec::new(),
        };
        for group in groups {
            thread::sleep(BATCH_WAIT);
            studies.extend(Self::fetch_group(&mut conn, group)?);
        }
        Ok(studies)
    }
}
