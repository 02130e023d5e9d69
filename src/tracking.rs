use mysql::prelude::Queryable;
use mysql::{OptsBuilder, Pool};
use tracing::info;

use crate::config::DbDetails;
use crate::domain::LaneRecord;
use crate::error::DatapagesError;

const LANE_QUERY: &str = "\
SELECT DISTINCT latest_project.name as internal_project_name,
                latest_sample.name as internal_sample_name,
                latest_lane.name as lane_name,
                latest_lane.acc as run_accession,
                latest_lane.withdrawn as withdrawn,
                latest_project.ssid as project_ssid,
                individual.acc as sample_accession,
                study.acc as study_accession,
                species.name as species_name
FROM            species,
                individual,
                latest_sample,
                library,
                latest_project,
                latest_lane,
                study
WHERE           latest_lane.library_id = library.library_id AND
                library.sample_id = latest_sample.sample_id AND
                latest_sample.individual_id = individual.individual_id AND
                latest_sample.project_id = latest_project.project_id AND
                species.species_id = individual.species_id AND
                study.study_id = latest_project.study_id";

pub trait TrackingClient: Send + Sync {
    /// Returns every lane the named tracking database knows about.
    fn fetch_lanes(&self, database: &str) -> Result<Vec<LaneRecord>, DatapagesError>;
}

/// Read-only client for the tracking MySQL server. The connection opens
/// inside the fetch call, so cache-replay runs never touch the network.
pub struct MysqlTrackingClient {
    details: DbDetails,
}

impl MysqlTrackingClient {
    pub fn new(details: DbDetails) -> Self {
        Self { details }
    }
}

impl TrackingClient for MysqlTrackingClient {
    fn fetch_lanes(&self, database: &str) -> Result<Vec<LaneRecord>, DatapagesError> {
        info!(
            host = %self.details.host,
            port = self.details.port,
            database,
            "getting lane details from tracking database"
        );
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(self.details.host.clone()))
            .tcp_port(self.details.port)
            .user(Some(self.details.user.clone()))
            .db_name(Some(database.to_string()));
        let pool = Pool::new(opts).map_err(|err| DatapagesError::Tracking(err.to_string()))?;
        let mut conn = pool
            .get_conn()
            .map_err(|err| DatapagesError::Tracking(err.to_string()))?;

        type LaneRow = (
            String,
            String,
            String,
            Option<String>,
            Option<i64>,
            i64,
            Option<String>,
            Option<String>,
            String,
        );
        let lanes = conn
            .query_map(
                LANE_QUERY,
                |(
                    internal_project_name,
                    internal_sample_name,
                    lane_name,
                    run_accession,
                    withdrawn,
                    project_ssid,
                    sample_accession,
                    study_accession,
                    species_name,
                ): LaneRow| LaneRecord {
                    internal_project_name,
                    internal_sample_name,
                    lane_name,
                    run_accession,
                    withdrawn: withdrawn == Some(1),
                    project_ssid,
                    sample_accession,
                    study_accession,
                    species_name,
                },
            )
            .map_err(|err| DatapagesError::Tracking(err.to_string()))?;
        Ok(lanes)
    }
}
