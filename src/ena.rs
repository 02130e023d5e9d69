use std::thread;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::info;

use crate::domain::ArchiveRunRecord;
use crate::error::DatapagesError;

/// ENA accepts at most this many accessions per request; one fixed sleep
/// between batches keeps us under its rate limit.
const MAX_ACCESSIONS: usize = 20;
const BATCH_WAIT: Duration = Duration::from_secs(1);

pub trait ArchiveClient: Send + Sync {
    /// Returns every {study, run} accession pair the archive lists for the
    /// given studies. Studies with no run link are skipped, not errors.
    fn run_accessions(
        &self,
        study_accessions: &[String],
    ) -> Result<Vec<ArchiveRunRecord>, DatapagesError>;
}

pub struct EnaHttpClient {
    client: Client,
    base_url: String,
    study_re: Regex,
    run_link_re: Regex,
}

impl EnaHttpClient {
    pub fn new() -> Result<Self, DatapagesError> {
        Self::with_base_url("https://www.ebi.ac.uk/ena/browser/api/xml".to_string())
    }

    pub fn with_base_url(base_url: String) -> Result<Self, DatapagesError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("datapages/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| DatapagesError::ArchiveHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| DatapagesError::ArchiveHttp(err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            study_re: Regex::new(r#"(?s)<STUDY\b[^>]*\baccession="([^"]+)"[^>]*>(.*?)</STUDY>"#)
                .unwrap(),
            run_link_re: Regex::new(r"(?s)<DB>ENA-RUN</DB>\s*<ID>([^<]+)</ID>").unwrap(),
        })
    }

    fn fetch_group(
        &self,
        study_accessions: &[String],
    ) -> Result<Vec<ArchiveRunRecord>, DatapagesError> {
        if study_accessions.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/{}", self.base_url, study_accessions.join(","));
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| DatapagesError::ArchiveHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "ENA request failed".to_string());
            return Err(DatapagesError::ArchiveStatus { status, message });
        }
        let body = response
            .text()
            .map_err(|err| DatapagesError::ArchiveHttp(err.to_string()))?;
        self.parse_study_xml(&body)
    }

    /// Pulls the ENA-RUN cross-reference out of each STUDY block and
    /// expands its compact run-id ranges.
    fn parse_study_xml(&self, body: &str) -> Result<Vec<ArchiveRunRecord>, DatapagesError> {
        let mut records = Vec::new();
        for study in self.study_re.captures_iter(body) {
            let study_accession = &study[1];
            let Some(run_link) = self.run_link_re.captures(&study[2]) else {
                continue;
            };
            for run_accession in parse_run_ranges(run_link[1].trim())? {
                records.push(ArchiveRunRecord {
                    study_accession: study_accession.to_string(),
                    run_accession,
                });
            }
        }
        Ok(records)
    }
}

impl ArchiveClient for EnaHttpClient {
    fn run_accessions(
        &self,
        study_accessions: &[String],
    ) -> Result<Vec<ArchiveRunRecord>, DatapagesError> {
        if study_accessions.is_empty() {
            return Ok(Vec::new());
        }
        info!(
            studies = study_accessions.len(),
            "fetching run accessions from ENA"
        );
        let mut groups = study_accessions.chunks(MAX_ACCESSIONS);
        let mut records = match groups.next() {
            Some(group) => self.fetch_group(group)?,
            None => Vec::new(),
        };
        for group in groups {
            thread::sleep(BATCH_WAIT);
            records.extend(self.fetch_group(group)?);
        }
        Ok(records)
    }
}

/// Expands one compact identifier range. `ABC001-ABC005` becomes the five
/// identifiers in between, zero-padded to the width of the first bound;
/// a bare identifier expands to itself.
pub fn expand_id_range(id_range: &str) -> Result<Vec<String>, DatapagesError> {
    let range_re = Regex::new(r"^([a-zA-Z]+)([0-9]+)-([a-zA-Z]+)([0-9]+)$").unwrap();
    let bare_re = Regex::new(r"^[a-zA-Z]+[0-9]+$").unwrap();

    let Some(captures) = range_re.captures(id_range) else {
        if bare_re.is_match(id_range) {
            return Ok(vec![id_range.to_string()]);
        }
        return Err(DatapagesError::MalformedIdentifier(id_range.to_string()));
    };

    let (prefix, first, second_prefix, second) = (&captures[1], &captures[2], &captures[3], &captures[4]);
    if prefix != second_prefix {
        return Err(DatapagesError::MalformedIdentifier(id_range.to_string()));
    }
    let width = first.len();
    let first: u64 = first
        .parse()
        .map_err(|_| DatapagesError::MalformedIdentifier(id_range.to_string()))?;
    let second: u64 = second
        .parse()
        .map_err(|_| DatapagesError::MalformedIdentifier(id_range.to_string()))?;

    Ok((first..=second)
        .map(|num| format!("{prefix}{num:0width$}"))
        .collect())
}

/// Expands a comma-separated list of ranges into the full identifier list.
pub fn parse_run_ranges(run_ids: &str) -> Result<Vec<String>, DatapagesError> {
    let mut ids = Vec::new();
    for id_range in run_ids.split(',') {
        ids.extend(expand_id_range(id_range)?);
    }
    Ok(ids)
}
