use std::collections::BTreeMap;
use std::fs;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{ArchiveRunRecord, LaneRecord, RegistryRecord};
use crate::error::DatapagesError;

/// One domain's raw fetch results, as stored in the replay cache. Only for
/// offline replay of a previous run; nothing on the hot path reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedDomainData {
    pub project_ssids: Vec<i64>,
    pub ena_run_details: Vec<ArchiveRunRecord>,
    pub lane_details: Vec<LaneRecord>,
    pub ss_studies: Vec<RegistryRecord>,
}

type CacheFile = BTreeMap<String, CachedDomainData>;

/// Merges one domain's data into the cache file, creating it if needed.
pub fn save(
    cache_path: &Utf8Path,
    domain_name: &str,
    data: CachedDomainData,
) -> Result<(), DatapagesError> {
    let mut cache: CacheFile = match fs::read_to_string(cache_path.as_std_path()) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|_| {
            warn!("discarding unreadable cache at {cache_path}");
            CacheFile::new()
        }),
        Err(_) => CacheFile::new(),
    };
    cache.insert(domain_name.to_string(), data);

    let content = serde_json::to_vec(&cache)
        .map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
    let tmp_path = cache_path.with_extension("tmp");
    fs::write(tmp_path.as_std_path(), &content)
        .map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
    fs::rename(tmp_path.as_std_path(), cache_path.as_std_path())
        .map_err(|err| DatapagesError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Loads one domain's data back out of the cache file.
pub fn load(cache_path: &Utf8Path, domain_name: &str) -> Result<CachedDomainData, DatapagesError> {
    let content = fs::read_to_string(cache_path.as_std_path())
        .map_err(|err| DatapagesError::CacheRead(format!("{cache_path}: {err}")))?;
    let mut cache: CacheFile = serde_json::from_str(&content)
        .map_err(|err| DatapagesError::CacheRead(format!("{cache_path}: {err}")))?;
    cache.remove(domain_name).ok_or_else(|| {
        DatapagesError::CacheRead(format!("could not load {domain_name} from {cache_path}"))
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;

    use super::*;

    fn cached() -> CachedDomainData {
        CachedDomainData {
            project_ssids: vec![42],
            ena_run_details: vec![ArchiveRunRecord {
                study_accession: "ERP001".to_string(),
                run_accession: "ERR001".to_string(),
            }],
            lane_details: Vec::new(),
            ss_studies: Vec::new(),
        }
    }

    #[test]
    fn save_then_load_round_trips_per_domain() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("cache.json")).unwrap();

        save(&path, "bacteria", cached()).unwrap();
        save(&path, "viruses", cached()).unwrap();

        let reloaded = load(&path, "bacteria").unwrap();
        assert_eq!(reloaded.project_ssids, vec![42]);
        assert_eq!(reloaded.ena_run_details.len(), 1);

        let err = load(&path, "helminths").unwrap_err();
        assert_matches!(err, DatapagesError::CacheRead(_));
    }
}
