use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use datapages::config::GlobalConfig;
use datapages::error::DatapagesError;

fn write_config(dir: &tempfile::TempDir, content: &str) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join("global.json")).unwrap();
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn resolves_a_complete_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "DATAPAGES_VRTRACK_HOST": "track-db.internal",
            "DATAPAGES_VRTRACK_PORT": 3306,
            "DATAPAGES_VRTRACK_RO_USER": "ro",
            "DATAPAGES_SEQUENCESCAPE_HOST": "ss-db.internal",
            "DATAPAGES_SEQUENCESCAPE_PORT": "3379",
            "DATAPAGES_SEQUENCESCAPE_RO_USER": "ss_ro",
            "DATAPAGES_SEQUENCESCAPE_DATABASE": "sequencescape",
            "DATAPAGES_SITE_DATA_DIR": "/srv/datapages/site"
        }"#,
    );

    let config = GlobalConfig::resolve(Some(path.as_path())).unwrap();
    assert_eq!(config.tracking.host, "track-db.internal");
    assert_eq!(config.tracking.port, 3306);
    assert_eq!(config.tracking.database, None);
    assert_eq!(config.registry.port, 3379);
    assert_eq!(config.registry.database.as_deref(), Some("sequencescape"));
    assert_eq!(
        config.site_data_dir.as_deref(),
        Some(camino::Utf8Path::new("/srv/datapages/site"))
    );
    assert_eq!(config.load_cache_path, None);
}

#[test]
fn missing_mandatory_keys_are_reported_together() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "DATAPAGES_VRTRACK_HOST": "track-db.internal",
            "DATAPAGES_VRTRACK_PORT": 3306,
            "DATAPAGES_VRTRACK_RO_USER": "ro",
            "DATAPAGES_SEQUENCESCAPE_HOST": "ss-db.internal",
            "DATAPAGES_SEQUENCESCAPE_PORT": 3379
        }"#,
    );

    let err = GlobalConfig::resolve(Some(path.as_path())).unwrap_err();
    assert_matches!(&err, DatapagesError::MissingConfigKeys(keys) => {
        assert_eq!(
            keys,
            "DATAPAGES_SEQUENCESCAPE_RO_USER and DATAPAGES_SEQUENCESCAPE_DATABASE"
        );
    });
}

#[test]
fn explicit_config_path_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("no_such.json")).unwrap();
    let err = GlobalConfig::resolve(Some(path.as_path())).unwrap_err();
    assert_matches!(err, DatapagesError::ConfigRead(_));
}

#[test]
fn non_numeric_port_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"{
            "DATAPAGES_VRTRACK_HOST": "track-db.internal",
            "DATAPAGES_VRTRACK_PORT": "not-a-port",
            "DATAPAGES_VRTRACK_RO_USER": "ro",
            "DATAPAGES_SEQUENCESCAPE_HOST": "ss-db.internal",
            "DATAPAGES_SEQUENCESCAPE_PORT": 3379,
            "DATAPAGES_SEQUENCESCAPE_RO_USER": "ss_ro",
            "DATAPAGES_SEQUENCESCAPE_DATABASE": "sequencescape"
        }"#,
    );

    let err = GlobalConfig::resolve(Some(path.as_path())).unwrap_err();
    assert_matches!(err, DatapagesError::ConfigParse(message) => {
        assert!(message.contains("DATAPAGES_VRTRACK_PORT"));
    });
}
