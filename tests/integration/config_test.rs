//! Configuration loading tests.

use std::io::Write;

use athena_query::{ErrorMode, QueryService, ServiceConfig};

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig::load_from_file(&dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.effective_workgroup(), "primary");
    assert_eq!(config.error_mode, ErrorMode::Propagate);
}

#[test]
fn test_service_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
region = "us-east-2"
database = "warehouse"
endpoint = "http://localhost:4566"

[poll]
max_polls = 100
"#
    )
    .unwrap();

    let config = ServiceConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.poll_policy().max_polls, Some(100));

    let service = QueryService::new(config).unwrap();
    assert_eq!(service.config().database, "warehouse");
}
