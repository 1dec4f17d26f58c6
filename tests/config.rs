use std::fs;
use std::path::Path;

use bc_fetch::ToolError;
use bc_fetch::config;
use tempfile::tempdir;

#[test]
fn bundled_example_config_is_valid() {
    let config_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("config");
    let loaded = config::load(&config_dir, "example", "test").expect("example config loads");

    assert_eq!(loaded.business_central.companies, vec!["TXO"]);
    assert_eq!(loaded.business_central.apis.len(), 2);
    assert_eq!(loaded.env_label(), "Test");
}

#[test]
fn missing_config_file_is_reported_with_path() {
    let temp_dir = tempdir().expect("temporary directory");
    let error = config::load(temp_dir.path(), "acme", "prod").unwrap_err();

    match error {
        ToolError::MissingConfig(path) => {
            assert!(path.ends_with("acme-prod-config.json"));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn secrets_are_optional() {
    let temp_dir = tempdir().expect("temporary directory");
    let secrets = config::load_secrets(temp_dir.path(), "acme", "prod").expect("no secrets file");
    assert!(secrets.client_secret.is_none());

    fs::write(
        config::secrets_path(temp_dir.path(), "acme", "prod"),
        r#"{"client-secret": "s3cret"}"#,
    )
    .expect("secrets written");
    let secrets = config::load_secrets(temp_dir.path(), "acme", "prod").expect("secrets parsed");
    assert_eq!(secrets.client_secret.as_deref(), Some("s3cret"));
}

#[test]
fn blank_output_filename_is_rejected() {
    let document = r#"{
        "global": {"api-base-url": "https://bc", "api-version": "v2.0", "tenant-id": "t"},
        "business-central": {"environment-name": "Prod", "companies": ["A"], "apis": ["X"]},
        "script-behavior": {"excel-output-filename": "  "}
    }"#;
    let error = config::parse(document, "acme", "prod").unwrap_err();
    assert!(error.to_string().contains("excel-output-filename"));
}
