//! Run configuration loaded from `{org}-{env}-config.json`.
//!
//! Decoding is strict: every key the fetch pipeline needs must be present, and
//! the company/resource lists must be non-empty. All of this is checked before
//! any network activity happens.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, ToolError};

const DEFAULT_SCOPE: &str = "https://api.businesscentral.dynamics.com/.default";
const EXAMPLE_SECTION: &str = r#"{"business-central": {"environment-name": "TestSE", "companies": ["TXO"], "apis": ["IntercompanyPartner"]}}"#;

/// Fully validated configuration for one run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunConfig {
    /// Organisation identifier taken from the command line.
    #[serde(skip)]
    pub org_id: String,
    /// Environment type (`test`, `prod`, ...) taken from the command line.
    #[serde(skip)]
    pub env_type: String,
    pub global: GlobalSettings,
    pub business_central: BusinessCentralSettings,
    pub script_behavior: ScriptBehavior,
}

/// Connection parameters shared by every request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GlobalSettings {
    pub api_base_url: String,
    pub api_version: String,
    pub tenant_id: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub token_url: Option<String>,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl GlobalSettings {
    /// OAuth2 token endpoint, defaulting to the tenant's v2.0 endpoint.
    pub fn token_endpoint(&self) -> String {
        self.token_url.clone().unwrap_or_else(|| {
            format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                self.tenant_id
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BusinessCentralSettings {
    pub environment_name: String,
    pub companies: Vec<String>,
    pub apis: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScriptBehavior {
    pub excel_output_filename: String,
    /// Fields removed from every record before export.
    #[serde(default = "default_drop_columns")]
    pub drop_columns: Vec<String>,
}

/// Contents of the optional `{org}-{env}-config-secrets.json` file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Secrets {
    #[serde(default)]
    pub client_secret: Option<String>,
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_drop_columns() -> Vec<String> {
    vec!["@odata.etag".to_string()]
}

/// Path of the main configuration file for an organisation/environment.
pub fn config_path(config_dir: &Path, org_id: &str, env_type: &str) -> PathBuf {
    config_dir.join(format!("{org_id}-{env_type}-config.json"))
}

/// Path of the secrets file for an organisation/environment.
pub fn secrets_path(config_dir: &Path, org_id: &str, env_type: &str) -> PathBuf {
    config_dir.join(format!("{org_id}-{env_type}-config-secrets.json"))
}

/// Loads and validates the run configuration from `config_dir`.
pub fn load(config_dir: &Path, org_id: &str, env_type: &str) -> Result<RunConfig> {
    let path = config_path(config_dir, org_id, env_type);
    if !path.exists() {
        return Err(ToolError::MissingConfig(path));
    }
    let source = fs::read_to_string(&path)?;
    debug!(path = %path.display(), "loaded configuration file");
    parse(&source, org_id, env_type)
}

/// Loads the secrets file if it exists; a missing file yields empty secrets.
pub fn load_secrets(config_dir: &Path, org_id: &str, env_type: &str) -> Result<Secrets> {
    let path = secrets_path(config_dir, org_id, env_type);
    if !path.exists() {
        debug!(path = %path.display(), "no secrets file present");
        return Ok(Secrets::default());
    }
    let source = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&source)?)
}

/// Decodes and validates a configuration document.
pub fn parse(source: &str, org_id: &str, env_type: &str) -> Result<RunConfig> {
    let mut config: RunConfig = serde_json::from_str(source).map_err(|error| {
        ToolError::invalid_config(
            format!("cannot read configuration: {error}"),
            "Check the 'global', 'business-central' and 'script-behavior' sections of the config file",
        )
    })?;
    config.org_id = org_id.to_string();
    config.env_type = env_type.to_string();
    config.validate()?;
    Ok(config)
}

impl RunConfig {
    /// Checks the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        let bc = &self.business_central;
        if bc.companies.is_empty() || bc.apis.is_empty() {
            return Err(ToolError::invalid_config(
                "No companies or APIs defined.",
                format!(
                    "Fill 'business-central.companies' and 'business-central.apis' in your org-env config, e.g. {EXAMPLE_SECTION}"
                ),
            ));
        }
        if bc.environment_name.trim().is_empty() {
            return Err(ToolError::invalid_config(
                "'business-central.environment-name' is empty.",
                "Set it to the Business Central environment, e.g. \"Production\"",
            ));
        }
        if self.script_behavior.excel_output_filename.trim().is_empty() {
            return Err(ToolError::invalid_config(
                "'script-behavior.excel-output-filename' is empty.",
                "Set it to the workbook file name, e.g. \"bc-config.xlsx\"",
            ));
        }
        Ok(())
    }

    /// Title-cased environment type used as the log context prefix.
    pub fn env_label(&self) -> String {
        let mut chars = self.env_type.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(companies: &str, apis: &str) -> String {
        format!(
            r#"{{
                "global": {{
                    "api-base-url": "https://api.businesscentral.dynamics.com/",
                    "api-version": "v2.0",
                    "tenant-id": "tenant"
                }},
                "business-central": {{
                    "environment-name": "TestSE",
                    "companies": {companies},
                    "apis": {apis}
                }},
                "script-behavior": {{ "excel-output-filename": "bc.xlsx" }}
            }}"#
        )
    }

    #[test]
    fn parses_complete_document_with_defaults() {
        let config = parse(&document(r#"["TXO"]"#, r#"["IntercompanyPartner"]"#), "txo", "test")
            .expect("valid config");

        assert_eq!(config.org_id, "txo");
        assert_eq!(config.env_label(), "Test");
        assert_eq!(config.global.timeout_seconds, 30);
        assert_eq!(config.global.max_retries, 3);
        assert_eq!(config.script_behavior.drop_columns, vec!["@odata.etag"]);
        assert_eq!(
            config.global.token_endpoint(),
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"
        );
    }

    #[test]
    fn rejects_empty_company_list() {
        let error = parse(&document("[]", r#"["Customers"]"#), "txo", "test").unwrap_err();
        assert!(matches!(error, ToolError::InvalidConfig { .. }));
        assert!(error.to_string().contains("No companies or APIs defined"));
    }

    #[test]
    fn rejects_empty_api_list() {
        let error = parse(&document(r#"["TXO"]"#, "[]"), "txo", "test").unwrap_err();
        assert!(matches!(error, ToolError::InvalidConfig { .. }));
    }

    #[test]
    fn missing_key_is_named() {
        let error = parse(r#"{"global": {"api-base-url": "x"}}"#, "txo", "test").unwrap_err();
        assert!(error.to_string().contains("api-version"));
    }
}
