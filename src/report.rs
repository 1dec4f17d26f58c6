use chrono::{DateTime, Utc};

use crate::config::RunConfig;
use crate::io::summary::RunSummary;
use crate::results::RunResult;

/// Formats `moment` as `YYYYMMDD_HHMMSSZ`.
pub fn format_timestamp(moment: DateTime<Utc>) -> String {
    moment.format("%Y%m%d_%H%M%SZ").to_string()
}

/// Current UTC time as `YYYYMMDD_HHMMSSZ`.
pub fn utc_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// One-line human summary of the run.
pub fn status_line(result: &RunResult) -> String {
    let expected = result.expected_errors();
    let expected_note = if expected > 0 {
        format!(" ({expected} tolerated response anomalies)")
    } else {
        String::new()
    };

    if result.has_failures() {
        let failed = result.failed_count();
        format!(
            "❌ Completed with {failed} failures: {} succeeded, {failed} failed{expected_note}",
            result.succeeded_count()
        )
    } else {
        let succeeded = result.succeeded_count();
        format!("✅ All {succeeded} operations successful. {succeeded} sheets created{expected_note}")
    }
}

/// Structured record persisted after every completed run.
pub fn build_summary(
    config: &RunConfig,
    result: &RunResult,
    excel_file: &str,
    timestamp: String,
) -> RunSummary {
    let bc = &config.business_central;
    RunSummary {
        timestamp,
        org: config.org_id.clone(),
        env: config.env_type.clone(),
        environment_name: bc.environment_name.clone(),
        companies: bc.companies.clone(),
        apis: bc.apis.clone(),
        excel_file: excel_file.to_string(),
        created: result.succeeded(),
        failed: result.failed(),
        empty: result.empty(),
        expected_errors: result.expected_errors(),
    }
}
