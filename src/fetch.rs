use tracing::{error, info, instrument, warn};

use crate::client::RestClient;
use crate::config::RunConfig;
use crate::endpoint;
use crate::flatten::{SheetNameRegistry, normalize_payload};
use crate::io::excel_write::Sheets;
use crate::model::FetchPair;
use crate::results::RunResult;

/// Everything the fetch loop produced: sheets to export and the per-pair
/// outcomes.
#[derive(Debug, Default)]
pub struct FetchOutput {
    pub sheets: Sheets,
    pub result: RunResult,
}

/// Issues one request per (company, resource) pair, companies outer and
/// resources inner, in configuration order.
///
/// Per-pair failures are recorded and never stop the loop; nothing is
/// retried here.
#[instrument(
    level = "info",
    skip_all,
    fields(env = %config.env_label(), environment = %config.business_central.environment_name)
)]
pub fn fetch_all<C: RestClient + ?Sized>(config: &RunConfig, client: &mut C) -> FetchOutput {
    let bc = &config.business_central;
    let mut registry = SheetNameRegistry::default();
    let mut output = FetchOutput::default();

    for pair in FetchPair::cartesian(&bc.companies, &bc.apis) {
        fetch_pair(config, client, pair, &mut registry, &mut output);
    }

    info!(
        succeeded = output.result.succeeded_count(),
        failed = output.result.failed_count(),
        sheet_count = output.sheets.len(),
        "fetch loop finished"
    );
    output
}

#[instrument(
    level = "info",
    skip_all,
    fields(company = %pair.company, resource = %pair.resource)
)]
fn fetch_pair<C: RestClient + ?Sized>(
    config: &RunConfig,
    client: &mut C,
    pair: FetchPair,
    registry: &mut SheetNameRegistry,
    output: &mut FetchOutput,
) {
    let url = endpoint::resolve(
        &config.global,
        &config.business_central.environment_name,
        &pair.company,
        &pair.resource,
    );
    info!(%url, "GET");

    let payload = match client.get(&url) {
        Ok(payload) => payload,
        Err(fetch_error) => {
            error!(reason = %fetch_error.reason(), error = %fetch_error, "fetch failed");
            output.result.record_failure(pair, &fetch_error);
            return;
        }
    };

    let normalized = normalize_payload(&payload, &config.script_behavior.drop_columns);
    if normalized.shape.is_anomaly() {
        warn!(shape = ?normalized.shape, "unexpected response format; coercing to list");
        output.result.record_tolerated();
    }

    let rows = normalized.rows.len();
    if rows == 0 {
        warn!("returned 0 rows");
    } else {
        info!(rows, "retrieved rows");
    }

    let sheet_name = registry.assign(&pair.sheet_label());
    output.sheets.push((sheet_name, normalized.rows));
    output.result.record_success(pair, rows);
}
