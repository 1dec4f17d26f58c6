use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::client::RestClient;
use crate::config::RunConfig;
use crate::error::Result;
use crate::fetch::fetch_all;
use crate::io::excel_write;
use crate::io::summary::SummarySink;
use crate::report::{build_summary, status_line, utc_timestamp};
use crate::results::RunResult;

/// What a completed run leaves behind.
#[derive(Debug)]
pub struct RunOutcome {
    pub result: RunResult,
    pub status_line: String,
    pub workbook_path: PathBuf,
    pub summary_path: PathBuf,
}

/// Fetches every configured pair, writes the workbook into `output_dir`, and
/// persists the run summary through `sink`.
///
/// Only export and summary persistence errors are returned; pair failures
/// end up in [`RunOutcome::result`].
#[instrument(
    level = "info",
    skip_all,
    fields(org = %config.org_id, env = %config.env_type, output_dir = %output_dir.display())
)]
pub fn run<C, S>(
    config: &RunConfig,
    client: &mut C,
    sink: &mut S,
    output_dir: &Path,
) -> Result<RunOutcome>
where
    C: RestClient + ?Sized,
    S: SummarySink + ?Sized,
{
    let output = fetch_all(config, client);

    let workbook_path = output_dir.join(&config.script_behavior.excel_output_filename);
    excel_write::write_workbook(&workbook_path, &output.sheets)?;
    info!(
        path = %workbook_path.display(),
        sheet_count = output.sheets.len(),
        "wrote workbook"
    );

    let excel_file = workbook_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let summary = build_summary(config, &output.result, &excel_file, utc_timestamp());
    let summary_path = sink.save(&summary)?;
    info!(path = %summary_path.display(), "saved run summary");

    let status_line = status_line(&output.result);
    info!("{status_line}");

    Ok(RunOutcome {
        result: output.result,
        status_line,
        workbook_path,
        summary_path,
    })
}
