use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::Result;

/// Machine-readable record of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunSummary {
    /// UTC timestamp, `YYYYMMDD_HHMMSSZ`.
    pub timestamp: String,
    pub org: String,
    pub env: String,
    pub environment_name: String,
    pub companies: Vec<String>,
    pub apis: Vec<String>,
    pub excel_file: String,
    pub created: Vec<String>,
    pub failed: Vec<String>,
    pub empty: Vec<String>,
    pub expected_errors: usize,
}

impl RunSummary {
    /// File name the summary is stored under.
    pub fn file_name(&self) -> String {
        format!("bc-fetch-summary_{}.json", self.timestamp)
    }
}

/// Destination for run summaries.
pub trait SummarySink {
    /// Persists `summary` and returns where it went.
    fn save(&mut self, summary: &RunSummary) -> Result<PathBuf>;
}

/// Writes summaries as pretty JSON files into a directory.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SummarySink for JsonFileSink {
    fn save(&mut self, summary: &RunSummary) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(summary.file_name());
        let json = serde_json::to_string_pretty(summary)?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), "summary written");
        Ok(path)
    }
}
