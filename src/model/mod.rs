use serde_json::Value;

/// Column written to sheets whose source returned no records.
pub const PLACEHOLDER_COLUMN: &str = "_no_rows";

/// Prefix of every pair label in the run result.
pub const LABEL_PREFIX: &str = "BusinessCentral";

/// One (company, resource) combination: one request and one sheet.
///
/// Pairs are deliberately not `Clone`; recording an outcome consumes the
/// pair, so each one resolves exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct FetchPair {
    pub company: String,
    pub resource: String,
}

impl FetchPair {
    pub fn new(company: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            resource: resource.into(),
        }
    }

    /// Builds every pair in configuration order: companies outer, resources inner.
    pub fn cartesian(companies: &[String], resources: &[String]) -> Vec<FetchPair> {
        companies
            .iter()
            .flat_map(|company| {
                resources
                    .iter()
                    .map(move |resource| FetchPair::new(company.clone(), resource.clone()))
            })
            .collect()
    }

    /// Identifier recorded in the run result and the summary file.
    pub fn label(&self) -> String {
        format!("{LABEL_PREFIX}/{}/{}", self.company, self.resource)
    }

    /// Raw sheet label before sanitisation.
    pub fn sheet_label(&self) -> String {
        format!("{}__{}", self.company, self.resource)
    }
}

/// Uniform tabular form of one payload. Every row holds exactly one cell per
/// column, missing fields are `Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl RowSet {
    /// Zero data rows with the placeholder column, so the sheet still has a header.
    pub fn placeholder() -> Self {
        Self {
            columns: vec![PLACEHOLDER_COLUMN.to_string()],
            rows: Vec::new(),
        }
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
