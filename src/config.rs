use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Fatal configuration problems; these abort the run before any output is
/// written.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("row_csv_name_template {0:?} must contain exactly one %s")]
    BadRowTemplate(String),
    #[error("output directory {0} already exists")]
    OutDirExists(PathBuf),
    #[error("invalid billing context in {path}: {source}")]
    BadContext {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Invoice text layout; `2015` renders Finnish dates, `2024` ISO dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, JsonSchema)]
pub enum InvoiceFormat {
    #[default]
    #[serde(rename = "2015")]
    Y2015,
    #[serde(rename = "2024")]
    Y2024,
}

/// One billing run, as described by a JSON configuration document.
///
/// All relative paths resolve against the directory of the configuration
/// file itself.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct Config {
    /// Positional simple-event CSV files.
    #[serde(default)]
    pub event_files: Vec<PathBuf>,
    /// Headered flight CSV files.
    #[serde(default)]
    pub flight_files: Vec<PathBuf>,
    /// Fixed-format bank transaction files.
    #[serde(default)]
    pub nda_files: Vec<PathBuf>,
    /// `account_id,birth_date` CSV files for the youth discount.
    #[serde(default)]
    pub birth_date_files: Vec<PathBuf>,
    /// One course-member account id per row.
    #[serde(default)]
    pub course_member_files: Vec<PathBuf>,
    /// Known account ids, one per line, `#` comments ignored.
    #[serde(default)]
    pub valid_id_files: Vec<PathBuf>,
    /// Upper-case account prefixes that are skipped before rule evaluation.
    #[serde(default)]
    pub no_invoicing_prefix: Vec<String>,
    /// Date stamped on every generated invoice (ISO).
    pub invoice_date: NaiveDate,
    /// Billing context snapshot to start from.
    pub context_file_in: Option<PathBuf>,
    /// Where to persist the final billing context.
    pub context_file_out: Option<PathBuf>,
    /// Output directory; must not exist yet.
    pub out_dir: PathBuf,
    /// Free-text header for the generated invoices.
    pub description: String,
    #[serde(default)]
    pub invoice_format: InvoiceFormat,
    #[serde(default = "default_total_csv_name")]
    pub total_csv_name: String,
    /// Per-year row export name; `%s` is replaced by the ledger year.
    #[serde(default = "default_row_csv_name_template")]
    pub row_csv_name_template: String,
    /// Only lift bank transactions inside `[start, end]` (ISO dates).
    pub bank_txn_dates: Option<(NaiveDate, NaiveDate)>,
    /// Own account IBANs to accept bank transactions from; empty accepts all.
    #[serde(default)]
    pub bank_ibans: Vec<String>,
}

fn default_total_csv_name() -> String {
    "totals.csv".to_string()
}

fn default_row_csv_name_template() -> String {
    "rows_%s.csv".to_string()
}

impl Config {
    /// Read and validate a configuration file, resolving relative paths
    /// against its directory and canonicalizing the prefixes to upper-case.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_paths(base_dir);
        for prefix in &mut config.no_invoicing_prefix {
            *prefix = prefix.to_uppercase();
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.row_csv_name_template.matches("%s").count() != 1 {
            return Err(ConfigError::BadRowTemplate(
                self.row_csv_name_template.clone(),
            ));
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        };
        for files in [
            &mut self.event_files,
            &mut self.flight_files,
            &mut self.nda_files,
            &mut self.birth_date_files,
            &mut self.course_member_files,
            &mut self.valid_id_files,
        ] {
            files.iter_mut().for_each(resolve);
        }
        if let Some(path) = self.context_file_in.as_mut() {
            resolve(path);
        }
        if let Some(path) = self.context_file_out.as_mut() {
            resolve(path);
        }
        resolve(&mut self.out_dir);
    }

    /// Name of the per-year row export file.
    pub fn row_csv_name(&self, ledger_year: i32) -> String {
        self.row_csv_name_template
            .replace("%s", &ledger_year.to_string())
    }
}
