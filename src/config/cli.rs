use crate::config::toml_config::TomlConfig;
use crate::config::{
    ColumnMapping, DEFAULT_CHART_SIZE, DEFAULT_FEMALE_CODE, DEFAULT_INPUT, DEFAULT_OUTPUT_DIR,
    DEFAULT_PREVIEW_ROWS, MAX_PREVIEW_ROWS,
};
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{validate_path, validate_range, Validate};
use clap::Parser;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "union-did")]
#[command(about = "Difference-in-differences estimate of union entry on wages, by gender")]
pub struct CliConfig {
    /// Panel CSV file [default: PanelStudyIncomeDynamics.csv]
    pub input: Option<String>,

    /// Directory the charts are written to [default: did_output]
    #[arg(long)]
    pub output_dir: Option<String>,

    /// TOML configuration file (column names, coding, report and chart settings)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Number of transition rows to preview [default: 5]
    #[arg(long)]
    pub preview_rows: Option<usize>,

    /// Skip rendering the charts
    #[arg(long)]
    pub no_charts: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,

    #[arg(skip)]
    pub columns: ColumnMapping,
}

impl CliConfig {
    /// Flags given on the command line win over the file.
    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.charts.output_dir = output_dir.clone();
        }
        if let Some(rows) = self.preview_rows {
            config.report.preview_rows = rows;
        }
        if self.no_charts {
            config.charts.enabled = false;
        }
        if self.json {
            config.report.json = true;
        }
    }
}

impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        self.input.as_deref().unwrap_or(DEFAULT_INPUT)
    }

    fn output_path(&self) -> &str {
        self.output_dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR)
    }

    fn delimiter(&self) -> u8 {
        b','
    }

    fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    fn female_code(&self) -> &str {
        DEFAULT_FEMALE_CODE
    }

    fn preview_rows(&self) -> usize {
        self.preview_rows.unwrap_or(DEFAULT_PREVIEW_ROWS)
    }

    fn json_report(&self) -> bool {
        self.json
    }

    fn charts_enabled(&self) -> bool {
        !self.no_charts
    }

    fn chart_size(&self) -> (f64, f64) {
        DEFAULT_CHART_SIZE
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("input", self.input_path())?;
        validate_path("output_dir", self.output_path())?;
        validate_range("preview_rows", self.preview_rows(), 0, MAX_PREVIEW_ROWS)?;
        self.columns.validate()
    }
}
