use crate::config::{
    ColumnMapping, DEFAULT_CHART_SIZE, DEFAULT_FEMALE_CODE, DEFAULT_INPUT, DEFAULT_OUTPUT_DIR,
    DEFAULT_PREVIEW_ROWS, MAX_PREVIEW_ROWS,
};
use crate::core::ConfigProvider;
use crate::utils::error::{DidError, Result};
use crate::utils::validation::{
    validate_delimiter, validate_non_empty_string, validate_path, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub input: InputConfig,
    pub columns: ColumnMapping,
    pub coding: CodingConfig,
    pub report: ReportConfig,
    pub charts: ChartsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub path: String,
    pub delimiter: char,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_INPUT.to_string(),
            delimiter: ',',
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodingConfig {
    /// Value of the sex column that marks a woman. `2` and `"2"` are both accepted.
    #[serde(deserialize_with = "deserialize_code")]
    pub female_code: String,
}

impl Default for CodingConfig {
    fn default() -> Self {
        Self {
            female_code: DEFAULT_FEMALE_CODE.to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCode {
    Int(i64),
    Float(f64),
    Text(String),
}

fn deserialize_code<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawCode::deserialize(deserializer)? {
        RawCode::Int(n) => n.to_string(),
        RawCode::Float(x) => x.to_string(),
        RawCode::Text(s) => s,
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub preview_rows: usize,
    pub json: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            preview_rows: DEFAULT_PREVIEW_ROWS,
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    pub enabled: bool,
    pub output_dir: String,
    pub width: f64,
    pub height: f64,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            width: DEFAULT_CHART_SIZE.0,
            height: DEFAULT_CHART_SIZE.1,
        }
    }
}

impl TomlConfig {
    /// Load and parse a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DidError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text after `${VAR}` substitution.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| DidError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replace `${VAR}` with the environment value; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DidError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Reject unusable values before any processing.
    pub fn validate_config(&self) -> Result<()> {
        validate_path("input.path", &self.input.path)?;
        validate_delimiter("input.delimiter", self.input.delimiter)?;
        self.columns.validate()?;
        validate_non_empty_string("coding.female_code", &self.coding.female_code)?;
        validate_range(
            "report.preview_rows",
            self.report.preview_rows,
            0,
            MAX_PREVIEW_ROWS,
        )?;
        validate_path("charts.output_dir", &self.charts.output_dir)?;
        validate_range("charts.width", self.charts.width, 200.0, 4000.0)?;
        validate_range("charts.height", self.charts.height, 150.0, 4000.0)?;
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn output_path(&self) -> &str {
        &self.charts.output_dir
    }

    fn delimiter(&self) -> u8 {
        // Non-ASCII delimiters are rejected by validation.
        if self.input.delimiter.is_ascii() {
            self.input.delimiter as u8
        } else {
            b','
        }
    }

    fn columns(&self) -> &ColumnMapping {
        &self.columns
    }

    fn female_code(&self) -> &str {
        &self.coding.female_code
    }

    fn preview_rows(&self) -> usize {
        self.report.preview_rows
    }

    fn json_report(&self) -> bool {
        self.report.json
    }

    fn charts_enabled(&self) -> bool {
        self.charts.enabled
    }

    fn chart_size(&self) -> (f64, f64) {
        (self.charts.width, self.charts.height)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();

        assert_eq!(config.input_path(), DEFAULT_INPUT);
        assert_eq!(config.columns, ColumnMapping::default());
        assert_eq!(config.female_code(), "2");
        assert_eq!(config.preview_rows(), 5);
        assert!(config.charts_enabled());
        assert_eq!(config.chart_size(), (800.0, 600.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[input]
path = "data/panel.tsv"
delimiter = "\t"

[columns]
person_id = "id"
wave = "year"
union = "member"
sex = "gender"
wage = "hourly"

[coding]
female_code = "F"

[report]
preview_rows = 12
json = true

[charts]
enabled = false
output_dir = "figures"
width = 1024.0
height = 768.0
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.input_path(), "data/panel.tsv");
        assert_eq!(config.delimiter(), b'\t');
        assert_eq!(config.columns.wage, "hourly");
        assert_eq!(config.female_code(), "F");
        assert_eq!(config.preview_rows(), 12);
        assert!(config.json_report());
        assert!(!config.charts_enabled());
        assert_eq!(config.output_path(), "figures");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_numeric_female_code() {
        let config = TomlConfig::from_toml_str("[coding]\nfemale_code = 2\n").unwrap();
        assert_eq!(config.female_code(), "2");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("UNION_DID_TEST_PANEL", "psid_extract.csv");

        let toml_content = r#"
[input]
path = "${UNION_DID_TEST_PANEL}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.input.path, "psid_extract.csv");

        std::env::remove_var("UNION_DID_TEST_PANEL");
    }

    #[test]
    fn test_unset_env_var_is_left_as_written() {
        std::env::remove_var("UNION_DID_TEST_UNSET");

        let config =
            TomlConfig::from_toml_str("[input]\npath = \"${UNION_DID_TEST_UNSET}.csv\"\n").unwrap();
        assert_eq!(config.input.path, "${UNION_DID_TEST_UNSET}.csv");
    }

    #[test]
    fn test_config_validation() {
        let config = TomlConfig::from_toml_str(
            r#"
[columns]
wave = "pernum68"
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str("[charts]\nwidth = 10.0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let err = TomlConfig::from_toml_str("[input\npath = 1").unwrap_err();
        assert!(matches!(err, DidError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[report]\npreview_rows = 2\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.preview_rows(), 2);
    }
}
