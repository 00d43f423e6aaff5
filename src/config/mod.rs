#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::utils::error::Result;
use crate::utils::validation::{validate_distinct, validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};

pub const DEFAULT_INPUT: &str = "PanelStudyIncomeDynamics.csv";
pub const DEFAULT_OUTPUT_DIR: &str = "did_output";
pub const DEFAULT_FEMALE_CODE: &str = "2";
pub const DEFAULT_PREVIEW_ROWS: usize = 5;
pub const DEFAULT_CHART_SIZE: (f64, f64) = (800.0, 600.0);
pub const MAX_PREVIEW_ROWS: usize = 10_000;

/// Input headers for each logical panel column. Defaults follow the PSID extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub person_id: String,
    pub wave: String,
    pub union: String,
    pub sex: String,
    pub wage: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            person_id: "pernum68".to_string(),
            wave: "wave".to_string(),
            union: "unjob".to_string(),
            sex: "sex".to_string(),
            wage: "realhrwage".to_string(),
        }
    }
}

impl ColumnMapping {
    pub fn fields(&self) -> [(&'static str, &str); 5] {
        [
            ("columns.person_id", &self.person_id),
            ("columns.wave", &self.wave),
            ("columns.union", &self.union),
            ("columns.sex", &self.sex),
            ("columns.wage", &self.wage),
        ]
    }
}

impl Validate for ColumnMapping {
    fn validate(&self) -> Result<()> {
        let fields = self.fields();
        for (field, name) in fields {
            validate_non_empty_string(field, name)?;
        }
        let names: Vec<&str> = fields.iter().map(|(_, name)| *name).collect();
        validate_distinct("columns", &names)
    }
}
