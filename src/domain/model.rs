use serde::{Deserialize, Serialize};
use std::fmt;

/// Panel person identifier. Integral ids order numerically, anything else as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersonId {
    Numeric(i64),
    Text(String),
}

impl PersonId {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match parse_integral(raw) {
            Some(n) => Some(PersonId::Numeric(n)),
            None => Some(PersonId::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonId::Numeric(n) => write!(f, "{}", n),
            PersonId::Text(s) => f.write_str(s),
        }
    }
}

/// Accepts `3` as well as `3.0`, which is how integer columns with gaps get exported.
pub fn parse_integral(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    let x = raw.parse::<f64>().ok()?;
    if x.is_finite() && x.fract() == 0.0 && x.abs() < i64::MAX as f64 {
        Some(x as i64)
    } else {
        None
    }
}

/// Numeric codes compare as numbers (`2` == `2.0`), anything else as trimmed text.
pub fn codes_match(value: &str, code: &str) -> bool {
    let (value, code) = (value.trim(), code.trim());
    match (value.parse::<f64>(), code.parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => value == code,
    }
}

/// One person-wave row of the input panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelRecord {
    pub person_id: PersonId,
    pub wave: i64,
    /// `None` when the indicator is missing or not a 0/1 value.
    pub union_status: Option<bool>,
    pub wage: Option<f64>,
    pub sex: Option<String>,
}

impl PanelRecord {
    pub fn is_union(&self) -> bool {
        self.union_status == Some(true)
    }

    pub fn is_non_union(&self) -> bool {
        self.union_status == Some(false)
    }

    pub fn is_female(&self, female_code: &str) -> bool {
        self.sex
            .as_deref()
            .map(|sex| codes_match(sex, female_code))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PanelTable {
    pub records: Vec<PanelRecord>,
    /// Rows dropped at load time because the person id or wave could not be read.
    pub skipped_rows: usize,
}

impl PanelTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A (pre, post) pair of adjacent waves for one person who was non-union at `wave_pre`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub person_id: PersonId,
    pub wave_pre: i64,
    pub wave_post: i64,
    /// Read from the post-wave row.
    pub female: bool,
    pub treated: bool,
    pub wage_pre: Option<f64>,
    pub wage_post: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn from_female(female: bool) -> Self {
        if female {
            Gender::Female
        } else {
            Gender::Male
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    Control,
    Treated,
}

impl Group {
    pub fn from_treated(treated: bool) -> Self {
        if treated {
            Group::Treated
        } else {
            Group::Control
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Group::Control => "Control",
            Group::Treated => "Treated",
        }
    }
}

/// Display order shared by the report and both charts.
pub const CELLS: [(Gender, Group); 4] = [
    (Gender::Male, Group::Control),
    (Gender::Male, Group::Treated),
    (Gender::Female, Group::Control),
    (Gender::Female, Group::Treated),
];

pub fn cell_label(gender: Gender, group: Group) -> String {
    format!("{}-{}", gender.label(), group.label())
}

/// A transition augmented with its outcome and labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DidRecord {
    #[serde(flatten)]
    pub transition: TransitionRecord,
    pub dwage: Option<f64>,
    pub gender: Gender,
    pub group: Group,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_stat: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OlsFit {
    pub dependent: String,
    pub coefficients: Vec<Coefficient>,
    /// Row-major parameter covariance matrix.
    pub covariance: Vec<Vec<f64>>,
    pub n_obs: usize,
    pub n_dropped: usize,
    pub df_model: usize,
    pub df_resid: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_stat: f64,
    pub f_p_value: f64,
    pub rss: f64,
    pub residual_variance: f64,
}

impl OlsFit {
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }
}

/// A linear combination of coefficients read as a treatment effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidEffect {
    pub label: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_stat: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DidEffects {
    pub male: DidEffect,
    pub female: DidEffect,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegressionOutcome {
    Fitted { fit: OlsFit, effects: DidEffects },
    Unavailable { reason: String },
}

/// Everything the load step needs to report and draw.
#[derive(Debug, Clone)]
pub struct DidAnalysis {
    pub records: Vec<DidRecord>,
    pub panel_rows: usize,
    pub skipped_rows: usize,
    pub regression: RegressionOutcome,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub n_pairs: usize,
    pub regression_fitted: bool,
    pub charts: Vec<String>,
}
