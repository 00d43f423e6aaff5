pub mod aggregate;
pub mod etl;
pub mod outcomes;
pub mod regression;
pub mod report;
pub mod transitions;

pub use crate::domain::model::{DidAnalysis, DidRecord, PanelRecord, PanelTable, TransitionRecord};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
