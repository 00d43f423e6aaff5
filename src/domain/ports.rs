use crate::config::ColumnMapping;
use crate::domain::model::{DidAnalysis, PanelTable, RunSummary};
use crate::utils::error::Result;

pub trait Storage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>>;
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

pub trait ConfigProvider {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn delimiter(&self) -> u8;
    fn columns(&self) -> &ColumnMapping;
    fn female_code(&self) -> &str;
    fn preview_rows(&self) -> usize;
    fn json_report(&self) -> bool;
    fn charts_enabled(&self) -> bool;
    fn chart_size(&self) -> (f64, f64);
}

pub trait Pipeline {
    fn extract(&self) -> Result<PanelTable>;
    fn transform(&self, panel: PanelTable) -> Result<DidAnalysis>;
    fn load(&self, analysis: DidAnalysis) -> Result<RunSummary>;
}
