use std::io::Write;
use std::path::Path;

use chrono::Local;

use crate::adapters::charts::{self, BAR_CHART_FILE, LINE_CHART_FILE};
use crate::adapters::panel_csv::PanelLoader;
use crate::core::aggregate::{cell_means, wave_series};
use crate::core::outcomes::derive_outcomes;
use crate::core::regression;
use crate::core::report::{render_json_report, render_text_report};
use crate::core::transitions::extract_transitions;
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{DidAnalysis, PanelTable, RegressionOutcome, RunSummary};
use crate::utils::error::Result;

pub struct DidPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> DidPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn chart_path(&self, file: &str) -> String {
        Path::new(self.config.output_path())
            .join(file)
            .to_string_lossy()
            .into_owned()
    }

    fn write_charts(&self, analysis: &DidAnalysis) -> Result<Vec<String>> {
        let size = self.config.chart_size();

        let bar = charts::render_bar_chart(&cell_means(&analysis.records), size)?;
        let bar_path = self.chart_path(BAR_CHART_FILE);
        self.storage.write_file(&bar_path, bar.as_bytes())?;

        let line = charts::render_line_chart(&wave_series(&analysis.records), size)?;
        let line_path = self.chart_path(LINE_CHART_FILE);
        self.storage.write_file(&line_path, line.as_bytes())?;

        Ok(vec![bar_path, line_path])
    }
}

impl<S: Storage, C: ConfigProvider> Pipeline for DidPipeline<S, C> {
    fn extract(&self) -> Result<PanelTable> {
        let input = self.config.input_path();
        tracing::debug!("Reading panel from {}", input);
        let data = self.storage.read_file(input)?;

        PanelLoader::new(self.config.columns(), self.config.delimiter()).load_bytes(&data)
    }

    fn transform(&self, panel: PanelTable) -> Result<DidAnalysis> {
        let panel_rows = panel.len();
        let skipped_rows = panel.skipped_rows;

        let transitions = extract_transitions(&panel.records, self.config.female_code());
        tracing::debug!("Extracted {} transitions", transitions.len());

        let records = derive_outcomes(transitions);
        let regression = regression::estimate(&records);

        Ok(DidAnalysis {
            records,
            panel_rows,
            skipped_rows,
            regression,
        })
    }

    fn load(&self, analysis: DidAnalysis) -> Result<RunSummary> {
        let generated = Local::now();
        let report = if self.config.json_report() {
            render_json_report(&analysis, self.config.preview_rows(), generated)?
        } else {
            render_text_report(&analysis, self.config.preview_rows(), generated)
        };

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", report.trim_end())?;
        stdout.flush()?;

        let charts = if self.config.charts_enabled() {
            self.write_charts(&analysis)?
        } else {
            tracing::debug!("Chart rendering disabled");
            Vec::new()
        };

        Ok(RunSummary {
            n_pairs: analysis.records.len(),
            regression_fitted: matches!(analysis.regression, RegressionOutcome::Fitted { .. }),
            charts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::TomlConfig;
    use crate::utils::error::DidError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemoryStorage {
        files: RefCell<HashMap<String, Vec<u8>>>,
    }

    impl MemoryStorage {
        fn with_file(path: &str, data: &str) -> Self {
            let storage = Self::default();
            storage
                .files
                .borrow_mut()
                .insert(path.to_string(), data.as_bytes().to_vec());
            storage
        }
    }

    impl Storage for MemoryStorage {
        fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            self.files.borrow().get(path).cloned().ok_or_else(|| {
                DidError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    path.to_string(),
                ))
            })
        }

        fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files.borrow_mut().insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    // Person 1: male, enters a union at wave 3. Person 2: female, stays non-union.
    const PANEL: &str = "\
pernum68,wave,unjob,sex,realhrwage
1,1,0,1,10.0
1,2,0,1,11.0
1,3,1,1,14.0
2,1,0,2,9.0
2,2,0,2,9.5
";

    fn config(toml: &str) -> TomlConfig {
        TomlConfig::from_toml_str(toml).unwrap()
    }

    #[test]
    fn test_extract_and_transform() {
        let pipeline = DidPipeline::new(
            MemoryStorage::with_file("panel.csv", PANEL),
            config("[input]\npath = \"panel.csv\"\n"),
        );

        let panel = pipeline.extract().unwrap();
        assert_eq!(panel.len(), 5);

        let analysis = pipeline.transform(panel).unwrap();
        assert_eq!(analysis.panel_rows, 5);
        assert_eq!(analysis.records.len(), 3);

        let treated: Vec<_> = analysis
            .records
            .iter()
            .filter(|r| r.transition.treated)
            .collect();
        assert_eq!(treated.len(), 1);
        assert_eq!(treated[0].transition.wave_post, 3);
        assert_eq!(treated[0].dwage, Some(3.0));

        // No treated women: the interaction gets a zero coefficient and the
        // three remaining cells use up every degree of freedom.
        match &analysis.regression {
            RegressionOutcome::Fitted { fit, .. } => {
                assert_eq!(fit.df_model, 2);
                assert_eq!(fit.df_resid, 0);
                assert!((fit.coefficient("treated").unwrap().estimate - 2.0).abs() < 1e-9);
                assert!(fit.coefficient("treated:female").unwrap().estimate.abs() < 1e-9);
            }
            RegressionOutcome::Unavailable { reason } => panic!("unexpected: {}", reason),
        }
    }

    #[test]
    fn test_load_writes_both_charts() {
        let pipeline = DidPipeline::new(
            MemoryStorage::with_file("panel.csv", PANEL),
            config("[input]\npath = \"panel.csv\"\n[charts]\noutput_dir = \"out\"\n"),
        );

        let analysis = pipeline.transform(pipeline.extract().unwrap()).unwrap();
        let summary = pipeline.load(analysis).unwrap();

        assert_eq!(summary.n_pairs, 3);
        assert!(summary.regression_fitted);
        assert_eq!(summary.charts.len(), 2);

        let files = pipeline.storage.files.borrow();
        let bar = files.get(&pipeline.chart_path(BAR_CHART_FILE)).unwrap();
        let line = files.get(&pipeline.chart_path(LINE_CHART_FILE)).unwrap();
        assert!(String::from_utf8_lossy(bar).starts_with("<svg"));
        assert!(String::from_utf8_lossy(line).contains("Male-Treated"));
    }

    #[test]
    fn test_charts_disabled() {
        let pipeline = DidPipeline::new(
            MemoryStorage::with_file("panel.csv", PANEL),
            config("[input]\npath = \"panel.csv\"\n[charts]\nenabled = false\n"),
        );

        let analysis = pipeline.transform(pipeline.extract().unwrap()).unwrap();
        let summary = pipeline.load(analysis).unwrap();

        assert!(summary.charts.is_empty());
        assert_eq!(pipeline.storage.files.borrow().len(), 1);
    }

    #[test]
    fn test_missing_input_file() {
        let pipeline = DidPipeline::new(MemoryStorage::default(), config(""));
        let err = pipeline.extract().unwrap_err();
        assert!(matches!(err, DidError::IoError(_)));
    }
}
