use crate::domain::model::RunSummary;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;

pub struct DidEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> DidEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn run(&self) -> Result<RunSummary> {
        tracing::info!("Starting DiD analysis");

        // Extract
        tracing::info!("Loading panel...");
        let panel = self.pipeline.extract()?;
        tracing::info!(
            "Loaded {} panel rows ({} skipped)",
            panel.len(),
            panel.skipped_rows
        );

        // Transform
        tracing::info!("Building transitions and fitting the model...");
        let analysis = self.pipeline.transform(panel)?;
        tracing::info!("Built {} transition records", analysis.records.len());

        // Load
        tracing::info!("Reporting...");
        let summary = self.pipeline.load(analysis)?;
        if !summary.charts.is_empty() {
            tracing::info!("Charts saved to: {}", summary.charts.join(", "));
        }

        Ok(summary)
    }
}
