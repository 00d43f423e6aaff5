use anyhow::Context;
use clap::Parser;
use union_did::core::ConfigProvider;
use union_did::utils::error::{DidError, ErrorSeverity};
use union_did::utils::{logger, validation::Validate};
use union_did::{CliConfig, DidEngine, DidPipeline, LocalStorage, TomlConfig};

fn report_failure(stage: &str, e: &DidError) -> ! {
    tracing::error!(
        "{} failed: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    eprintln!("{}", e.user_friendly_message());
    eprintln!("Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}

fn run_pipeline<C: ConfigProvider + Validate>(config: C) {
    if let Err(e) = config.validate() {
        report_failure("Configuration validation", &e);
    }

    let pipeline = DidPipeline::new(LocalStorage::current_dir(), config);
    let engine = DidEngine::new(pipeline);

    match engine.run() {
        Ok(summary) => {
            tracing::info!(
                "Analysis complete: {} pairs, regression {}",
                summary.n_pairs,
                if summary.regression_fitted {
                    "fitted"
                } else {
                    "unavailable"
                }
            );
            for chart in &summary.charts {
                eprintln!("Chart saved to: {}", chart);
            }
        }
        Err(e) => report_failure("DiD analysis", &e),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match cli.config.clone() {
        Some(path) => {
            let mut config = TomlConfig::from_file(&path)
                .with_context(|| format!("failed to load configuration from {}", path))?;
            cli.apply_overrides(&mut config);
            tracing::info!("Loaded configuration from {}", path);
            run_pipeline(config);
        }
        None => run_pipeline(cli),
    }

    Ok(())
}
