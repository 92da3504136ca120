//! Iris trainer entry point
//!
//! Runs the fixed training pipeline and prints the report. There are
//! no flags; every constant lives in `PipelineConfig::default()`.

use iris_trainer::pipeline::{self, PipelineConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iris_trainer=info".into()),
        )
        .init();

    let report = pipeline::run(&PipelineConfig::default())?;
    report.print();

    Ok(())
}
