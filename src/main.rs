use clap::Parser;
use glucose_export::{CliArgs, LoggingConfig, init_logging, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let _guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    run(cli).await
}
