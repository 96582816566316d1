use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cutr::cli::{Cli, Commands};
use cutr::config::CutrConfig;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cutr=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = CutrConfig::load(cli.config.as_deref())?;

    // Model loads and forward passes all go through the blocking pool, whose
    // size is configuration; build the runtime by hand instead of by macro.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(config.engine.effective_worker_threads())
        .build()?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Serve {
                port,
                host,
                preload,
            } => cutr::cli::serve(config, port, host, preload).await,
            Commands::Run {
                input,
                model,
                output,
            } => cutr::cli::run(config, input, model, output).await,
            Commands::List { verbose } => cutr::cli::list(verbose).await,
        }
    })
}
