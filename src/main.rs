use catalogue_runner::{Runner, RunnerConfig, config::Cli};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Results go to stdout; logs stay on stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing .env is fine: flags and the environment still apply
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = RunnerConfig::from(&cli);
    let runner = Runner::new(config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = runner.run(&mut out).await {
        error!("catalogue run failed: {e:#}");
        return Err(e);
    }
    Ok(())
}
