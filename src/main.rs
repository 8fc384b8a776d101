mod cli;
mod config;
mod markdown;
mod model;
mod providers;
mod sync;
mod util;

use anyhow::Result;
use clap::Parser;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a local .env
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = config::load_config(cli.config.as_deref())?;
    cli::run(&cli, &config).await
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    // Honor RUST_LOG if set, otherwise use the verbosity flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info,reqwest=warn,hyper=warn"),
            1 => EnvFilter::new("debug,reqwest=info,hyper=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .init();
}
