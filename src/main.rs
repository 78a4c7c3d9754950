//! confsyncd - config file sync daemon.

use std::process;

use clap::Parser;
use confsync::{cli::Cli, config::Settings, daemon::Daemon, tracing_config};
use tracing::{Level, error, info, span};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut settings = match Settings::load(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("confsyncd: {e}");
            process::exit(1);
        }
    };
    cli.apply(&mut settings);

    let _guard = match tracing_config::init(&settings.general) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("confsyncd: failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    let _span = span!(Level::INFO, "confsyncd").entered();
    info!(file = %settings.file.display(), "Starting confsyncd");

    let result = async {
        let mut daemon = Daemon::bind(settings).await?;
        daemon.join_mesh().await?;
        daemon.run().await
    }
    .await;

    if let Err(e) = result {
        error!(error = %e, "confsyncd stopped");
        process::exit(1);
    }
}
