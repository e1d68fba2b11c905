use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing::{error, info};

use vidsat::config::clobber_requested_by_env;
use vidsat::Config;

/// Share videos embedded in blog feeds.
#[derive(Parser, Debug)]
#[command(name = "vidsat", version, about)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "vidsat.toml")]
    config: PathBuf,

    /// Clear every feed's watermark before running (same as CLOBBER=1).
    #[arg(long)]
    clobber: bool,

    /// Log what would be shared without posting anything.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match Config::load_with_env(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            process::exit(1);
        }
    };

    if let Err(e) = vidsat::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        vidsat::logging::init_console_only(&config.logging.level);
    }

    if cli.dry_run {
        for blog in &mut config.blogs {
            blog.dry_run = true;
        }
    }
    let clobber = cli.clobber || clobber_requested_by_env();

    info!(
        "vidsat {}: {} feed(s), sharing to {}",
        env!("CARGO_PKG_VERSION"),
        config.blogs.len(),
        config.sharing.base_url()
    );

    let code = match vidsat::run(&config, clobber).await {
        Ok(summary) => summary.exit_code(),
        Err(e) => {
            error!("{e}");
            1
        }
    };
    process::exit(code);
}
