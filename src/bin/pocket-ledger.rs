use std::{fs::File, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use pocket_ledger::{
    bin_utils::{Service, import_people},
    processor::sqlite_processor::SqliteProcessor,
    store::{DEFAULT_DATABASE, StoreConfig},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// People, accounts, and their deposit/withdrawal ledger.
#[derive(Parser, Debug)]
#[command(name = "pocket-ledger", version)]
struct Args {
    /// SQLite database file, created on first use
    #[arg(long, env = "POCKET_LEDGER_DB", default_value = DEFAULT_DATABASE)]
    database: PathBuf,

    /// How long to wait for another writer before giving up
    #[arg(long, env = "POCKET_LEDGER_BUSY_TIMEOUT_MS", default_value_t = 5000)]
    busy_timeout_ms: u64,

    /// CSV of people (first_name,last_name,email,ip_address) to register before the menu starts
    #[arg(long)]
    import_people: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // logs go to stderr so they never interleave with the menu
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = StoreConfig::file(&args.database)
        .with_busy_timeout(Duration::from_millis(args.busy_timeout_ms));
    let mut processor = SqliteProcessor::open(&config).with_context(|| {
        format!("Failed to open ledger database `{}`", args.database.display())
    })?;
    info!(database = %args.database.display(), "ledger database ready");

    if let Some(path) = &args.import_people {
        let file =
            File::open(path).with_context(|| format!("Failed to open `{}`", path.display()))?;
        let ids = import_people(&mut processor, file)
            .with_context(|| format!("Failed to import people from `{}`", path.display()))?;
        info!(count = ids.len(), "people imported");
    }

    let stdin = std::io::stdin();
    let service = Service {
        input: stdin.lock(),
        output: &mut std::io::stdout(),
        processor: &mut processor,
    };
    service.run()
}
