//! Lists every account balance

use anyhow::Context;
use balance_ledger::{Config, State};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match std::env::var("LEDGER_CONFIG") {
        Ok(path) => Config::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path))?,
        Err(_) => Config::from_env()?,
    };

    let state = State::open(&config).context("failed to open ledger state")?;

    println!("Accounts balances:");
    println!("__________________");
    println!();
    for (account, balance) in state.balances() {
        println!("{}: {}", account, balance);
    }

    state.close()?;
    Ok(())
}
