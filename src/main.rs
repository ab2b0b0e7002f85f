use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::{debug, info};

use shiftpaste::cli::{execute, Cli, StdinPaste};
use shiftpaste::state::EventStore;
use shiftpaste::{repl, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    // Initialize logging with custom format
    env_logger::Builder::from_env(Env::default().default_filter_or(config.logging.level.as_str()))
        .format(|buf, record| {
            use chrono::Local;
            use std::io::Write;
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    let store_path = match cli.store {
        Some(path) => path,
        None => config.store_path()?,
    };
    debug!("Using event store {}", store_path.display());
    let store = EventStore::new(store_path).with_max_file_size(config.store.max_file_bytes);

    match cli.command {
        Some(command) => {
            let output = execute(command, &store, &mut StdinPaste)?;
            print!("{}", output);
            Ok(())
        }
        None => {
            info!("Starting ShiftPaste interactive shell");
            repl::run(&store)
        }
    }
}
