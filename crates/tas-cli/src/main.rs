//! tas - interactive heap allocator simulator.

mod identifiers;
mod render;
mod session;

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tas::arena::{Heap, HeapConfig, Strategy};

use render::Palette;
use session::{Exit, Session};

/// Simulation program for heap memory management.
#[derive(Parser)]
#[command(name = "tas")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Arena size in bytes
    #[arg(short, long, default_value_t = HeapConfig::DEFAULT_ARENA_SIZE)]
    size: usize,

    /// Start in first-fit mode instead of best-fit
    #[arg(long)]
    first_fit: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn heap_config(&self) -> HeapConfig {
        let strategy = if self.first_fit {
            Strategy::FirstFit
        } else {
            Strategy::BestFit
        };
        HeapConfig::new(self.size).with_strategy(strategy)
    }
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -v.
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| filter.to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filter)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let heap = Heap::reserve(cli.heap_config())
        .with_context(|| format!("cannot reserve a {} byte arena", cli.size))?;
    let palette = if io::stdout().is_terminal() {
        Palette::ANSI
    } else {
        Palette::PLAIN
    };

    let mut session = Session::new(heap, io::stdout().lock(), io::stderr(), palette);
    session.start().context("writing to stdout")?;
    let exit = session.run(io::stdin().lock()).context("reading commands")?;
    info!("session ended: {:?}", session.heap().stats());
    session.finish();

    Ok(match exit {
        Exit::Quit => ExitCode::SUCCESS,
        Exit::EndOfInput => ExitCode::FAILURE,
    })
}
