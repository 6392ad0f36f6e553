//! CLI entrypoint: runs an `alloc:<N>` / `dealloc` script against the
//! allocator and prints both block lists.

use std::{
  io::{self, IsTerminal},
  path::PathBuf,
  process::ExitCode,
};

use clap::Parser;
use fitalloc::{
  Allocator, BufferHeap, HeapGrowth, List, Sbrk, Strategy,
  driver::{self, DriverError},
};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "FITALLOC_LOG";

/// Run an allocation script against the size-class allocator.
#[derive(Debug, Parser)]
#[command(name = "fitalloc", version)]
struct Cli {
  /// Placement strategy used to pick a free block.
  #[arg(long, value_enum, default_value_t = Strategy::FirstFit)]
  strategy: Strategy,
  /// Serve heap growth from a fixed buffer of this many bytes instead of sbrk.
  #[arg(long, value_name = "BYTES")]
  heap_limit: Option<usize>,
  /// Do not print the block lists after the run.
  #[arg(long)]
  no_listing: bool,
  /// Script of `alloc:<N>` and `dealloc` lines.
  script: PathBuf,
}

fn init_logging() {
  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .with_ansi(io::stderr().is_terminal())
    .with_target(false)
    .init();
}

fn run(cli: &Cli) -> Result<(), DriverError> {
  let steps = driver::load_script(&cli.script)?;

  let heap: Box<dyn HeapGrowth> = match cli.heap_limit {
    Some(bytes) => Box::new(BufferHeap::with_capacity(bytes)?),
    None => Box::new(Sbrk::new()),
  };
  let mut allocator = Allocator::new(cli.strategy.boxed(), heap);

  let outcome = driver::run_script(&mut allocator, &steps);

  let fatal = matches!(&outcome, Err(err) if err.is_fatal());

  if !cli.no_listing && !fatal {
    println!("Allocated blocks ({}):", allocator.strategy_name());
    print!("{}", allocator.listing(List::Allocated));
    println!("Free blocks:");
    print!("{}", allocator.listing(List::Free));
  }

  outcome.map(|_| ())
}

fn main() -> ExitCode {
  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(err) => {
      let _ = err.print();
      return if err.use_stderr() {
        ExitCode::FAILURE
      } else {
        ExitCode::SUCCESS
      };
    }
  };

  init_logging();

  match run(&cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) if err.is_fatal() => {
      eprintln!("Fatal error: {err}");
      eprintln!("Exiting.");
      ExitCode::FAILURE
    }
    Err(err) => {
      eprintln!("Error: {err}");
      ExitCode::FAILURE
    }
  }
}
