use std::{fs, process};

use e820::{E820Table, MemoryConfig, Snapshot};
use snafu::{OptionExt as _, ResultExt as _};

use self::{
    args::{Args, BuildArgs, Command, ShowArgs},
    error::{CliError, Report},
};

mod args;
mod error;
mod logger;
mod term;

fn main() {
    let args: Args = argh::from_env();
    if let Err(err) = run(&args) {
        let report = Report::new(err);
        eprintln!("{report}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    logger::init(args.verbose).whatever_context("failed to install logger")?;
    match &args.command {
        Command::Build(args) => build(args),
        Command::Show(args) => show(args),
    }
}

fn build(args: &BuildArgs) -> Result<(), CliError> {
    let config = MemoryConfig::new(args.lowmem, args.highmem);
    let mut table: E820Table = E820Table::with_memory(&config)
        .whatever_context("failed to initialize guest memory map")?;

    table
        .reserve_all(args.reserve.iter().map(|arg| arg.0))
        .whatever_context("failed to reserve device windows")?;

    for request in &args.alloc {
        let address = table
            .allocate(
                request.length,
                request.alignment,
                request.kind,
                request.strategy,
            )
            .with_whatever_context(|_| format!("failed to allocate {request}"))?;
        log::info!("allocated {request} at {address:#x}");
    }

    print!("{table}");

    if let Some(path) = &args.output {
        let item = table
            .fwcfg_item()
            .whatever_context("guest memory map is empty")?;
        fs::write(path, &item.data).with_whatever_context(|_| {
            format!("failed to write {}, path={}", item.name, path.display())
        })?;
        log::info!(
            "wrote {} ({} bytes) to {}",
            item.name,
            item.data.len(),
            path.display()
        );
    }

    Ok(())
}

fn show(args: &ShowArgs) -> Result<(), CliError> {
    let bytes = fs::read(&args.path)
        .with_whatever_context(|_| format!("failed to read {}", args.path.display()))?;
    let snapshot = Snapshot::decode(&bytes)
        .with_whatever_context(|_| format!("failed to decode {}", args.path.display()))?;
    println!("E820 map:");
    for (i, entry) in snapshot.entries().iter().enumerate() {
        println!("  ({i:4}) {entry}");
    }
    Ok(())
}
