//! `cargo-registry` admin binary

use anyhow::Result;
use cargo_registry::cli::{run, Cli};
use clap::Parser;

fn main() -> Result<()> {
    let _log_guard = cargo_registry_logging::init_subscriber();

    run(Cli::parse())
}
