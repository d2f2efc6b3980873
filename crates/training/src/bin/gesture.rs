use clap::Parser;
use training::{run, RunArgs};

fn main() -> anyhow::Result<()> {
    run(RunArgs::parse())
}
