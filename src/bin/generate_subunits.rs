use anyhow::Context;
use clap::Parser;
use multimer_prep::{
    about::VERSION_TEXT,
    init_logging, print_json,
    subunits::{SubunitsConfig, generate_subunits},
};
use std::path::PathBuf;

/// Group FASTA chains with identical sequences into a subunits.json registry
#[derive(Parser, Debug)]
#[command(version = VERSION_TEXT, about)]
struct Args {
    /// FASTA file with one record per chain
    #[arg(short, long)]
    input_path: PathBuf,

    /// Registry JSON to write
    #[arg(short, long)]
    output_path: PathBuf,
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = SubunitsConfig {
        input_path: args.input_path,
        output_path: args.output_path,
    };
    let report = generate_subunits(&config).context("Subunit extraction failed")?;
    print_json(&report)
}

fn main() {
    init_logging();
    if let Err(e) = run(Args::parse()) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
