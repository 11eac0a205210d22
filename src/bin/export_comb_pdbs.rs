use anyhow::Context;
use clap::Parser;
use multimer_prep::{
    about::VERSION_TEXT,
    export_pdbs::{DEFAULT_EXPORT_TAG, DEFAULT_MODEL_PREFIX, ExportConfig, export_comb_pdbs},
    init_logging, print_json,
};
use std::path::PathBuf;

/// Copy model files from per-target run folders into one flat directory
#[derive(Parser, Debug)]
#[command(version = VERSION_TEXT, about)]
struct Args {
    /// Model output tree, one folder per target
    #[arg(short, long)]
    input_dir: PathBuf,

    #[arg(short, long)]
    output_dir: PathBuf,

    /// Only export files whose name starts with this
    #[arg(long, default_value = DEFAULT_MODEL_PREFIX)]
    prefix: String,

    /// Leading token of exported file names
    #[arg(long, default_value = DEFAULT_EXPORT_TAG)]
    tag: String,
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = ExportConfig {
        prefix: args.prefix,
        tag: args.tag,
        ..ExportConfig::new(args.input_dir, args.output_dir)
    };
    let report = export_comb_pdbs(&config).context("Model export failed")?;
    print_json(&report)
}

fn main() {
    init_logging();
    if let Err(e) = run(Args::parse()) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
