use anyhow::Context;
use clap::Parser;
use multimer_prep::{
    about::VERSION_TEXT,
    comb_msa::{CombMsaConfig, DEFAULT_FASTA_EXTENSION, generate_comb_msa},
    init_logging, print_json,
};
use std::path::PathBuf;

/// Build per-target MSA folders from an existing MSA library
#[derive(Parser, Debug)]
#[command(version = VERSION_TEXT, about)]
struct Args {
    /// Directory scanned recursively for target FASTA files
    #[arg(short, long)]
    input_dir: PathBuf,

    /// MSA library with chain_id_map.json and one folder per chain
    #[arg(short, long)]
    msa_path: PathBuf,

    /// Root for the <target>/msas output folders
    #[arg(short, long)]
    output_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_FASTA_EXTENSION)]
    extension: String,

    /// Targets processed in parallel
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = CombMsaConfig {
        fasta_extension: args.extension,
        jobs: args.jobs,
        ..CombMsaConfig::new(args.input_dir, args.msa_path, args.output_dir)
    };
    let report = generate_comb_msa(&config).context("MSA recombination failed")?;
    print_json(&report)
}

fn main() {
    init_logging();
    if let Err(e) = run(Args::parse()) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
