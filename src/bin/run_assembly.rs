use anyhow::Context;
use clap::Parser;
use multimer_prep::{
    about::VERSION_TEXT,
    assembly::{AssemblyConfig, DEFAULT_MAX_RESULTS, ExternalAssembler, run_assembly},
    init_logging, print_json,
};
use std::path::PathBuf;

/// Run the combinatorial assembler on a working directory holding
/// subunits.json and pdbs/, collecting results into assembled/
#[derive(Parser, Debug)]
#[command(version = VERSION_TEXT, about)]
struct Args {
    #[arg(short, long)]
    work_dir: PathBuf,

    /// Number of assemblies to keep (1, 5, 10 or 20)
    #[arg(long = "max-results", default_value_t = DEFAULT_MAX_RESULTS)]
    max_results_number: u32,

    /// Write mmCIF instead of PDB
    #[arg(long)]
    output_cif: bool,

    /// Replace an existing assembled/ folder
    #[arg(long)]
    overwrite: bool,

    /// Assembler executable
    #[arg(long)]
    assembler: String,

    /// Leading argument for the assembler, repeatable
    #[arg(long = "assembler-arg", allow_hyphen_values = true)]
    assembler_args: Vec<String>,
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = AssemblyConfig {
        max_results_number: args.max_results_number,
        output_cif: args.output_cif,
        overwrite: args.overwrite,
        ..AssemblyConfig::new(args.work_dir)
    };
    let assembler = ExternalAssembler::new(args.assembler, args.assembler_args);
    let report = run_assembly(&config, &assembler).context("Assembly run failed")?;
    print_json(&report)
}

fn main() {
    init_logging();
    if let Err(e) = run(Args::parse()) {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
