use serde::Serialize;

pub mod about;
pub mod assembly;
pub mod comb_msa;
pub mod dir_utils;
pub mod error;
pub mod export_pdbs;
pub mod fasta;
pub mod subunits;

pub use error::{ErrorCode, PrepError, PrepResult};
pub use multimer_protocol as protocol;

/// Logger setup shared by the command-line tools; `RUST_LOG` overrides the
/// default `info` level.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| anyhow::anyhow!("Could not serialize JSON output: {e}"))?;
    println!("{text}");
    Ok(())
}
