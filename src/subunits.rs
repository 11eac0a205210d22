//! Subunit registry extraction: one FASTA file in, `subunits.json` out.

use crate::{
    dir_utils::{require_file, write_json_pretty},
    error::PrepResult,
    fasta::{SequenceRecord, read_fasta_file},
};
use log::{info, warn};
use multimer_protocol::{SubunitRecord, SubunitRegistry};
use serde::Serialize;
use std::{collections::HashMap, path::PathBuf};

#[derive(Debug, Clone)]
pub struct SubunitsConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl SubunitsConfig {
    pub fn validate(&self) -> PrepResult<()> {
        require_file(&self.input_path, "Input FASTA")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SubunitsReport {
    pub input: String,
    pub output: String,
    pub chain_count: usize,
    pub subunit_count: usize,
}

/// Groups chains by exact sequence. Groups, and chains inside each group,
/// keep first-seen order.
pub fn build_registry(records: &[SequenceRecord]) -> SubunitRegistry {
    let mut group_of_sequence: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Vec<String>)> = vec![];
    for record in records {
        let idx = *group_of_sequence
            .entry(record.sequence.as_str())
            .or_insert_with(|| {
                groups.push((record.sequence.as_str(), vec![]));
                groups.len() - 1
            });
        groups[idx].1.push(record.description.clone());
    }

    let mut registry = SubunitRegistry::new();
    for (sequence, chain_names) in groups {
        let Some(record) = SubunitRecord::from_chain_group(chain_names, sequence.to_string())
        else {
            continue;
        };
        let name = record.name.clone();
        if registry.insert(name.clone(), record).is_some() {
            warn!("Subunit name '{name}' produced by two sequence groups, keeping the later one");
        }
    }
    registry
}

pub fn generate_subunits(config: &SubunitsConfig) -> PrepResult<SubunitsReport> {
    config.validate()?;
    info!("input_path: {}", config.input_path.display());
    info!("output_path: {}", config.output_path.display());

    let records = read_fasta_file(&config.input_path)?;
    let registry = build_registry(&records);
    info!(
        "{} chains grouped into {} subunits",
        records.len(),
        registry.len()
    );
    write_json_pretty(&config.output_path, &registry)?;

    Ok(SubunitsReport {
        input: config.input_path.display().to_string(),
        output: config.output_path.display().to_string(),
        chain_count: records.len(),
        subunit_count: registry.len(),
    })
}
