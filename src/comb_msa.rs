//! Builds per-target MSA folders by reusing search results from an existing
//! MSA library, matched on exact chain sequence.

use crate::{
    dir_utils::{
        copy_tree, ensure_dir, list_subdirs, name_before_first_dot, read_json, require_dir,
        traverse_dir_files, write_json_pretty,
    },
    error::{PrepError, PrepResult},
    fasta::read_fasta_file,
};
use itertools::Itertools;
use log::{debug, info, warn};
use multimer_protocol::{CHAIN_ID_MAP_FILE_NAME, ChainIdMap, ChainRecord};
use rayon::prelude::*;
use serde::Serialize;
use std::{
    collections::{HashMap, HashSet, hash_map::Entry},
    path::{Component, Path, PathBuf},
};

pub const DEFAULT_FASTA_EXTENSION: &str = "fasta";
pub const MSAS_DIR_NAME: &str = "msas";

#[derive(Debug, Clone)]
pub struct CombMsaConfig {
    pub input_dir: PathBuf,
    pub msa_path: PathBuf,
    pub output_dir: PathBuf,
    pub fasta_extension: String,
    /// Worker threads; 1 processes targets strictly in order.
    pub jobs: usize,
}

impl CombMsaConfig {
    pub fn new(input_dir: PathBuf, msa_path: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            input_dir,
            msa_path,
            output_dir,
            fasta_extension: DEFAULT_FASTA_EXTENSION.to_string(),
            jobs: 1,
        }
    }

    pub fn validate(&self) -> PrepResult<()> {
        require_dir(&self.input_dir, "FASTA input directory")?;
        require_dir(&self.msa_path, "MSA library")?;
        if self.jobs == 0 {
            return Err(PrepError::invalid_input("jobs must be at least 1"));
        }
        Ok(())
    }
}

/// Sequence to source folder index over an MSA library directory.
///
/// A chain-ID map key only enters the index when the library also holds a
/// top-level folder of that name. When several keys share one sequence the
/// first key in map order owns it.
#[derive(Debug, Clone)]
pub struct MsaLibrary {
    folder_of_sequence: HashMap<String, PathBuf>,
}

impl MsaLibrary {
    pub fn load(root: &Path) -> PrepResult<Self> {
        let chain_map: ChainIdMap = read_json(&root.join(CHAIN_ID_MAP_FILE_NAME))?;
        let folders: HashMap<String, PathBuf> = list_subdirs(root)?
            .into_iter()
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                Some((name, path))
            })
            .collect();

        let mut folder_of_sequence = HashMap::new();
        for (chain_id, record) in chain_map.iter() {
            let Some(folder) = folders.get(chain_id) else {
                debug!("Library chain '{chain_id}' has no MSA folder, dropped");
                continue;
            };
            match folder_of_sequence.entry(record.sequence.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(folder.clone());
                }
                Entry::Occupied(owner) => warn!(
                    "Library chain '{chain_id}' repeats the sequence of '{}', keeping the first",
                    owner.get().display()
                ),
            }
        }

        Ok(Self { folder_of_sequence })
    }

    pub fn len(&self) -> usize {
        self.folder_of_sequence.len()
    }

    pub fn folder_for(&self, sequence: &str) -> Option<&Path> {
        self.folder_of_sequence.get(sequence).map(PathBuf::as_path)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TargetReport {
    pub fasta: String,
    pub msa_dir: String,
    pub chain_count: usize,
    /// Chains whose MSA folder was copied in this run.
    pub copied: Vec<String>,
    /// Chains whose destination folder already existed.
    pub skipped_existing: Vec<String>,
    /// Chains whose sequence was already handled under an earlier chain.
    pub shared_sequence: Vec<String>,
    /// Chains with no library folder for their sequence.
    pub unmatched: Vec<String>,
    /// Matched chains whose name is not a single folder name, never copied.
    pub unsafe_name: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CombMsaReport {
    pub input_dir: String,
    pub msa_path: String,
    pub output_dir: String,
    pub library_sequences: usize,
    pub targets: Vec<TargetReport>,
}

impl CombMsaReport {
    pub fn copied_count(&self) -> usize {
        self.targets.iter().map(|t| t.copied.len()).sum()
    }
}

/// A chain name becomes a folder under `msas/`, so it must be exactly one
/// plain path component.
fn is_plain_folder_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn target_stem(fasta_path: &Path) -> PrepResult<String> {
    name_before_first_dot(fasta_path)
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            PrepError::invalid_input(format!(
                "Cannot derive a target name from '{}'",
                fasta_path.display()
            ))
        })
}

/// Materializes `<output_dir>/<stem>/msas/` for one target FASTA file.
pub fn recombine_target(
    fasta_path: &Path,
    library: &MsaLibrary,
    output_dir: &Path,
) -> PrepResult<TargetReport> {
    let stem = target_stem(fasta_path)?;
    let records = read_fasta_file(fasta_path)?;
    let msa_dir = output_dir.join(stem).join(MSAS_DIR_NAME);
    ensure_dir(&msa_dir)?;

    let mut report = TargetReport {
        fasta: fasta_path.display().to_string(),
        msa_dir: msa_dir.display().to_string(),
        chain_count: records.len(),
        ..Default::default()
    };
    let mut chain_map = ChainIdMap::new();
    let mut copied_sequences: HashSet<&str> = HashSet::new();

    for record in &records {
        let desc = record.description.as_str();
        let seq = record.sequence.as_str();
        if chain_map
            .insert(desc.to_string(), ChainRecord::new(desc, seq))
            .is_some()
        {
            warn!("Chain '{desc}' appears twice in '{}'", report.fasta);
        }

        let Some(source) = library.folder_for(seq) else {
            debug!("No MSA for chain '{desc}'");
            report.unmatched.push(desc.to_string());
            continue;
        };
        if !is_plain_folder_name(desc) {
            warn!("Chain '{desc}' cannot name an MSA folder, not copied");
            report.unsafe_name.push(desc.to_string());
            continue;
        }
        if !copied_sequences.insert(seq) {
            report.shared_sequence.push(desc.to_string());
            continue;
        }
        let destination = msa_dir.join(desc);
        if destination.exists() {
            info!("Keeping existing MSA folder {}", destination.display());
            report.skipped_existing.push(desc.to_string());
            continue;
        }
        let files = copy_tree(source, &destination)?;
        debug!(
            "Copied {files} files from {} to {}",
            source.display(),
            destination.display()
        );
        report.copied.push(desc.to_string());
    }

    write_json_pretty(&msa_dir.join(CHAIN_ID_MAP_FILE_NAME), &chain_map)?;
    info!("fasta done: {}", msa_dir.display());
    Ok(report)
}

fn recombine_in_order(
    paths: &[PathBuf],
    library: &MsaLibrary,
    output_dir: &Path,
) -> PrepResult<Vec<TargetReport>> {
    paths
        .iter()
        .map(|path| recombine_target(path, library, output_dir))
        .collect()
}

/// Targets sharing an output stem write the same folder, so each stem group
/// stays sequential while distinct groups run in parallel.
fn recombine_parallel(
    paths: &[PathBuf],
    library: &MsaLibrary,
    output_dir: &Path,
    jobs: usize,
) -> PrepResult<Vec<TargetReport>> {
    let groups = paths
        .iter()
        .map(|path| Ok((target_stem(path)?, path.clone())))
        .collect::<PrepResult<Vec<_>>>()?
        .into_iter()
        .into_group_map()
        .into_values()
        .collect::<Vec<_>>();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .map_err(|e| PrepError::io(format!("Could not start worker pool: {e}")))?;
    let mut reports = pool
        .install(|| {
            groups
                .par_iter()
                .map(|group| recombine_in_order(group, library, output_dir))
                .collect::<PrepResult<Vec<_>>>()
        })?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();
    reports.sort_by(|a, b| a.fasta.cmp(&b.fasta));
    Ok(reports)
}

pub fn generate_comb_msa(config: &CombMsaConfig) -> PrepResult<CombMsaReport> {
    config.validate()?;
    info!("input_dir: {}", config.input_dir.display());
    info!("msa_path: {}", config.msa_path.display());
    info!("output_dir: {}", config.output_dir.display());

    let library = MsaLibrary::load(&config.msa_path)?;
    ensure_dir(&config.output_dir)?;
    let paths = traverse_dir_files(&config.input_dir, &config.fasta_extension)?;
    info!(
        "fasta: {}, library sequences: {}",
        paths.len(),
        library.len()
    );

    let targets = if config.jobs > 1 {
        recombine_parallel(&paths, &library, &config.output_dir, config.jobs)?
    } else {
        recombine_in_order(&paths, &library, &config.output_dir)?
    };

    let report = CombMsaReport {
        input_dir: config.input_dir.display().to_string(),
        msa_path: config.msa_path.display().to_string(),
        output_dir: config.output_dir.display().to_string(),
        library_sequences: library.len(),
        targets,
    };
    info!(
        "Finished {} targets, {} MSA folders copied: {}",
        report.targets.len(),
        report.copied_count(),
        config.output_dir.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    struct Fixture {
        _td: TempDir,
        fastas: PathBuf,
        library: PathBuf,
        output: PathBuf,
    }

    fn write_library(root: &Path, chains: &[(&str, &str, bool)]) {
        fs::create_dir_all(root).unwrap();
        let mut map = ChainIdMap::new();
        for (id, seq, has_folder) in chains {
            map.insert(id.to_string(), ChainRecord::new(id, seq));
            if *has_folder {
                let folder = root.join(id);
                fs::create_dir_all(folder.join("uniref90")).unwrap();
                fs::write(folder.join("bfd_hits.a3m"), format!(">{id}\n{seq}\n")).unwrap();
                fs::write(folder.join("uniref90/hits.sto"), "# STOCKHOLM 1.0\n").unwrap();
            }
        }
        write_json_pretty(&root.join(CHAIN_ID_MAP_FILE_NAME), &map).unwrap();
    }

    fn fixture() -> Fixture {
        let td = tempdir().unwrap();
        let fastas = td.path().join("fastas");
        let library = td.path().join("library");
        let output = td.path().join("comb_msas");
        fs::create_dir_all(&fastas).unwrap();
        write_library(
            &library,
            &[("A", "MKT", true), ("B", "QRS", true), ("C", "WWW", false)],
        );
        Fixture {
            _td: td,
            fastas,
            library,
            output,
        }
    }

    fn config(f: &Fixture) -> CombMsaConfig {
        CombMsaConfig::new(f.fastas.clone(), f.library.clone(), f.output.clone())
    }

    fn read_map(path: &Path) -> ChainIdMap {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn library_index_drops_keys_without_folder() {
        let f = fixture();
        let library = MsaLibrary::load(&f.library).unwrap();
        assert_eq!(library.len(), 2);
        assert!(library.folder_for("MKT").unwrap().ends_with("A"));
        assert!(library.folder_for("WWW").is_none());
    }

    #[test]
    fn library_duplicate_sequence_keeps_first_key() {
        let td = tempdir().unwrap();
        write_library(td.path(), &[("X", "MKT", true), ("Y", "MKT", true)]);
        let library = MsaLibrary::load(td.path()).unwrap();
        assert_eq!(library.len(), 1);
        assert!(library.folder_for("MKT").unwrap().ends_with("X"));
    }

    #[test]
    fn library_without_chain_map_fails() {
        let td = tempdir().unwrap();
        let err = MsaLibrary::load(td.path()).unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingInput);

        fs::write(td.path().join(CHAIN_ID_MAP_FILE_NAME), "[1, 2]").unwrap();
        let err = MsaLibrary::load(td.path()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
    }

    #[test]
    fn copies_one_folder_per_distinct_sequence() {
        let f = fixture();
        fs::write(
            f.fastas.join("t1.fasta"),
            ">H1\nMKT\n>H2\nMKT\n>H3\nMKT\n>L1\nQRS\n>Z\nPPP\n",
        )
        .unwrap();

        let report = generate_comb_msa(&config(&f)).unwrap();
        let target = &report.targets[0];
        assert_eq!(target.copied, vec!["H1", "L1"]);
        assert_eq!(target.shared_sequence, vec!["H2", "H3"]);
        assert_eq!(target.unmatched, vec!["Z"]);

        let msa_dir = f.output.join("t1/msas");
        assert!(msa_dir.join("H1/bfd_hits.a3m").is_file());
        assert!(msa_dir.join("H1/uniref90/hits.sto").is_file());
        assert!(msa_dir.join("L1/bfd_hits.a3m").is_file());
        assert!(!msa_dir.join("H2").exists());
        assert!(!msa_dir.join("Z").exists());

        let map = read_map(&msa_dir.join(CHAIN_ID_MAP_FILE_NAME));
        assert_eq!(
            map.keys().collect::<Vec<_>>(),
            vec!["H1", "H2", "H3", "L1", "Z"]
        );
        assert_eq!(map.get("Z").unwrap(), &ChainRecord::new("Z", "PPP"));
    }

    #[test]
    fn second_run_copies_nothing_but_rewrites_map() {
        let f = fixture();
        let fasta = f.fastas.join("t1.fasta");
        fs::write(&fasta, ">A\nMKT\n>B\nQRS\n").unwrap();
        assert_eq!(generate_comb_msa(&config(&f)).unwrap().copied_count(), 2);

        fs::write(&fasta, ">A\nMKT\n>B\nQRS\n>C\nNEW\n").unwrap();
        let second = generate_comb_msa(&config(&f)).unwrap();
        assert_eq!(second.copied_count(), 0);
        assert_eq!(second.targets[0].skipped_existing, vec!["A", "B"]);
        let map = read_map(&f.output.join("t1/msas").join(CHAIN_ID_MAP_FILE_NAME));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn existing_destination_is_not_merged() {
        let f = fixture();
        fs::write(f.fastas.join("t1.fasta"), ">A\nMKT\n").unwrap();
        let existing = f.output.join("t1/msas/A");
        fs::create_dir_all(&existing).unwrap();

        generate_comb_msa(&config(&f)).unwrap();
        assert!(!existing.join("bfd_hits.a3m").exists());
    }

    #[test]
    fn scans_nested_fasta_files_and_uses_stem_before_first_dot() {
        let f = fixture();
        fs::create_dir_all(f.fastas.join("batch")).unwrap();
        fs::write(f.fastas.join("batch/7qrb.A2.fasta"), ">A\nMKT\n").unwrap();
        fs::write(f.fastas.join("ignored.txt"), ">A\nMKT\n").unwrap();

        let report = generate_comb_msa(&config(&f)).unwrap();
        assert_eq!(report.targets.len(), 1);
        assert!(f.output.join("7qrb/msas/A/bfd_hits.a3m").is_file());
    }

    fn tree_snapshot(root: &Path) -> Vec<(String, Vec<u8>)> {
        traverse_dir_files(root, "")
            .unwrap()
            .into_iter()
            .map(|path| {
                let rel = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
                (rel, fs::read(&path).unwrap())
            })
            .collect()
    }

    #[test]
    fn parallel_run_matches_sequential_output() {
        let f = fixture();
        fs::create_dir_all(f.fastas.join("rerun")).unwrap();
        for i in 0..6 {
            fs::write(
                f.fastas.join(format!("t{i}.fasta")),
                ">A\nMKT\n>B\nMKT\n>C\nQRS\n",
            )
            .unwrap();
        }
        // same stem as t0, processed after it in both modes
        fs::write(f.fastas.join("rerun/t0.fasta"), ">X\nQRS\n>A\nMKT\n").unwrap();

        let sequential = generate_comb_msa(&config(&f)).unwrap();
        let mut parallel = config(&f);
        parallel.output_dir = f.output.with_file_name("comb_msas_parallel");
        parallel.jobs = 4;
        let parallel_report = generate_comb_msa(&parallel).unwrap();

        assert_eq!(parallel_report.targets.len(), 7);
        assert_eq!(parallel_report.copied_count(), sequential.copied_count());
        let fastas = |r: &CombMsaReport| r.targets.iter().map(|t| t.fasta.clone()).collect::<Vec<_>>();
        assert_eq!(fastas(&parallel_report), fastas(&sequential));

        let expected = tree_snapshot(&f.output);
        assert!(!expected.is_empty());
        assert_eq!(tree_snapshot(&parallel.output_dir), expected);
    }

    #[test]
    fn chain_names_that_leave_the_msa_folder_are_not_copied() {
        let f = fixture();
        let outside = f.output.with_file_name("outside_everything");
        fs::write(
            f.fastas.join("t1.fasta"),
            format!(">{}\nMKT\n>../escape\nMKT\n>A\nMKT\n", outside.display()),
        )
        .unwrap();

        let report = generate_comb_msa(&config(&f)).unwrap();
        let target = &report.targets[0];
        assert_eq!(target.unsafe_name.len(), 2);
        assert_eq!(target.copied, vec!["A"]);
        assert!(!outside.exists());
        assert!(!f.output.join("t1/escape").exists());
        assert!(f.output.join("t1/msas/A/bfd_hits.a3m").is_file());

        let map = read_map(&f.output.join("t1/msas").join(CHAIN_ID_MAP_FILE_NAME));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn plain_folder_names() {
        assert!(is_plain_folder_name("A"));
        assert!(is_plain_folder_name("7qrb_A chain"));
        assert!(!is_plain_folder_name(""));
        assert!(!is_plain_folder_name("."));
        assert!(!is_plain_folder_name(".."));
        assert!(!is_plain_folder_name("a/b"));
        assert!(!is_plain_folder_name("/abs"));
    }

    #[test]
    fn broken_library_leaves_no_output_root() {
        let f = fixture();
        fs::write(f.library.join(CHAIN_ID_MAP_FILE_NAME), "{broken").unwrap();
        assert_eq!(
            generate_comb_msa(&config(&f)).unwrap_err().code,
            ErrorCode::InvalidInput
        );
        assert!(!f.output.exists());

        fs::remove_file(f.library.join(CHAIN_ID_MAP_FILE_NAME)).unwrap();
        assert_eq!(
            generate_comb_msa(&config(&f)).unwrap_err().code,
            ErrorCode::MissingInput
        );
        assert!(!f.output.exists());
    }

    #[test]
    fn missing_input_directory_is_rejected() {
        let f = fixture();
        let mut cfg = config(&f);
        cfg.input_dir = f.fastas.join("nope");
        assert_eq!(
            generate_comb_msa(&cfg).unwrap_err().code,
            ErrorCode::MissingInput
        );
        assert!(!f.output.exists());
    }

    #[test]
    fn zero_jobs_is_invalid() {
        let f = fixture();
        let mut cfg = config(&f);
        cfg.jobs = 0;
        assert_eq!(cfg.validate().unwrap_err().code, ErrorCode::InvalidInput);
    }
}
