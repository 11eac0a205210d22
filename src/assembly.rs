//! Runs the external combinatorial assembly pipeline on a prepared working
//! directory and collects its results.
//!
//! Layout of a working directory:
//!
//! ```text
//! <work>/subunits.json        subunit registry
//! <work>/pdbs/                predicted subunit structures
//! <work>/tmp_assembled/       scratch output of the assembler, reset per run
//! <work>/assembled/           final copy of tmp_assembled/assembled_results
//! ```

use crate::{
    dir_utils::{copy_tree, ensure_dir, remove_tree, require_dir, require_file},
    error::{ErrorCode, PrepError, PrepResult},
};
use log::info;
use multimer_protocol::SUBUNITS_FILE_NAME;
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    process::Command,
};

pub const PDBS_DIR_NAME: &str = "pdbs";
pub const ASSEMBLED_DIR_NAME: &str = "assembled";
pub const TMP_ASSEMBLED_DIR_NAME: &str = "tmp_assembled";
pub const ASSEMBLED_RESULTS_DIR_NAME: &str = "assembled_results";

pub const ALLOWED_MAX_RESULTS: [u32; 4] = [1, 5, 10, 20];
pub const DEFAULT_MAX_RESULTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct AssemblyConfig {
    pub work_dir: PathBuf,
    pub max_results_number: u32,
    /// Ask the assembler for mmCIF instead of PDB output.
    pub output_cif: bool,
    /// Replace an existing `assembled/` folder instead of failing.
    pub overwrite: bool,
}

impl AssemblyConfig {
    pub fn new(work_dir: PathBuf) -> Self {
        Self {
            work_dir,
            max_results_number: DEFAULT_MAX_RESULTS,
            output_cif: false,
            overwrite: false,
        }
    }

    pub fn subunits_path(&self) -> PathBuf {
        self.work_dir.join(SUBUNITS_FILE_NAME)
    }

    pub fn pdbs_dir(&self) -> PathBuf {
        self.work_dir.join(PDBS_DIR_NAME)
    }

    pub fn assembled_dir(&self) -> PathBuf {
        self.work_dir.join(ASSEMBLED_DIR_NAME)
    }

    pub fn tmp_assembled_dir(&self) -> PathBuf {
        self.work_dir.join(TMP_ASSEMBLED_DIR_NAME)
    }

    pub fn validate(&self) -> PrepResult<()> {
        require_dir(&self.work_dir, "Working directory")?;
        require_file(&self.subunits_path(), "Subunit registry")?;
        require_dir(&self.pdbs_dir(), "Structure folder")?;
        if !ALLOWED_MAX_RESULTS.contains(&self.max_results_number) {
            return Err(PrepError::invalid_input(format!(
                "max results must be one of {ALLOWED_MAX_RESULTS:?}, got {}",
                self.max_results_number
            )));
        }
        Ok(())
    }
}

/// Arguments handed to one assembler invocation.
#[derive(Debug, Clone)]
pub struct AssemblyRequest {
    pub subunits_path: PathBuf,
    pub pdbs_dir: PathBuf,
    /// The assembler must create `assembled_results/` inside this folder.
    pub output_dir: PathBuf,
    pub max_results_number: u32,
    pub output_cif: bool,
}

pub trait Assembler {
    fn assemble(&self, request: &AssemblyRequest) -> PrepResult<()>;
}

/// Spawns an external program:
/// `<program> [args] --subunits S --pdbs P --output O --max-results N [--output-cif]`
#[derive(Debug, Clone)]
pub struct ExternalAssembler {
    pub program: String,
    pub args: Vec<String>,
}

impl ExternalAssembler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self, request: &AssemblyRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--subunits")
            .arg(&request.subunits_path)
            .arg("--pdbs")
            .arg(&request.pdbs_dir)
            .arg("--output")
            .arg(&request.output_dir)
            .arg("--max-results")
            .arg(request.max_results_number.to_string());
        if request.output_cif {
            cmd.arg("--output-cif");
        }
        cmd
    }
}

impl Assembler for ExternalAssembler {
    fn assemble(&self, request: &AssemblyRequest) -> PrepResult<()> {
        info!("Running assembler '{}'", self.program);
        let status = self.command(request).status().map_err(|e| {
            PrepError::new(
                ErrorCode::External,
                format!("Could not start assembler '{}': {e}", self.program),
            )
        })?;
        if !status.success() {
            return Err(PrepError::new(
                ErrorCode::External,
                format!("Assembler '{}' failed with {status}", self.program),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssemblyReport {
    pub work_dir: String,
    pub assembled_dir: String,
    pub replaced_previous: bool,
    pub files_copied: usize,
}

fn reset_dir(path: &Path) -> PrepResult<()> {
    if path.exists() {
        remove_tree(path)?;
    }
    ensure_dir(path).map(|_| ())
}

pub fn run_assembly(config: &AssemblyConfig, assembler: &dyn Assembler) -> PrepResult<AssemblyReport> {
    config.validate()?;
    let assembled_dir = config.assembled_dir();
    let tmp_dir = config.tmp_assembled_dir();

    let replaced_previous = assembled_dir.exists();
    if replaced_previous {
        if !config.overwrite {
            return Err(PrepError::new(
                ErrorCode::AlreadyExists,
                format!(
                    "'{}' already exists, pass overwrite to replace it",
                    assembled_dir.display()
                ),
            ));
        }
        info!("Deleting {}", assembled_dir.display());
        remove_tree(&assembled_dir)?;
    }
    reset_dir(&tmp_dir)?;

    let request = AssemblyRequest {
        subunits_path: config.subunits_path(),
        pdbs_dir: config.pdbs_dir(),
        output_dir: tmp_dir.clone(),
        max_results_number: config.max_results_number,
        output_cif: config.output_cif,
    };
    assembler.assemble(&request)?;

    let results_dir = tmp_dir.join(ASSEMBLED_RESULTS_DIR_NAME);
    if !results_dir.is_dir() {
        return Err(PrepError::new(
            ErrorCode::External,
            format!("Assembler produced no '{}'", results_dir.display()),
        ));
    }
    let files_copied = copy_tree(&results_dir, &assembled_dir)?;
    info!("Results saved to {}", assembled_dir.display());

    Ok(AssemblyReport {
        work_dir: config.work_dir.display().to_string(),
        assembled_dir: assembled_dir.display().to_string(),
        replaced_previous,
        files_copied,
    })
}
