use crate::{
    dir_utils::{copy_file, ensure_dir, require_dir, traverse_dir_files},
    error::{PrepError, PrepResult},
};
use log::{debug, info};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL_PREFIX: &str = "unrelaxed";
pub const DEFAULT_MODEL_EXTENSION: &str = "pdb";
pub const DEFAULT_EXPORT_TAG: &str = "AFM";

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Only files whose name starts with this are exported.
    pub prefix: String,
    pub extension: String,
    /// Leading token of every exported file name.
    pub tag: String,
}

impl ExportConfig {
    pub fn new(input_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            input_dir,
            output_dir,
            prefix: DEFAULT_MODEL_PREFIX.to_string(),
            extension: DEFAULT_MODEL_EXTENSION.to_string(),
            tag: DEFAULT_EXPORT_TAG.to_string(),
        }
    }

    pub fn validate(&self) -> PrepResult<()> {
        require_dir(&self.input_dir, "Model output directory")?;
        if self.tag.is_empty() {
            return Err(PrepError::invalid_input("Export tag must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedFile {
    pub source: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub input_dir: String,
    pub output_dir: String,
    pub scanned: usize,
    pub exported: Vec<ExportedFile>,
}

/// `<tag>_<parent folder>_<file name>`, or `None` when the file does not
/// carry the configured prefix.
pub fn export_name(path: &Path, config: &ExportConfig) -> Option<String> {
    let base_name = path.file_name()?.to_str()?;
    if !base_name.starts_with(&config.prefix) {
        return None;
    }
    let folder_name = path.parent()?.file_name()?.to_str()?;
    Some(format!("{}_{folder_name}_{base_name}", config.tag))
}

/// Copies every matching model file into one flat directory. Colliding
/// names overwrite each other in traversal order.
pub fn export_comb_pdbs(config: &ExportConfig) -> PrepResult<ExportReport> {
    config.validate()?;
    info!("input_dir: {}", config.input_dir.display());
    info!("output_dir: {}", config.output_dir.display());
    ensure_dir(&config.output_dir)?;

    let paths = traverse_dir_files(&config.input_dir, &config.extension)?;
    let mut exported = vec![];
    for path in &paths {
        let Some(output_name) = export_name(path, config) else {
            debug!("Skipping {}", path.display());
            continue;
        };
        let output_path = config.output_dir.join(output_name);
        copy_file(path, &output_path)?;
        exported.push(ExportedFile {
            source: path.display().to_string(),
            output: output_path.display().to_string(),
        });
    }
    info!("Exported {} of {} model files", exported.len(), paths.len());

    Ok(ExportReport {
        input_dir: config.input_dir.display().to_string(),
        output_dir: config.output_dir.display().to_string(),
        scanned: paths.len(),
        exported,
    })
}
