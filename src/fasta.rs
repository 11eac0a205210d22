use crate::{
    dir_utils::require_file,
    error::{PrepError, PrepResult},
};
use bio::io::fasta;
use std::{fs::File, io::Read, path::Path};

/// One FASTA entry. `description` is the trimmed header line after `>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub description: String,
    pub sequence: String,
}

impl SequenceRecord {
    fn from_fasta_record(
        record: &fasta::Record,
        header: &str,
        source: &str,
    ) -> PrepResult<Self> {
        let description = header.trim().to_string();
        let sequence = std::str::from_utf8(record.seq())
            .map_err(|e| {
                PrepError::invalid_input(format!(
                    "Sequence '{description}' in '{source}' is not valid text: {e}"
                ))
            })?
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        Ok(Self {
            description,
            sequence,
        })
    }
}

/// Parses FASTA text from any reader; `source` only labels error messages.
///
/// bio splits each header into id and description and drops the separator,
/// so descriptions are taken from the header lines themselves. Every record
/// starts at exactly one `>` line.
pub fn parse_fasta<R: Read>(mut reader: R, source: &str) -> PrepResult<Vec<SequenceRecord>> {
    let mut text = String::new();
    reader.read_to_string(&mut text).map_err(|e| {
        PrepError::invalid_input(format!("Could not read FASTA '{source}': {e}"))
    })?;
    let headers = text
        .lines()
        .filter_map(|line| line.strip_prefix('>'))
        .collect::<Vec<_>>();

    let records = fasta::Reader::new(text.as_bytes())
        .records()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| PrepError::invalid_input(format!("Could not parse FASTA '{source}': {e}")))?;
    if records.len() != headers.len() {
        return Err(PrepError::invalid_input(format!(
            "FASTA '{source}' has {} headers but {} records",
            headers.len(),
            records.len()
        )));
    }
    records
        .iter()
        .zip(headers)
        .map(|(record, header)| SequenceRecord::from_fasta_record(record, header, source))
        .collect()
}

pub fn read_fasta_file(path: &Path) -> PrepResult<Vec<SequenceRecord>> {
    require_file(path, "FASTA file")?;
    let source = path.display().to_string();
    let file = File::open(path)
        .map_err(|e| PrepError::io(format!("Could not open FASTA '{source}': {e}")))?;
    parse_fasta(file, &source)
}
