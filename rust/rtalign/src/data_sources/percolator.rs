use crate::errors::IdentificationReadingError;
use crate::models::{
    Peptidoform,
    PsmIdentifier,
    SearchEngine,
    UnmappedModification,
};
use crate::modifications::ModificationMapping;
use serde::Deserialize;
use std::path::Path;
use tracing::{
    debug,
    info,
};

/// A single row of a percolator PSM output (`.pout`) file.
/// Other columns (`posterior_error_prob`, `proteinIds`, ...) are ignored.
#[derive(Debug, Clone, Deserialize)]
struct PercolatorRow {
    #[serde(rename = "PSMId")]
    #[serde(alias = "SpecId")]
    psm_id: String,
    score: f64,
    #[serde(rename = "q-value")]
    q_value: f64,
    peptide: String,
}

/// One parsed identification, ready to be joined onto a run by scan number.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentificationRecord {
    pub identifier: PsmIdentifier,
    pub peptidoform: Peptidoform,
    pub score: f64,
    pub q_value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct IdentificationFile {
    pub records: Vec<IdentificationRecord>,
    /// Modification keys missing from the label table, one entry per occurrence.
    pub unmapped: Vec<UnmappedModification>,
}

pub fn read_percolator_file<T: AsRef<Path>>(
    file: T,
    search_engine: SearchEngine,
    mapping: Option<&ModificationMapping>,
) -> Result<IdentificationFile, IdentificationReadingError> {
    let path = file.as_ref();
    let file_handle =
        std::fs::File::open(path).map_err(|source| IdentificationReadingError::Io {
            source,
            path: path.to_path_buf(),
        })?;

    // Protein lists are sometimes written as extra tab separated columns.
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(file_handle);

    let csv_err = |source: csv::Error| IdentificationReadingError::Csv {
        source,
        path: path.to_path_buf(),
    };

    info!("Reading identifications from {}", path.display());
    let headers = rdr.headers().map_err(csv_err)?.clone();

    let mut out = IdentificationFile::default();
    for result in rdr.records() {
        let record = result.map_err(csv_err)?;
        let row: PercolatorRow = record.deserialize(Some(&headers)).map_err(csv_err)?;
        let line = record.position().map_or(0, |p| p.line());

        let identifier = search_engine
            .parse_identifier(&row.psm_id)
            .map_err(|source| IdentificationReadingError::Identifier {
                source,
                path: path.to_path_buf(),
                line,
            })?;

        let parsed = Peptidoform::parse_annotated(&row.peptide, mapping);
        out.unmapped.extend(parsed.unmapped);
        out.records.push(IdentificationRecord {
            identifier,
            peptidoform: parsed.peptidoform,
            score: row.score,
            q_value: row.q_value,
        });
    }

    debug!(
        "Parsed {} identifications ({} unmapped modifications) from {}",
        out.records.len(),
        out.unmapped.len(),
        path.display()
    );
    Ok(out)
}
