use crate::data_sources::{
    IdentificationRecord,
    SpectrumRetentionTime,
    read_mgf_retention_times,
    read_percolator_file,
};
use crate::errors::{
    Result,
    RtAlignError,
};
use crate::models::{
    PeptideSpectrumMatch,
    Peptidoform,
    SearchEngine,
    UnmappedModification,
};
use crate::modifications::ModificationMapping;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::{
    Path,
    PathBuf,
};
use tracing::{
    debug,
    warn,
};

pub const IDENTIFICATION_EXTENSION: &str = "pout";
pub const SPECTRUM_EXTENSION: &str = "mgf";

/// How records from a file are joined onto the PSMs a run already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Scans not yet in the run get a new PSM.
    #[default]
    Create,
    /// Only scans the run already holds are updated, the rest are dropped.
    EnrichOnly,
}

/// All PSMs from a single acquisition, keyed by scan number.
#[derive(Debug, Clone)]
pub struct Run {
    pub run_name: String,
    pub identification_dir: PathBuf,
    pub spectrum_dir: PathBuf,
    psms: BTreeMap<u32, PeptideSpectrumMatch>,
}

fn q_value_order(a: Option<f64>, b: Option<f64>) -> Ordering {
    a.unwrap_or(f64::INFINITY)
        .total_cmp(&b.unwrap_or(f64::INFINITY))
}

impl Run {
    pub fn new(
        run_name: impl Into<String>,
        identification_dir: impl Into<PathBuf>,
        spectrum_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            run_name: run_name.into(),
            identification_dir: identification_dir.into(),
            spectrum_dir: spectrum_dir.into(),
            psms: BTreeMap::new(),
        }
    }

    pub fn identification_path(&self) -> PathBuf {
        self.identification_dir
            .join(format!("{}.{}", self.run_name, IDENTIFICATION_EXTENSION))
    }

    pub fn spectrum_path(&self) -> PathBuf {
        self.spectrum_dir
            .join(format!("{}.{}", self.run_name, SPECTRUM_EXTENSION))
    }

    pub fn num_psms(&self) -> usize {
        self.psms.len()
    }

    pub fn psm(&self, scan: u32) -> Option<&PeptideSpectrumMatch> {
        self.psms.get(&scan)
    }

    /// PSMs in ascending scan order.
    pub fn psms(&self) -> impl Iterator<Item = &PeptideSpectrumMatch> {
        self.psms.values()
    }

    /// Returns the number of scans touched. Records whose identifier names
    /// another run are skipped.
    pub fn merge_identifications(
        &mut self,
        records: impl IntoIterator<Item = IdentificationRecord>,
        mode: MergeMode,
    ) -> usize {
        let mut touched = 0;
        let mut foreign = 0;
        for record in records {
            if record.identifier.run != self.run_name {
                foreign += 1;
                continue;
            }
            let scan = record.identifier.scan;
            let psm = match (self.psms.entry(scan), mode) {
                (Entry::Occupied(e), _) => e.into_mut(),
                (Entry::Vacant(e), MergeMode::Create) => e.insert(PeptideSpectrumMatch::new(scan)),
                (Entry::Vacant(_), MergeMode::EnrichOnly) => continue,
            };
            psm.set_peptidoform(record.peptidoform);
            psm.charge = Some(record.identifier.charge);
            psm.q_value = Some(record.q_value);
            psm.score = Some(record.score);
            touched += 1;
        }
        if foreign > 0 {
            warn!(
                "Skipped {} identifications belonging to other runs while loading {}",
                foreign, self.run_name
            );
        }
        touched
    }

    /// Returns the number of scans touched.
    pub fn merge_retention_times(
        &mut self,
        spectra: impl IntoIterator<Item = SpectrumRetentionTime>,
        mode: MergeMode,
    ) -> usize {
        let mut touched = 0;
        for spectrum in spectra {
            match (self.psms.entry(spectrum.scan), mode) {
                (Entry::Occupied(mut e), _) => {
                    e.get_mut().retention_time = Some(spectrum.retention_time);
                }
                (Entry::Vacant(e), MergeMode::Create) => {
                    e.insert(PeptideSpectrumMatch::unidentified(
                        spectrum.scan,
                        spectrum.retention_time,
                    ));
                }
                (Entry::Vacant(_), MergeMode::EnrichOnly) => continue,
            }
            touched += 1;
        }
        touched
    }

    /// Reads a percolator output file, by default `<identification_dir>/<run>.pout`.
    ///
    /// Returns the modification keys that were not in the label table.
    pub fn read_identifications(
        &mut self,
        path: Option<&Path>,
        search_engine: SearchEngine,
        mapping: Option<&ModificationMapping>,
        mode: MergeMode,
    ) -> Result<Vec<UnmappedModification>> {
        let path = path.map_or_else(|| self.identification_path(), Path::to_path_buf);
        let file = read_percolator_file(&path, search_engine, mapping)?;
        let touched = self.merge_identifications(file.records, mode);
        debug!(
            "Merged {} identifications into run {}",
            touched, self.run_name
        );
        Ok(file.unmapped)
    }

    /// Reads scan retention times, by default from `<spectrum_dir>/<run>.mgf`.
    pub fn read_spectrum_metadata(&mut self, path: Option<&Path>, mode: MergeMode) -> Result<()> {
        let path = path.map_or_else(|| self.spectrum_path(), Path::to_path_buf);
        let spectra = read_mgf_retention_times(&path)?;
        let touched = self.merge_retention_times(spectra, mode);
        debug!(
            "Merged {} retention times into run {}",
            touched, self.run_name
        );
        Ok(())
    }

    pub fn fraction_missing_retention_time(&self) -> Result<f64> {
        if self.psms.is_empty() {
            return Err(RtAlignError::EmptyRun {
                run: self.run_name.clone(),
            });
        }
        let missing = self
            .psms
            .values()
            .filter(|p| p.retention_time.is_none())
            .count();
        Ok(missing as f64 / self.psms.len() as f64)
    }

    /// The best PSM (lowest q-value, then lowest scan) of every identified peptidoform.
    /// A PSM without a q-value never beats one that has it.
    pub fn best_psm_per_variant(&self) -> BTreeMap<Peptidoform, &PeptideSpectrumMatch> {
        let mut out: BTreeMap<Peptidoform, &PeptideSpectrumMatch> = BTreeMap::new();
        for psm in self.psms.values() {
            let Some(key) = psm.peptidoform() else {
                continue;
            };
            match out.entry(key) {
                Entry::Vacant(e) => {
                    e.insert(psm);
                }
                Entry::Occupied(mut e) => {
                    // Scans come in ascending order so ties keep the earlier one.
                    if q_value_order(psm.q_value, e.get().q_value) == Ordering::Less {
                        e.insert(psm);
                    }
                }
            }
        }
        out
    }
}
