use crate::calibration::{
    CalibrationOptions,
    CollectionCalibration,
    calibrate_rows,
};
use crate::errors::{
    Result,
    RtAlignError,
};
use crate::models::{
    SearchEngine,
    UnmappedModification,
    usi,
};
use crate::modifications::ModificationMapping;
use crate::observer::{
    CollectionEvent,
    CollectionObserver,
};
use crate::run::{
    MergeMode,
    Run,
    SPECTRUM_EXTENSION,
};
use globset::{
    GlobBuilder,
    GlobMatcher,
};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{
    BTreeMap,
    BTreeSet,
};
use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;
use tracing::{
    debug,
    info,
};

pub const DEFAULT_SPECTRUM_SUBDIR: &str = "mgf";
pub const DEFAULT_IDENTIFICATION_SUBDIR: &str = "pout";

/// How runs added to a collection are read.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub search_engine: SearchEngine,
    pub modification_mapping: Option<ModificationMapping>,
    /// Read identifications and spectrum metadata as runs are added.
    /// When false the runs are only registered.
    pub eager: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            search_engine: SearchEngine::default(),
            modification_mapping: None,
            eager: true,
        }
    }
}

/// A modification key without a label, found while loading `run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    pub run: String,
    pub modification: UnmappedModification,
}

/// One PSM of the flattened collection table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PsmRow {
    pub collection: Arc<str>,
    pub run: Arc<str>,
    pub scan: u32,
    pub sequence: Option<String>,
    pub modifications: Option<String>,
    pub charge: Option<u8>,
    pub retention_time: Option<f64>,
    pub q_value: Option<f64>,
    pub score: Option<f64>,
}

impl PsmRow {
    pub fn usi(&self, project_id: &str) -> String {
        usi(project_id, &self.run, self.scan)
    }
}

/// Compiles a shell style pattern (`*`, `?`, `[ab]`, `[!ab]`, `{a,b}`) into a
/// matcher over spectrum file names.
fn run_pattern_matcher(pattern: &str) -> Result<GlobMatcher> {
    GlobBuilder::new(&format!("{}.{}", pattern, SPECTRUM_EXTENSION))
        .literal_separator(true)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|e| RtAlignError::InvalidRunPattern {
            pattern: pattern.to_string(),
            msg: e.to_string(),
        })
}

/// A named group of runs that share a root directory and are calibrated together.
///
/// Spectrum files live in `<root_dir>/<spectrum_subdir>/<run>.mgf` and
/// identifications in `<root_dir>/<identification_subdir>/<run>.pout`.
#[derive(Debug, Clone)]
pub struct RunCollection {
    pub name: String,
    pub root_dir: PathBuf,
    pub spectrum_subdir: String,
    pub identification_subdir: String,
    runs: BTreeMap<String, Run>,
}

impl RunCollection {
    pub fn new(name: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root_dir: root_dir.into(),
            spectrum_subdir: DEFAULT_SPECTRUM_SUBDIR.to_string(),
            identification_subdir: DEFAULT_IDENTIFICATION_SUBDIR.to_string(),
            runs: BTreeMap::new(),
        }
    }

    pub fn with_subdirs(
        mut self,
        spectrum_subdir: impl Into<String>,
        identification_subdir: impl Into<String>,
    ) -> Self {
        self.spectrum_subdir = spectrum_subdir.into();
        self.identification_subdir = identification_subdir.into();
        self
    }

    pub fn spectrum_dir(&self) -> PathBuf {
        self.root_dir.join(&self.spectrum_subdir)
    }

    pub fn identification_dir(&self) -> PathBuf {
        self.root_dir.join(&self.identification_subdir)
    }

    pub fn num_runs(&self) -> usize {
        self.runs.len()
    }

    /// Run names in ascending order.
    pub fn run_names(&self) -> impl Iterator<Item = &str> {
        self.runs.keys().map(|x| x.as_str())
    }

    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.runs.values()
    }

    pub fn run(&self, name: &str) -> Result<&Run> {
        self.runs.get(name).ok_or_else(|| RtAlignError::UnknownRun {
            run: name.to_string(),
        })
    }

    /// Adds an already built run, replacing any run with the same name.
    pub fn insert_run(&mut self, run: Run) -> Option<Run> {
        self.runs.insert(run.run_name.clone(), run)
    }

    /// Names of the spectrum files matching `pattern`, without extension, sorted.
    pub fn discover_run_names(&self, pattern: &str) -> Result<Vec<String>> {
        let matcher = run_pattern_matcher(pattern)?;
        let dir = self.spectrum_dir();
        let io_err = |source: std::io::Error| RtAlignError::Io {
            source,
            path: Some(dir.clone()),
        };

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if !path.is_file() {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|x| x.to_str()) else {
                continue;
            };
            if !matcher.is_match(file_name) {
                continue;
            }
            if let Some(stem) = Path::new(file_name).file_stem().and_then(|x| x.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        debug!(
            "Pattern '{}' matched {} runs in {}",
            pattern,
            names.len(),
            dir.display()
        );
        Ok(names)
    }

    /// Adds every run whose spectrum file matches `pattern`.
    pub fn add_runs_by_glob(
        &mut self,
        pattern: &str,
        options: &LoadOptions,
        observer: &dyn CollectionObserver,
    ) -> Result<Vec<LoadWarning>> {
        let names = self.discover_run_names(pattern)?;
        observer.on_event(&CollectionEvent::RunsDiscovered {
            collection: &self.name,
            num_runs: names.len(),
        });
        self.add_runs(names, options, observer)
    }

    pub fn add_runs_by_list<S: AsRef<str>>(
        &mut self,
        names: &[S],
        options: &LoadOptions,
        observer: &dyn CollectionObserver,
    ) -> Result<Vec<LoadWarning>> {
        let names = names.iter().map(|x| x.as_ref().to_string()).collect();
        self.add_runs(names, options, observer)
    }

    fn add_runs(
        &mut self,
        names: Vec<String>,
        options: &LoadOptions,
        observer: &dyn CollectionObserver,
    ) -> Result<Vec<LoadWarning>> {
        let names: BTreeSet<String> = names.into_iter().collect();
        let identification_dir = self.identification_dir();
        let spectrum_dir = self.spectrum_dir();
        let collection = self.name.as_str();

        let loaded = names
            .into_par_iter()
            .map(|name| -> Result<(Run, Vec<UnmappedModification>)> {
                let mut run = Run::new(name, identification_dir.clone(), spectrum_dir.clone());
                if !options.eager {
                    return Ok((run, Vec::new()));
                }

                // Spectra that were never identified must not enter the PSM map.
                let unmapped = run.read_identifications(
                    None,
                    options.search_engine,
                    options.modification_mapping.as_ref(),
                    MergeMode::Create,
                )?;
                run.read_spectrum_metadata(None, MergeMode::EnrichOnly)?;

                observer.on_event(&CollectionEvent::RunLoaded {
                    collection,
                    run: &run.run_name,
                    num_psms: run.num_psms(),
                    fraction_missing_retention_time: run.fraction_missing_retention_time().ok(),
                });
                Ok((run, unmapped))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut warnings = Vec::new();
        for (run, unmapped) in loaded {
            let mut occurrences: BTreeMap<&str, usize> = BTreeMap::new();
            for m in unmapped.iter() {
                *occurrences.entry(m.key.as_str()).or_default() += 1;
            }
            for (key, count) in occurrences {
                observer.on_event(&CollectionEvent::UnmappedModification {
                    run: &run.run_name,
                    key,
                    occurrences: count,
                });
            }

            warnings.extend(unmapped.into_iter().map(|modification| LoadWarning {
                run: run.run_name.clone(),
                modification,
            }));
            self.insert_run(run);
        }

        info!(
            "Collection {} now holds {} runs",
            self.name,
            self.runs.len()
        );
        Ok(warnings)
    }

    /// Every PSM of every run, tagged with run and collection names.
    /// Ordered by run name, then scan.
    pub fn flatten(&self) -> Vec<PsmRow> {
        let collection: Arc<str> = Arc::from(self.name.as_str());
        let mut out = Vec::with_capacity(self.runs.values().map(|r| r.num_psms()).sum());
        for run in self.runs.values() {
            let run_name: Arc<str> = Arc::from(run.run_name.as_str());
            out.extend(run.psms().map(|psm| PsmRow {
                collection: collection.clone(),
                run: run_name.clone(),
                scan: psm.scan,
                sequence: psm.sequence.clone(),
                modifications: psm.modifications.clone(),
                charge: psm.charge,
                retention_time: psm.retention_time,
                q_value: psm.q_value,
                score: psm.score,
            }));
        }
        out
    }

    pub fn calibrate(
        &self,
        options: &CalibrationOptions,
        observer: &dyn CollectionObserver,
    ) -> Result<CollectionCalibration> {
        calibrate_rows(&self.name, &self.flatten(), options, observer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_pattern_matcher() {
        let m = run_pattern_matcher("run_*").unwrap();
        assert!(m.is_match("run_a.mgf"));
        assert!(m.is_match("run_.mgf"));
        assert!(!m.is_match("run_a.mgf.bak"));
        assert!(!m.is_match("other.mgf"));
        assert!(!m.is_match("run_a_mgf"));

        let m = run_pattern_matcher("r?n.1").unwrap();
        assert!(m.is_match("run.1.mgf"));
        assert!(!m.is_match("runx1.mgf"));

        let m = run_pattern_matcher("run_[ab]").unwrap();
        assert!(m.is_match("run_a.mgf"));
        assert!(m.is_match("run_b.mgf"));
        assert!(!m.is_match("run_c.mgf"));

        let m = run_pattern_matcher("run_[!a]").unwrap();
        assert!(!m.is_match("run_a.mgf"));
        assert!(m.is_match("run_b.mgf"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            run_pattern_matcher("run_[a"),
            Err(RtAlignError::InvalidRunPattern { .. })
        ));
    }

    #[test]
    fn test_unknown_run() {
        let collection = RunCollection::new("c", "/tmp");
        assert!(matches!(
            collection.run("missing"),
            Err(RtAlignError::UnknownRun { .. })
        ));
    }

    #[test]
    fn test_default_dirs() {
        let collection = RunCollection::new("c", "/data").with_subdirs("spectra", "ids");
        assert_eq!(collection.spectrum_dir(), PathBuf::from("/data/spectra"));
        assert_eq!(collection.identification_dir(), PathBuf::from("/data/ids"));
    }
}
