use super::config::{
    Config,
    OutputConfig,
    RunSelection,
};
use crate::errors::CliError;
use indicatif::{
    ProgressBar,
    ProgressStyle,
};
use rtalign::{
    CollectionCalibration,
    CollectionEvent,
    CollectionObserver,
    LoadOptions,
    ModificationMapping,
    PsmRow,
    RunCollection,
    SearchEngine,
    TracingObserver,
};
use serde::Serialize;
use std::path::{
    Path,
    PathBuf,
};
use std::time::Instant;
use tracing::{
    info,
    warn,
};

const PLOT_WIDTH: usize = 100;
const PLOT_HEIGHT: usize = 30;

/// Forwards events to another observer while advancing a progress bar over
/// run loading.
pub struct ProgressObserver<O> {
    inner: O,
    bar: ProgressBar,
}

impl<O: CollectionObserver> ProgressObserver<O> {
    pub fn new(inner: O, num_runs: Option<usize>) -> Self {
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} runs ({eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        let bar = ProgressBar::new(num_runs.unwrap_or(0) as u64).with_style(style);
        Self { inner, bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl<O: CollectionObserver> CollectionObserver for ProgressObserver<O> {
    fn on_event(&self, event: &CollectionEvent<'_>) {
        match event {
            CollectionEvent::RunsDiscovered { num_runs, .. } => {
                self.bar.set_length(*num_runs as u64)
            }
            CollectionEvent::RunLoaded { .. } => self.bar.inc(1),
            _ => {}
        }
        self.bar.suspend(|| self.inner.on_event(event));
    }
}

/// A flattened PSM with its universal spectrum identifier.
#[derive(Debug, Serialize)]
struct PsmRowWithUsi<'a> {
    collection: &'a str,
    run: &'a str,
    scan: u32,
    sequence: Option<&'a str>,
    modifications: Option<&'a str>,
    charge: Option<u8>,
    retention_time: Option<f64>,
    q_value: Option<f64>,
    score: Option<f64>,
    usi: String,
}

impl<'a> PsmRowWithUsi<'a> {
    fn new(row: &'a PsmRow, project_id: &str) -> Self {
        Self {
            collection: &row.collection,
            run: &row.run,
            scan: row.scan,
            sequence: row.sequence.as_deref(),
            modifications: row.modifications.as_deref(),
            charge: row.charge,
            retention_time: row.retention_time,
            q_value: row.q_value,
            score: row.score,
            usi: row.usi(project_id),
        }
    }
}

fn write_tsv<T: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
) -> Result<usize, CliError> {
    let write_err = |e: csv::Error| CliError::Write {
        source: e.to_string(),
        path: path.display().to_string(),
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .map_err(write_err)?;

    let mut count = 0;
    for row in rows {
        writer.serialize(row).map_err(write_err)?;
        count += 1;
    }
    writer.flush().map_err(|e| CliError::Write {
        source: e.to_string(),
        path: path.display().to_string(),
    })?;
    info!("Wrote {} rows to {}", count, path.display());
    Ok(count)
}

fn write_psms(
    path: &Path,
    collection: &RunCollection,
    project_id: Option<&str>,
) -> Result<usize, CliError> {
    let rows = collection.flatten();
    match project_id {
        Some(project_id) => write_tsv(
            path,
            rows.iter().map(|row| PsmRowWithUsi::new(row, project_id)),
        ),
        None => write_tsv(path, rows.iter()),
    }
}

fn write_plot(path: &Path, calibration: &CollectionCalibration) -> Result<(), CliError> {
    let plot = calibration.format_plot(PLOT_WIDTH, PLOT_HEIGHT, false);
    std::fs::write(path, plot).map_err(|e| CliError::Write {
        source: e.to_string(),
        path: path.display().to_string(),
    })?;
    info!("Wrote calibration plot to {}", path.display());
    Ok(())
}

fn output_path(output: &OutputConfig, collection_name: &str, suffix: &str) -> PathBuf {
    output
        .directory
        .join(format!("{}_{}", collection_name, suffix))
}

/// Loads every selected run, calibrates the collection and writes the outputs.
pub fn process_collection(config: &Config) -> Result<CollectionCalibration, CliError> {
    let start = Instant::now();
    let output = config.output()?;
    let collection_name = config.collection_name()?;

    let search_engine: SearchEngine = config.analysis.search_engine.parse()?;
    let modification_mapping = match config.analysis.modifications_file.as_ref() {
        Some(path) => Some(
            ModificationMapping::from_file(path).map_err(rtalign::RtAlignError::from)?,
        ),
        None => None,
    };
    let load_options = LoadOptions {
        search_engine,
        modification_mapping,
        eager: true,
    };

    let mut collection = RunCollection::new(collection_name.clone(), config.root_dir()?)
        .with_subdirs(&config.input.mgf_subdir, &config.input.pout_subdir);

    let warnings = match &config.input.runs {
        RunSelection::Glob { pattern } => {
            let observer = ProgressObserver::new(TracingObserver, None);
            let res = collection.add_runs_by_glob(pattern, &load_options, &observer);
            observer.finish();
            res?
        }
        RunSelection::List { names } => {
            let observer = ProgressObserver::new(TracingObserver, Some(names.len()));
            let res = collection.add_runs_by_list(names.as_slice(), &load_options, &observer);
            observer.finish();
            res?
        }
    };
    if collection.num_runs() == 0 {
        warn!(
            "No runs found for collection {} in {}",
            collection_name,
            collection.spectrum_dir().display()
        );
    }
    if !warnings.is_empty() {
        warn!(
            "{} annotated peptides carried modifications without a label",
            warnings.len()
        );
    }

    if output.dump_psms {
        write_psms(
            &output_path(output, &collection_name, "psms.tsv"),
            &collection,
            output.project_id.as_deref(),
        )?;
    }

    let calibration = collection.calibrate(&config.calibration_options(), &TracingObserver)?;
    write_tsv(
        &output_path(output, &collection_name, "calibrated.tsv"),
        calibration.consensus.iter(),
    )?;

    if config.analysis.plot {
        write_plot(
            &output_path(output, &collection_name, "calibration_plot.txt"),
            &calibration,
        )?;
    }

    info!(
        "Calibrated {} peptidoforms from {} runs in {:?}",
        calibration.consensus.len(),
        collection.num_runs(),
        start.elapsed()
    );
    Ok(calibration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        AnalysisConfig,
        InputConfig,
    };

    fn fixture_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("rtalign")
            .join("tests")
            .join("data")
    }

    #[test]
    fn test_process_collection_writes_outputs() {
        let out = tempfile::tempdir().unwrap();
        let config = Config {
            input: InputConfig {
                root_dir: Some(fixture_root()),
                ..Default::default()
            },
            analysis: AnalysisConfig {
                collection_name: Some("fixture".to_string()),
                plot: true,
                ..Default::default()
            },
            output: Some(OutputConfig {
                directory: out.path().to_path_buf(),
                dump_psms: true,
                project_id: Some("PXD000001".to_string()),
            }),
        };

        let calibration = process_collection(&config).unwrap();
        assert_eq!(calibration.reference_run.as_deref(), Some("run_a"));

        let calibrated =
            std::fs::read_to_string(out.path().join("fixture_calibrated.tsv")).unwrap();
        let mut lines = calibrated.lines();
        assert_eq!(
            lines.next(),
            Some("sequence\tmodifications\tretention_time_calibrated")
        );
        assert_eq!(lines.count(), 5);

        let psms = std::fs::read_to_string(out.path().join("fixture_psms.tsv")).unwrap();
        assert!(psms.lines().next().unwrap().ends_with("\tusi"));
        assert!(psms.contains("mzspec:PXD000001:run_a:scan:101"));

        assert!(out.path().join("fixture_calibration_plot.txt").exists());
    }

    #[test]
    fn test_unsupported_engine() {
        let out = tempfile::tempdir().unwrap();
        let config = Config {
            input: InputConfig {
                root_dir: Some(fixture_root()),
                ..Default::default()
            },
            analysis: AnalysisConfig {
                search_engine: "sage".to_string(),
                ..Default::default()
            },
            output: Some(OutputConfig {
                directory: out.path().to_path_buf(),
                dump_psms: false,
                project_id: None,
            }),
        };
        assert!(matches!(
            process_collection(&config),
            Err(CliError::Alignment { .. })
        ));
    }
}
