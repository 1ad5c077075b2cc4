pub mod calibration;
pub mod collection;
pub mod data_sources;
pub mod errors;
pub mod models;
pub mod modifications;
pub mod observer;
pub mod run;
pub mod utils;

pub use calibration::{
    CalibratedPeptidoform,
    CalibrationOptions,
    CollectionCalibration,
    PeptidoformRunSummary,
    RunCalibratedPeptidoform,
    calibrate_rows,
    summarize_runs,
};
pub use collection::{
    LoadOptions,
    LoadWarning,
    PsmRow,
    RunCollection,
};
pub use errors::{
    Result,
    RtAlignError,
};
pub use models::{
    PeptideSpectrumMatch,
    Peptidoform,
    PsmIdentifier,
    SearchEngine,
};
pub use modifications::ModificationMapping;
pub use observer::{
    CollectionEvent,
    CollectionObserver,
    FallbackReason,
    NoopObserver,
    TracingObserver,
};
pub use run::{
    MergeMode,
    Run,
};
