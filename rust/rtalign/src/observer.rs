//! Progress and diagnostic reporting for collection loading and calibration.
//!
//! The library never prints. Anything a user might want to see is sent as a
//! [CollectionEvent] to a [CollectionObserver]; [TracingObserver] turns them
//! into log lines and front ends can layer progress bars on top.

use tracing::{
    info,
    warn,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    NoPsmsPassingThreshold,
    SingleRun,
    NoSharedPeptidoforms,
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::NoPsmsPassingThreshold => "no PSMs pass the q-value threshold",
            Self::SingleRun => "fewer than two runs have confident identifications",
            Self::NoSharedPeptidoforms => "no peptidoform is identified in every run",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectionEvent<'a> {
    RunsDiscovered {
        collection: &'a str,
        num_runs: usize,
    },
    RunLoaded {
        collection: &'a str,
        run: &'a str,
        num_psms: usize,
        /// `None` when the run holds no PSMs at all.
        fraction_missing_retention_time: Option<f64>,
    },
    UnmappedModification {
        run: &'a str,
        key: &'a str,
        occurrences: usize,
    },
    PsmsPassingThreshold {
        collection: &'a str,
        threshold: f64,
        count: usize,
    },
    PeptidoformsSummarized {
        collection: &'a str,
        count: usize,
    },
    IdentityFallback {
        collection: &'a str,
        reason: FallbackReason,
    },
    ReferenceRunSelected {
        collection: &'a str,
        run: &'a str,
    },
    AnchorsSelected {
        collection: &'a str,
        count: usize,
    },
    RunCalibrated {
        collection: &'a str,
        run: &'a str,
        num_peptidoforms: usize,
        num_anchors: usize,
    },
}

/// Receives events while runs load and calibrate.
/// Runs are processed in parallel so events may arrive from any thread.
pub trait CollectionObserver: Sync {
    fn on_event(&self, event: &CollectionEvent<'_>);
}

impl<T: CollectionObserver + ?Sized> CollectionObserver for &T {
    fn on_event(&self, event: &CollectionEvent<'_>) {
        (**self).on_event(event)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CollectionObserver for NoopObserver {
    fn on_event(&self, _event: &CollectionEvent<'_>) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CollectionObserver for TracingObserver {
    fn on_event(&self, event: &CollectionEvent<'_>) {
        match event {
            CollectionEvent::RunsDiscovered {
                collection,
                num_runs,
            } => info!("{}: found {} runs", collection, num_runs),
            CollectionEvent::RunLoaded {
                collection,
                run,
                num_psms,
                fraction_missing_retention_time,
            } => match fraction_missing_retention_time {
                Some(frac) => info!(
                    "{}: loaded {} with {} PSMs ({:.1}% without retention time)",
                    collection,
                    run,
                    num_psms,
                    frac * 100.0
                ),
                None => warn!("{}: run {} has no PSMs", collection, run),
            },
            CollectionEvent::UnmappedModification {
                run,
                key,
                occurrences,
            } => warn!(
                "{}: modification '{}' has no label ({} occurrences), keeping the raw key",
                run, key, occurrences
            ),
            CollectionEvent::PsmsPassingThreshold {
                collection,
                threshold,
                count,
            } => info!("{}: {} PSMs at q-value <= {}", collection, count, threshold),
            CollectionEvent::PeptidoformsSummarized { collection, count } => {
                info!("{}: {} peptidoform/run groups", collection, count)
            }
            CollectionEvent::IdentityFallback { collection, reason } => warn!(
                "{}: {}, using uncalibrated retention times",
                collection, reason
            ),
            CollectionEvent::ReferenceRunSelected { collection, run } => {
                info!("{}: reference run is {}", collection, run)
            }
            CollectionEvent::AnchorsSelected { collection, count } => {
                info!("{}: {} shared anchor peptidoforms", collection, count)
            }
            CollectionEvent::RunCalibrated {
                collection,
                run,
                num_peptidoforms,
                num_anchors,
            } => info!(
                "{}: calibrated {} peptidoforms in {} using {} anchors",
                collection, num_peptidoforms, run, num_anchors
            ),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Keeps a plain text trace of every event for assertions.
    #[derive(Debug, Default)]
    pub struct RecordingObserver {
        pub events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        pub fn contains(&self, prefix: &str) -> bool {
            self.events
                .lock()
                .unwrap()
                .iter()
                .any(|e| e.starts_with(prefix))
        }
    }

    impl CollectionObserver for RecordingObserver {
        fn on_event(&self, event: &CollectionEvent<'_>) {
            self.events.lock().unwrap().push(format!("{:?}", event));
        }
    }
}
