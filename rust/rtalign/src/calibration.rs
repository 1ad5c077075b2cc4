//! Cross-run retention time calibration.
//!
//! Works in three phases over the flattened PSM table of a collection:
//! 1. Per run, confident PSMs are collapsed to one row per peptidoform with
//!    the median retention time and mean q-value.
//! 2. Peptidoforms seen in every run become anchors and the run with the
//!    smallest name becomes the reference.
//! 3. Per run, a [StepCalibration] built from the anchors maps every median
//!    onto the reference timescale.
//!
//! The per-run calibrated values are finally collapsed to one consensus
//! retention time per peptidoform.

use crate::collection::PsmRow;
use crate::errors::Result;
use crate::models::Peptidoform;
use crate::observer::{
    CollectionEvent,
    CollectionObserver,
    FallbackReason,
};
use crate::utils::stats::{
    mean,
    median,
};
use rayon::prelude::*;
use rtcal::plotting::{
    ScatterSeries,
    format_scatter_plot,
};
use rtcal::{
    AnchorPair,
    StepCalibration,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::{
    BTreeMap,
    BTreeSet,
    HashMap,
};
use std::sync::Arc;

pub const DEFAULT_Q_VALUE_THRESHOLD: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationOptions {
    pub q_value_threshold: f64,
    /// Keep only the `top_n` anchors with the lowest mean q-value in the
    /// reference run. `None` (or zero) keeps all of them.
    pub top_n: Option<usize>,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            q_value_threshold: DEFAULT_Q_VALUE_THRESHOLD,
            top_n: None,
        }
    }
}

/// One peptidoform in one run, after filtering by q-value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeptidoformRunSummary {
    pub sequence: String,
    pub modifications: String,
    pub run: Arc<str>,
    pub retention_time_median: f64,
    pub q_value_mean: f64,
    /// Number of runs in which this peptidoform passes the threshold.
    pub run_counts: usize,
}

impl PeptidoformRunSummary {
    pub fn peptidoform(&self) -> Peptidoform {
        Peptidoform::new(self.sequence.clone(), self.modifications.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunCalibratedPeptidoform {
    pub sequence: String,
    pub modifications: String,
    pub run: Arc<str>,
    pub retention_time_median: f64,
    /// Median retention time in the reference run, only set for anchors.
    pub retention_time_reference: Option<f64>,
    pub retention_time_calibrated: f64,
}

/// A row of the final output table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratedPeptidoform {
    pub sequence: String,
    pub modifications: String,
    pub retention_time_calibrated: f64,
}

#[derive(Debug, Clone)]
pub struct CollectionCalibration {
    pub collection: String,
    pub num_psms_passing: usize,
    /// `None` when the identity fallback was used.
    pub reference_run: Option<String>,
    pub fallback: Option<FallbackReason>,
    pub anchors: Vec<Peptidoform>,
    pub curves: BTreeMap<String, StepCalibration>,
    pub per_run: Vec<RunCalibratedPeptidoform>,
    /// Sorted by sequence, then modifications.
    pub consensus: Vec<CalibratedPeptidoform>,
}

impl CollectionCalibration {
    pub fn is_identity(&self) -> bool {
        self.fallback.is_some()
    }

    /// Calibrated vs reference retention time of the anchors, one series per run.
    pub fn scatter_series(&self) -> Vec<ScatterSeries> {
        let mut by_run: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
        for row in self.per_run.iter() {
            if let Some(reference) = row.retention_time_reference {
                by_run
                    .entry(&*row.run)
                    .or_default()
                    .push((row.retention_time_calibrated, reference));
            }
        }
        by_run
            .into_iter()
            .map(|(run, points)| ScatterSeries {
                label: run.to_string(),
                points,
            })
            .collect()
    }

    pub fn format_plot(&self, width: usize, height: usize, colored: bool) -> String {
        let series = self.scatter_series();
        let mut out = format!(
            "{}: calibrated vs reference retention time (reference: {})\n",
            self.collection,
            self.reference_run.as_deref().unwrap_or("none")
        );
        if series.is_empty() {
            out.push_str("No anchors to plot\n");
            return out;
        }
        out.push_str(&format_scatter_plot(&series, width, height, colored));
        for (run, curve) in self.curves.iter() {
            if curve.is_identity() {
                continue;
            }
            out.push_str(&format!("\n{}: step correction\n", run));
            out.push_str(&curve.format_plot(run, width, height, colored));
        }
        out
    }
}

fn confident_rows(rows: &[PsmRow], q_value_threshold: f64) -> Vec<&PsmRow> {
    rows.iter()
        .filter(|r| r.sequence.is_some())
        .filter(|r| r.q_value.is_some_and(|q| q <= q_value_threshold))
        .collect()
}

fn summarize_run(run: &Arc<str>, rows: &[&PsmRow]) -> Vec<PeptidoformRunSummary> {
    let mut groups: BTreeMap<Peptidoform, (Vec<f64>, Vec<f64>)> = BTreeMap::new();
    for row in rows {
        let Some(sequence) = row.sequence.as_ref() else {
            continue;
        };
        let key = Peptidoform::new(
            sequence.clone(),
            row.modifications.clone().unwrap_or_default(),
        );
        let (rts, qs) = groups.entry(key).or_default();
        if let Some(rt) = row.retention_time {
            rts.push(rt);
        }
        if let Some(q) = row.q_value {
            qs.push(q);
        }
    }

    groups
        .into_iter()
        .filter_map(|(peptidoform, (mut rts, qs))| {
            // Peptidoforms with no retention time at all cannot be calibrated.
            let retention_time_median = median(&mut rts)?;
            let q_value_mean = mean(&qs)?;
            Some(PeptidoformRunSummary {
                sequence: peptidoform.sequence,
                modifications: peptidoform.modifications,
                run: run.clone(),
                retention_time_median,
                q_value_mean,
                run_counts: 0,
            })
        })
        .collect()
}

fn summarize_confident(rows: &[&PsmRow]) -> Vec<PeptidoformRunSummary> {
    let mut by_run: BTreeMap<Arc<str>, Vec<&PsmRow>> = BTreeMap::new();
    for row in rows {
        by_run.entry(row.run.clone()).or_default().push(*row);
    }

    let mut summaries: Vec<PeptidoformRunSummary> = by_run
        .par_iter()
        .flat_map_iter(|(run, rows)| summarize_run(run, rows))
        .collect();

    let mut run_counts: HashMap<(String, String), usize> = HashMap::new();
    for s in summaries.iter() {
        *run_counts
            .entry((s.sequence.clone(), s.modifications.clone()))
            .or_default() += 1;
    }
    for s in summaries.iter_mut() {
        s.run_counts = run_counts
            .get(&(s.sequence.clone(), s.modifications.clone()))
            .copied()
            .unwrap_or(0);
    }

    summaries.sort_by(|a, b| {
        (&a.sequence, &a.modifications, &a.run).cmp(&(&b.sequence, &b.modifications, &b.run))
    });
    summaries
}

/// Collapses PSMs passing `q_value_threshold` to one row per peptidoform and run.
/// Sorted by sequence, modifications and run.
pub fn summarize_runs(rows: &[PsmRow], q_value_threshold: f64) -> Vec<PeptidoformRunSummary> {
    summarize_confident(&confident_rows(rows, q_value_threshold))
}

/// Picks the anchors from the reference run's summaries, most confident first
/// when `top_n` applies.
fn select_anchors<'a>(
    summaries: &'a [PeptidoformRunSummary],
    reference_run: &str,
    num_runs: usize,
    top_n: Option<usize>,
) -> Vec<&'a PeptidoformRunSummary> {
    let mut anchors: Vec<&PeptidoformRunSummary> = summaries
        .iter()
        .filter(|s| &*s.run == reference_run && s.run_counts == num_runs)
        .collect();

    if let Some(n) = top_n.filter(|n| *n > 0) {
        anchors.sort_by(|a, b| {
            a.q_value_mean
                .total_cmp(&b.q_value_mean)
                .then_with(|| a.sequence.cmp(&b.sequence))
                .then_with(|| a.modifications.cmp(&b.modifications))
        });
        anchors.truncate(n);
    }
    anchors
}

fn consensus(per_run: &[RunCalibratedPeptidoform]) -> Vec<CalibratedPeptidoform> {
    let mut groups: BTreeMap<(&str, &str), Vec<f64>> = BTreeMap::new();
    for row in per_run {
        groups
            .entry((row.sequence.as_str(), row.modifications.as_str()))
            .or_default()
            .push(row.retention_time_calibrated);
    }
    groups
        .into_iter()
        .filter_map(|((sequence, modifications), mut values)| {
            Some(CalibratedPeptidoform {
                sequence: sequence.to_string(),
                modifications: modifications.to_string(),
                retention_time_calibrated: median(&mut values)?,
            })
        })
        .collect()
}

/// Runs the full calibration over a flattened collection table.
///
/// Falls back to the identity (calibrated = median) when fewer than two runs
/// have confident identifications or no peptidoform is shared by all of them.
pub fn calibrate_rows(
    collection: &str,
    rows: &[PsmRow],
    options: &CalibrationOptions,
    observer: &dyn CollectionObserver,
) -> Result<CollectionCalibration> {
    let confident = confident_rows(rows, options.q_value_threshold);
    observer.on_event(&CollectionEvent::PsmsPassingThreshold {
        collection,
        threshold: options.q_value_threshold,
        count: confident.len(),
    });

    let summaries = summarize_confident(&confident);
    observer.on_event(&CollectionEvent::PeptidoformsSummarized {
        collection,
        count: summaries.len(),
    });

    let runs: BTreeSet<&str> = summaries.iter().map(|s| &*s.run).collect();
    let num_runs = runs.len();
    let has_shared = summaries.iter().any(|s| s.run_counts == num_runs);

    let fallback = if summaries.is_empty() {
        Some(FallbackReason::NoPsmsPassingThreshold)
    } else if num_runs < 2 {
        Some(FallbackReason::SingleRun)
    } else if !has_shared {
        Some(FallbackReason::NoSharedPeptidoforms)
    } else {
        None
    };

    let (reference_run, anchors) = match (fallback, runs.first()) {
        (None, Some(&reference)) => {
            observer.on_event(&CollectionEvent::ReferenceRunSelected {
                collection,
                run: reference,
            });
            let anchors = select_anchors(&summaries, reference, num_runs, options.top_n);
            observer.on_event(&CollectionEvent::AnchorsSelected {
                collection,
                count: anchors.len(),
            });
            (Some(reference.to_string()), anchors)
        }
        (reason, _) => {
            let reason = reason.unwrap_or(FallbackReason::NoPsmsPassingThreshold);
            observer.on_event(&CollectionEvent::IdentityFallback { collection, reason });
            (None, Vec::new())
        }
    };

    let reference_shared: HashMap<Peptidoform, f64> = anchors
        .iter()
        .map(|s| (s.peptidoform(), s.retention_time_median))
        .collect();

    let mut by_run: BTreeMap<&str, Vec<&PeptidoformRunSummary>> = BTreeMap::new();
    for s in summaries.iter() {
        by_run.entry(&*s.run).or_default().push(s);
    }

    let calibrated = by_run
        .par_iter()
        .map(|(&run, rows)| -> Result<_> {
            let pairs: Vec<AnchorPair> = rows
                .iter()
                .filter_map(|s| {
                    reference_shared
                        .get(&s.peptidoform())
                        .map(|reference| AnchorPair {
                            original: s.retention_time_median,
                            reference: *reference,
                        })
                })
                .collect();
            let curve = StepCalibration::from_anchors(pairs)?;

            let out: Vec<RunCalibratedPeptidoform> = rows
                .iter()
                .map(|s| RunCalibratedPeptidoform {
                    sequence: s.sequence.clone(),
                    modifications: s.modifications.clone(),
                    run: s.run.clone(),
                    retention_time_median: s.retention_time_median,
                    retention_time_reference: reference_shared.get(&s.peptidoform()).copied(),
                    retention_time_calibrated: curve.predict(s.retention_time_median),
                })
                .collect();

            observer.on_event(&CollectionEvent::RunCalibrated {
                collection,
                run,
                num_peptidoforms: out.len(),
                num_anchors: curve.num_anchors(),
            });
            Ok((run.to_string(), curve, out))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut curves = BTreeMap::new();
    let mut per_run = Vec::with_capacity(summaries.len());
    for (run, curve, rows) in calibrated {
        curves.insert(run, curve);
        per_run.extend(rows);
    }

    Ok(CollectionCalibration {
        collection: collection.to_string(),
        num_psms_passing: confident.len(),
        reference_run,
        fallback,
        anchors: anchors.iter().map(|s| s.peptidoform()).collect(),
        curves,
        consensus: consensus(&per_run),
        per_run,
    })
}
