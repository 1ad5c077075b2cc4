//! Anchor based step calibration of retention times.
//!
//! A run is mapped onto the timescale of a reference run using the retention
//! times of peptidoforms observed in both (anchors). Every retention time is
//! shifted by the offset of the anchor bracket it falls in. This is a step
//! correction: there is no interpolation between anchors and values past the
//! last anchor reuse the last offset.

pub mod plotting;

use std::fmt::Display;
use tracing::debug;

/// Errors raised while building a calibration.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Returned when the original and reference anchor slices differ in length.
    MismatchedLengths { original: usize, reference: usize },
    /// Returned when an anchor retention time is NaN or infinite.
    NonFiniteAnchor { index: usize, value: f64 },
}

impl Display for CalibrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MismatchedLengths {
                original,
                reference,
            } => write!(
                f,
                "Expected the same number of original ({}) and reference ({}) anchors",
                original, reference
            ),
            Self::NonFiniteAnchor { index, value } => {
                write!(f, "Anchor {} has a non-finite retention time: {}", index, value)
            }
        }
    }
}

impl std::error::Error for CalibrationError {}

/// The retention time of one anchor peptidoform in the run being calibrated
/// and in the reference run.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct AnchorPair {
    pub original: f64,
    pub reference: f64,
}

/// Piecewise constant retention time correction.
///
/// Holds the anchor boundaries (original timescale, ascending) and the offset
/// applied in each bracket. Index 0 is the implicit `(0, 0)` anchor, so the
/// calibration assumes the retention time axis starts at zero.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StepCalibration {
    boundaries: Vec<f64>,
    offsets: Vec<f64>,
}

impl Default for StepCalibration {
    fn default() -> Self {
        Self::identity()
    }
}

impl StepCalibration {
    /// A calibration with no anchors; every value maps onto itself.
    pub fn identity() -> Self {
        Self {
            boundaries: vec![0.0],
            offsets: vec![0.0],
        }
    }

    /// Builds the calibration from index aligned anchor retention times.
    ///
    /// `original_shared[i]` and `reference_shared[i]` must belong to the same
    /// peptidoform. The slices do not need to be sorted.
    pub fn new(
        original_shared: &[f64],
        reference_shared: &[f64],
    ) -> Result<Self, CalibrationError> {
        if original_shared.len() != reference_shared.len() {
            return Err(CalibrationError::MismatchedLengths {
                original: original_shared.len(),
                reference: reference_shared.len(),
            });
        }

        Self::from_anchors(
            original_shared
                .iter()
                .zip(reference_shared.iter())
                .map(|(&original, &reference)| AnchorPair {
                    original,
                    reference,
                }),
        )
    }

    pub fn from_anchors(
        anchors: impl IntoIterator<Item = AnchorPair>,
    ) -> Result<Self, CalibrationError> {
        let mut anchors: Vec<AnchorPair> = anchors.into_iter().collect();
        for (index, anchor) in anchors.iter().enumerate() {
            for value in [anchor.original, anchor.reference] {
                if !value.is_finite() {
                    return Err(CalibrationError::NonFiniteAnchor { index, value });
                }
            }
        }

        // Stable, so anchors sharing an original retention time keep their order.
        anchors.sort_by(|a, b| a.original.total_cmp(&b.original));

        let mut boundaries = Vec::with_capacity(anchors.len() + 1);
        let mut offsets = Vec::with_capacity(anchors.len() + 1);
        boundaries.push(0.0);
        offsets.push(0.0);
        for anchor in anchors.iter() {
            boundaries.push(anchor.original);
            offsets.push(anchor.original - anchor.reference);
        }

        debug!(
            "Built step calibration with {} anchors",
            boundaries.len() - 1
        );
        Ok(Self {
            boundaries,
            offsets,
        })
    }

    /// Number of anchors, not counting the implicit zero anchor.
    pub fn num_anchors(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn is_identity(&self) -> bool {
        self.offsets.iter().all(|x| *x == 0.0)
    }

    /// Anchor boundaries on the original timescale, including the leading zero.
    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    /// Offset for each boundary, `original - reference`.
    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    /// Calibrates a single retention time.
    ///
    /// A value in `(boundaries[i - 1], boundaries[i]]` receives `offsets[i]`,
    /// a value past the last boundary receives the last offset and a value at
    /// or below zero is returned unchanged.
    pub fn predict(&self, rt: f64) -> f64 {
        // First boundary >= rt; brackets are left-exclusive, right-inclusive.
        let i = self.boundaries.partition_point(|b| *b < rt);
        if i == 0 {
            return rt;
        }
        let i = i.min(self.offsets.len() - 1);
        rt + self.offsets[i]
    }

    pub fn calibrate(&self, rts: &[f64]) -> Vec<f64> {
        rts.iter().map(|rt| self.predict(*rt)).collect()
    }

    /// The range spanned by the anchors, `(0, last boundary)`.
    pub fn anchor_range(&self) -> (f64, f64) {
        let last = self.boundaries.last().copied().unwrap_or(0.0);
        (0.0, last)
    }
}
