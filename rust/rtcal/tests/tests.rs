use rtcal::{
    AnchorPair,
    CalibrationError,
    StepCalibration,
};

#[test]
fn test_calibrate_against_self_is_identity() {
    // Test: Same anchors on both sides means every offset is zero
    let anchors: Vec<f64> = (1..50).map(|i| i as f64 * 12.5).collect();
    let cal = StepCalibration::new(&anchors, &anchors).unwrap();
    assert!(cal.is_identity());

    let originals: Vec<f64> = (0..700).map(|i| i as f64 * 0.97).collect();
    assert_eq!(cal.calibrate(&originals), originals);
}

#[test]
fn test_calibrate_three_anchor_example() {
    // Test: anchors [10, 20, 30] observed at [12, 19, 33] in the reference
    let cal = StepCalibration::new(&[10.0, 20.0, 30.0], &[12.0, 19.0, 33.0]).unwrap();
    let calibrated = cal.calibrate(&[5.0, 15.0, 25.0, 35.0]);
    assert_eq!(calibrated, vec![3.0, 16.0, 22.0, 32.0]);
}

#[test]
fn test_calibrate_empty_anchors() {
    // Test: No anchors behaves as identity
    let cal = StepCalibration::new(&[], &[]).unwrap();
    assert_eq!(cal.num_anchors(), 0);
    assert_eq!(cal.predict(42.0), 42.0);
}

#[test]
fn test_calibrate_mismatched_anchor_lengths() {
    let result = StepCalibration::new(&[1.0, 2.0, 3.0], &[1.0, 2.0]);
    assert!(matches!(
        result,
        Err(CalibrationError::MismatchedLengths {
            original: 3,
            reference: 2
        })
    ));
}

#[test]
fn test_calibrate_from_anchor_pairs() {
    let cal = StepCalibration::from_anchors([
        AnchorPair {
            original: 40.0,
            reference: 35.0,
        },
        AnchorPair {
            original: 20.0,
            reference: 22.0,
        },
    ])
    .unwrap();

    assert_eq!(cal.num_anchors(), 2);
    assert_eq!(cal.predict(20.0), 18.0);
    assert_eq!(cal.predict(30.0), 35.0);
    assert_eq!(cal.predict(50.0), 55.0);
}

#[test]
fn test_duplicate_anchor_boundaries() {
    // Test: two anchors at the same original time, only the first bracket is reachable
    let cal = StepCalibration::new(&[10.0, 10.0, 20.0], &[8.0, 9.0, 21.0]).unwrap();
    assert_eq!(cal.predict(10.0), 12.0);
    assert_eq!(cal.predict(15.0), 14.0);
}
