use super::{BackoffOptions, BackoffOptionsError, ExponentialBackoff};

fn approx(got: f64, want: f64) {
    assert!(
        (got - want).abs() < 1e-9,
        "expected {want}, got {got}"
    );
}

#[test]
fn backoff_sequence_matches_literal_scenario() {
    let options = BackoffOptions {
        initial_seconds: 0.1,
        maximum_seconds: 1.0,
        multiplier: 2.0,
    };
    let mut backoff = ExponentialBackoff::new(options).unwrap();

    let expected = [0.0, 0.1, 0.2, 0.4, 0.8, 1.0, 1.0, 1.0];
    for want in expected {
        approx(backoff.next_wait().as_secs_f64(), want);
    }
}

#[test]
fn reset_returns_to_zero() {
    let mut backoff = ExponentialBackoff::new(BackoffOptions::default()).unwrap();
    backoff.next_wait();
    backoff.next_wait();
    assert!(backoff.peek_next_wait().as_secs_f64() > 0.0);

    backoff.reset();
    approx(backoff.next_wait().as_secs_f64(), 0.0);
}

#[test]
fn rejects_negative_initial() {
    let err = BackoffOptions {
        initial_seconds: -1.0,
        maximum_seconds: 1.0,
        multiplier: 2.0,
    }
    .validate()
    .unwrap_err();
    assert!(matches!(err, BackoffOptionsError::NegativeInitial(_)));
}

#[test]
fn rejects_negative_maximum() {
    let err = BackoffOptions {
        initial_seconds: 0.0,
        maximum_seconds: -1.0,
        multiplier: 2.0,
    }
    .validate()
    .unwrap_err();
    assert!(matches!(err, BackoffOptionsError::NegativeMaximum(_)));
}

#[test]
fn rejects_initial_above_maximum() {
    let err = BackoffOptions {
        initial_seconds: 2.0,
        maximum_seconds: 1.0,
        multiplier: 2.0,
    }
    .validate()
    .unwrap_err();
    assert!(matches!(
        err,
        BackoffOptionsError::InitialExceedsMaximum { .. }
    ));
}

#[test]
fn rejects_multiplier_below_one() {
    let err = BackoffOptions {
        initial_seconds: 0.0,
        maximum_seconds: 1.0,
        multiplier: 0.5,
    }
    .validate()
    .unwrap_err();
    assert!(matches!(err, BackoffOptionsError::MultiplierBelowOne(_)));
}

#[test]
fn monotonic_until_maximum_then_constant() {
    let options = BackoffOptions {
        initial_seconds: 0.05,
        maximum_seconds: 0.2,
        multiplier: 3.0,
    };
    let mut backoff = ExponentialBackoff::new(options).unwrap();

    let mut previous = backoff.next_wait().as_secs_f64();
    for _ in 0..10 {
        let current = backoff.next_wait().as_secs_f64();
        assert!(current >= previous - 1e-9);
        previous = current;
    }
    approx(previous, options.maximum_seconds);
}
