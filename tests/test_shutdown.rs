use std::time::{Duration, Instant};

use quorumcast::shutdown::{Phase, ShutdownCoordinator, Trigger};

const GRACE: Duration = Duration::from_secs(1);

#[test]
fn test_starts_collecting() {
    let coord = ShutdownCoordinator::new(3, GRACE);

    assert_eq!(coord.phase(), Phase::Collecting);
    assert_eq!(coord.done_count(), 0);
    assert!(coord.first_done_at().is_none());
}

#[test]
fn test_quorum_fires_on_last_expected_signal() {
    let mut coord = ShutdownCoordinator::new(3, GRACE);
    let t0 = Instant::now();

    assert_eq!(coord.record_done(t0), None);
    assert_eq!(coord.record_done(t0), None);
    assert_eq!(coord.record_done(t0), Some(Trigger::Quorum));
    assert_eq!(coord.done_count(), 3);
}

#[test]
fn test_single_expected_client() {
    let mut coord = ShutdownCoordinator::new(1, GRACE);

    assert_eq!(coord.record_done(Instant::now()), Some(Trigger::Quorum));
}

#[test]
fn test_first_signal_time_is_kept() {
    let mut coord = ShutdownCoordinator::new(3, GRACE);
    let t0 = Instant::now();

    coord.record_done(t0);
    coord.record_done(t0 + Duration::from_millis(500));

    assert_eq!(coord.first_done_at(), Some(t0));
}

#[test]
fn test_no_grace_before_first_signal() {
    let coord = ShutdownCoordinator::new(2, GRACE);

    assert_eq!(coord.check_grace(Instant::now() + Duration::from_secs(60)), None);
}

#[test]
fn test_grace_expires_after_interval() {
    let mut coord = ShutdownCoordinator::new(2, GRACE);
    let t0 = Instant::now();
    coord.record_done(t0);

    assert_eq!(coord.check_grace(t0 + Duration::from_millis(999)), None);
    assert_eq!(coord.check_grace(t0 + GRACE), Some(Trigger::GraceExpired));
    assert_eq!(coord.check_grace(t0 + Duration::from_secs(5)), Some(Trigger::GraceExpired));
}

#[test]
fn test_grace_never_fires_once_quorum_reached() {
    let mut coord = ShutdownCoordinator::new(2, GRACE);
    let t0 = Instant::now();
    coord.record_done(t0);
    coord.record_done(t0);

    assert_eq!(coord.check_grace(t0 + Duration::from_secs(5)), None);
}
