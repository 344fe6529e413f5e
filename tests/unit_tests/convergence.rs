use hpadapt::convergence::{ConvergenceSeries, ConvergenceTracker, Stopwatch};
use std::fs;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;

/// A fresh, empty directory under the system temp directory.
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hpadapt-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn series_is_written_as_two_columns() {
    let mut series = ConvergenceSeries::new();
    assert!(series.is_empty());
    series.push(6.0, 42.5);
    series.push(12.0, 0.25);
    assert_eq!(series.len(), 2);
    assert_eq!(series.last(), Some((12.0, 0.25)));

    let mut buffer = Vec::new();
    series.write_to(&mut buffer).unwrap();
    assert_eq!(String::from_utf8(buffer).unwrap(), "6 42.5\n12 0.25\n");
}

#[test]
fn tracker_records_dof_and_cpu_series() {
    let mut tracker = ConvergenceTracker::new();
    tracker.record_estimated(10, 0.5, 3.0);
    tracker.record_estimated(20, 1.5, 0.3);
    assert!(!tracker.has_exact());
    tracker.record_exact(10, 0.5, 2.5);

    assert_eq!(tracker.dof_estimated.points(), &[(10.0, 3.0), (20.0, 0.3)]);
    assert_eq!(tracker.cpu_estimated.points(), &[(0.5, 3.0), (1.5, 0.3)]);
    assert_eq!(tracker.dof_exact.points(), &[(10.0, 2.5)]);
    assert!(tracker.has_exact());
}

#[test]
fn save_skips_exact_series_when_not_recorded() {
    let dir = scratch_dir("estimated-only");
    let mut tracker = ConvergenceTracker::new();
    tracker.record_estimated(6, 0.1, 50.0);
    tracker.save_to_dir(&dir).unwrap();

    let contents = fs::read_to_string(dir.join(ConvergenceTracker::DOF_ESTIMATED_FILE)).unwrap();
    assert_eq!(contents, "6 50\n");
    assert!(dir.join(ConvergenceTracker::CPU_ESTIMATED_FILE).exists());
    assert!(!dir.join(ConvergenceTracker::DOF_EXACT_FILE).exists());
    assert!(!dir.join(ConvergenceTracker::CPU_EXACT_FILE).exists());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn save_writes_all_four_files() {
    let dir = scratch_dir("all");
    let mut tracker = ConvergenceTracker::new();
    tracker.record_estimated(6, 0.1, 50.0);
    tracker.record_exact(6, 0.1, 40.0);
    tracker.save_to_dir(&dir).unwrap();

    for file in [
        ConvergenceTracker::DOF_ESTIMATED_FILE,
        ConvergenceTracker::CPU_ESTIMATED_FILE,
        ConvergenceTracker::DOF_EXACT_FILE,
        ConvergenceTracker::CPU_EXACT_FILE,
    ] {
        assert!(dir.join(file).exists(), "{} missing", file);
    }
    let contents = fs::read_to_string(dir.join(ConvergenceTracker::CPU_EXACT_FILE)).unwrap();
    assert_eq!(contents, "0.1 40\n");
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn save_into_missing_directory_fails() {
    let dir = std::env::temp_dir().join(format!("hpadapt-missing-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    assert!(ConvergenceTracker::new().save_to_dir(&dir).is_err());
}

#[test]
fn stopwatch_only_counts_running_intervals() {
    let mut stopwatch = Stopwatch::new();
    assert!(!stopwatch.is_running());
    assert_eq!(stopwatch.accumulated(), Duration::ZERO);

    stopwatch.start();
    assert!(stopwatch.is_running());
    sleep(Duration::from_millis(5));
    stopwatch.stop();
    let first = stopwatch.accumulated();
    assert!(first >= Duration::from_millis(5));

    // Paused time is not counted
    sleep(Duration::from_millis(5));
    assert_eq!(stopwatch.accumulated(), first);

    stopwatch.start();
    // Starting twice keeps the original start time
    stopwatch.start();
    sleep(Duration::from_millis(5));
    stopwatch.stop();
    assert!(stopwatch.accumulated() >= first + Duration::from_millis(5));
    assert!(stopwatch.accumulated_seconds() > 0.0);
}
