//! End-to-end acquisition tests against the scripted mock transport.

use picolog::acquisition::{self, RunOptions};
use picolog::adapters::MockTransport;
use picolog::config::InstrumentSettings;
use picolog::data::session::{allocate_session_path, SessionWriter};
use picolog::instrument::Keithley6485;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::mpsc;

fn fast_settings() -> InstrumentSettings {
    InstrumentSettings {
        read_timeout_ms: 5,
        response_timeout_ms: 200,
        ..InstrumentSettings::default()
    }
}

/// Space scripted responses apart by ~`windows` milliseconds of empty read
/// windows, so consecutive samples land on distinct time stamps even at the
/// file's five-decimal resolution.
fn push_quiet_windows(transport: &MockTransport, windows: usize) {
    for _ in 0..windows {
        transport.push_chunk(b"");
    }
}

fn script_standard_run(transport: &MockTransport) {
    transport.push_response("KEITHLEY INSTRUMENTS INC.,MODEL 6485,1234567,B03\r");
    // Three good readings, one out-of-range, one malformed.
    transport.push_response("+1.00000E-09A,+1.0,+0\r");
    push_quiet_windows(transport, 10);
    transport.push_response("+2.50000E+00A,+2.0,+0\r"); // 2.5 A, above threshold
    push_quiet_windows(transport, 10);
    transport.push_response("garbage\r");
    push_quiet_windows(transport, 10);
    transport.push_response("+1.10000E-09A,+3.0,+0\r");
    push_quiet_windows(transport, 10);
    transport.push_response("+9.00000E-10A,+4.0,+0\r");
}

#[tokio::test]
async fn logs_good_readings_and_skips_the_rest() {
    let transport = MockTransport::new();
    script_standard_run(&transport);

    let settings = fast_settings();
    let driver = Keithley6485::initialize(transport.clone(), &settings)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = allocate_session_path(dir.path());
    assert_eq!(path.file_name().unwrap(), "001.txt");
    let writer = SessionWriter::create(path.clone()).unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    let stop = Arc::new(AtomicBool::new(false));
    let options = RunOptions {
        rejection_threshold_amps: settings.rejection_threshold_amps,
        max_iterations: Some(5),
    };

    let summary = acquisition::run(driver, writer, &options, stop, Some(tx))
        .await
        .unwrap();
    assert_eq!(summary.sample_count, 3);
    assert_eq!(summary.path, path);

    // One update per accepted sample, counting up; elapsed strictly grows.
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    let counts: Vec<usize> = updates.iter().map(|u| u.sample_count).collect();
    assert_eq!(counts, vec![1, 2, 3]);
    assert!(updates
        .windows(2)
        .all(|w| w[0].elapsed_seconds < w[1].elapsed_seconds));
    // The rejected 2.5 A reading never reached the statistics.
    assert!(updates.iter().all(|u| u.mean < 1e-8));

    // Three persisted lines under the header, time strictly increasing.
    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "Time(sec))\tAmps");
    assert_eq!(lines.len(), 4);
    let times: Vec<f64> = lines[1..]
        .iter()
        .map(|line| line.split('\t').next().unwrap().parse().unwrap())
        .collect();
    assert!(times.windows(2).all(|w| w[0] < w[1]));
    let amps: Vec<&str> = lines[1..]
        .iter()
        .map(|line| line.split('\t').nth(1).unwrap())
        .collect();
    assert_eq!(amps, vec!["1.00000e-09", "1.10000e-09", "9.00000e-10"]);
}

#[tokio::test]
async fn persisted_output_is_the_same_without_a_display_sink() {
    let transport = MockTransport::new();
    script_standard_run(&transport);

    let settings = fast_settings();
    let driver = Keithley6485::initialize(transport.clone(), &settings)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = allocate_session_path(dir.path());
    let writer = SessionWriter::create(path.clone()).unwrap();

    let options = RunOptions {
        rejection_threshold_amps: settings.rejection_threshold_amps,
        max_iterations: Some(5),
    };
    let summary = acquisition::run(
        driver,
        writer,
        &options,
        Arc::new(AtomicBool::new(false)),
        None,
    )
    .await
    .unwrap();

    assert_eq!(summary.sample_count, 3);
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 4);
}

#[tokio::test]
async fn a_raised_stop_flag_ends_the_run_before_the_first_request() {
    let transport = MockTransport::new();
    transport.push_response("KEITHLEY 6485\r");

    let settings = fast_settings();
    let driver = Keithley6485::initialize(transport.clone(), &settings)
        .await
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = allocate_session_path(dir.path());
    let writer = SessionWriter::create(path.clone()).unwrap();

    let stop = Arc::new(AtomicBool::new(true));
    let options = RunOptions {
        rejection_threshold_amps: settings.rejection_threshold_amps,
        max_iterations: None,
    };
    let summary = acquisition::run(driver, writer, &options, stop, None)
        .await
        .unwrap();

    assert_eq!(summary.sample_count, 0);
    // Just the header; the file is still flushed and closed cleanly.
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "Time(sec))\tAmps\n");
    // No measurement request went out after the flag was up.
    assert!(!transport.written_commands().contains(&"READ?\r".to_string()));
}
