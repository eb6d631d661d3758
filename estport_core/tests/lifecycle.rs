// estport_core/tests/lifecycle.rs

use std::fs;
use std::path::Path;

use approx::assert_abs_diff_eq;
use estport_core::io::{parse_result_row, read_observation_table, write_result_table};
use estport_core::models::constant_velocity::{
    PORT_INTRODUCTION, PORT_NAME, TIMESTAMPED_MODEL, VALUE_ONLY_MODEL,
};
use estport_core::models::binding_by_name;
use estport_core::prelude::*;

const TRACE: &str = "\
0.000 1.000 1.0
0.005 1.005 1.0
0.010 1.010 1.0
";

fn port(model: &str) -> NativePort {
    NativePort::new(binding_by_name(model).unwrap())
}

#[test]
fn three_row_trace_produces_three_results() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("trace.txt");
    fs::write(&input, TRACE).unwrap();

    let rows = read_observation_table(&input, Some(3)).unwrap();
    let mut port = port(TIMESTAMPED_MODEL);
    let results = ExecutionHarness::default().run_rows(&mut port, &rows).unwrap();

    assert_eq!(results.len(), 3);
    let times: Vec<f64> = results.iter().map(|r| r.timestamp).collect();
    assert_eq!(times, vec![0.000, 0.005, 0.010]);
    assert!(results.iter().all(|r| r.state.len() == 4));

    let path = write_result_table(&dir.path().join("EstimationResult"), &results, 6).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("0.005000 "));
    assert_eq!(lines[0].split_whitespace().count(), 5);

    for (line_number, (line, result)) in lines.iter().zip(&results).enumerate() {
        let parsed = parse_result_row(line, &path, line_number + 1).unwrap();
        assert_abs_diff_eq!(parsed.timestamp, result.timestamp, epsilon = 5e-7);
        for (a, b) in parsed.state.iter().zip(&result.state) {
            assert_abs_diff_eq!(*a, *b, epsilon = 5e-7);
        }
    }
}

#[test]
fn identical_runs_are_bit_identical() {
    let rows = estport_core::io::parse_table(TRACE, Path::new("trace")).unwrap();
    let harness = ExecutionHarness::default();
    let first = harness.run_rows(&mut port(TIMESTAMPED_MODEL), &rows).unwrap();
    let second = harness.run_rows(&mut port(TIMESTAMPED_MODEL), &rows).unwrap();
    assert_eq!(first, second);
}

#[test]
fn descriptors_of_one_port_do_not_share_state() {
    let mut port = port(VALUE_ONLY_MODEL);
    let mut a = port.new_descriptor();
    let mut b = port.new_descriptor();
    port.initialize(&mut a).unwrap();
    port.initialize(&mut b).unwrap();

    port.step(&mut a, &[5.0, -5.0], 0.0).unwrap();
    let b_state = port.step(&mut b, &[1.0, 1.0], 0.0).unwrap();
    assert_eq!(b_state.as_slice(), &[1.0, 0.0, 1.0, 0.0]);
    assert_eq!(a.snapshot().unwrap().steps, 1);
    assert_eq!(b.snapshot().unwrap().steps, 1);

    port.terminate(&mut a).unwrap();
    assert_eq!(a.phase(), PortPhase::Terminated);
    assert_eq!(b.phase(), PortPhase::Ready);
    port.terminate(&mut b).unwrap();
}

#[test]
fn snapshot_reflects_the_reference_configuration() {
    let mut port = port(VALUE_ONLY_MODEL);
    let mut descriptor = port.new_descriptor();
    port.initialize(&mut descriptor).unwrap();
    let snapshot = descriptor.snapshot().unwrap();

    assert_eq!(snapshot.name, PORT_NAME);
    assert_eq!(snapshot.introduction, PORT_INTRODUCTION);
    assert_eq!(snapshot.config.nx, 4);
    assert_eq!(snapshot.config.nz, 2);
    assert_eq!(snapshot.config.predict_step, 2);
    assert_eq!(snapshot.config.interval, 0.005);
    assert_eq!(snapshot.estimated_state.as_slice(), &[1.0, 0.0, 1.0, 0.0]);
    assert_eq!(snapshot.matrices.h.shape(), (2, 4));
    assert_eq!(snapshot.matrices.b.shape(), (4, 1));
    assert_eq!(snapshot.int_par, vec![1]);
    assert_eq!(snapshot.double_par, vec![1.0]);
    port.terminate(&mut descriptor).unwrap();
}

#[test]
fn steady_observations_converge_on_the_trace() {
    // Targets moving at unit speed along x: z_x = 1 + t.
    let rows: Vec<Vec<f64>> = (0..400)
        .map(|k| {
            let t = k as f64 * 0.005;
            vec![t, 1.0 + t, 1.0]
        })
        .collect();
    let mut port = port(TIMESTAMPED_MODEL);
    let results = ExecutionHarness::default().run_rows(&mut port, &rows).unwrap();
    let last = results.last().unwrap();
    let t = last.timestamp;
    assert_abs_diff_eq!(last.state[0], 1.0 + t, epsilon = 0.05);
    assert_abs_diff_eq!(last.state[2], 1.0, epsilon = 0.05);
}

#[test]
fn decreasing_timestamps_abort_the_run() {
    let rows = vec![vec![0.010, 1.0, 1.0], vec![0.005, 1.0, 1.0]];
    let mut port = port(TIMESTAMPED_MODEL);
    let err = ExecutionHarness::default().run_rows(&mut port, &rows).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn config_built_linear_model_runs_end_to_end() {
    let config: RunConfig = toml::from_str(
        r#"
        [port]
        model = "Scalar"

        [model]
        name = "Scalar"
        nx = 1
        nz = 1
        interval = 0.1
        initial_state = [0.0]
        f = [1.0]
        h = [1.0]
        "#,
    )
    .unwrap();
    let mut port = config.native_port().unwrap();
    let rows = vec![vec![0.0, 2.0], vec![0.1, 2.0], vec![0.2, 2.0]];
    let results = ExecutionHarness::new(config.column_mapping())
        .run_rows(&mut port, &rows)
        .unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[2].state[0] > results[0].state[0]);
    assert!(results[2].state[0] < 2.0);
}
