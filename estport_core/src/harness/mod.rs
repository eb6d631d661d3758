// estport_core/src/harness/mod.rs

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{PortError, PortResult};
use crate::port::EstimatorPort;
use crate::types::{Dimensions, ObservationRecord, ResultRecord};

/// Where the timestamp and the observation values sit in an input row.
///
/// `observation_len` left unset means "whatever `Nz` the port reports after
/// Initialize".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMapping {
    #[serde(default)]
    pub time_column: usize,
    #[serde(default = "default_observation_start")]
    pub observation_start: usize,
    #[serde(default)]
    pub observation_len: Option<usize>,
}

fn default_observation_start() -> usize {
    1
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            time_column: 0,
            observation_start: default_observation_start(),
            observation_len: None,
        }
    }
}

impl ColumnMapping {
    pub fn new(time_column: usize, observation_start: usize, observation_len: usize) -> Self {
        Self {
            time_column,
            observation_start,
            observation_len: Some(observation_len),
        }
    }

    /// The observation width for a port with `nz` observations. A configured
    /// width that disagrees with the port is a configuration error.
    pub fn width_for(&self, nz: usize) -> PortResult<usize> {
        match self.observation_len {
            Some(len) if len != nz => Err(PortError::dimension(
                "column mapping observation width",
                nz,
                len,
            )),
            _ => Ok(nz),
        }
    }

    /// Slices one row into a record. `line` is 1-based and only used in errors.
    pub fn extract(&self, row: &[f64], nz: usize, line: usize) -> PortResult<ObservationRecord> {
        let width = self.width_for(nz)?;
        let needed = (self.time_column + 1).max(self.observation_start + width);
        if row.len() < needed {
            return Err(PortError::dimension(format!("input row {line}"), needed, row.len()));
        }
        let observation = row[self.observation_start..self.observation_start + width].to_vec();
        Ok(ObservationRecord::new(row[self.time_column], observation))
    }
}

/// Drives one port over a whole sequence of observations.
///
/// Each run allocates its own descriptor, initializes it once, steps it once
/// per record in order and terminates it once. Results are all-or-nothing: on
/// the first failure the port is still terminated, the error is returned and
/// no partial results are handed back.
#[derive(Debug, Clone, Default)]
pub struct ExecutionHarness {
    mapping: ColumnMapping,
}

impl ExecutionHarness {
    pub fn new(mapping: ColumnMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Runs `port` over raw table rows, slicing them with the column mapping
    /// once the port has reported its `Nz`.
    pub fn run_rows<P: EstimatorPort>(
        &self,
        port: &mut P,
        rows: &[Vec<f64>],
    ) -> PortResult<Vec<ResultRecord>> {
        self.session(port, |port, descriptor, dims| {
            let records = rows
                .iter()
                .enumerate()
                .map(|(index, row)| self.mapping.extract(row, dims.nz, index + 1))
                .collect::<PortResult<Vec<_>>>()?;
            drive(port, descriptor, dims, &records)
        })
    }

    /// Runs `port` over records that are already split into time and observation.
    pub fn run<P: EstimatorPort>(
        &self,
        port: &mut P,
        records: &[ObservationRecord],
    ) -> PortResult<Vec<ResultRecord>> {
        self.session(port, |port, descriptor, dims| {
            self.mapping.width_for(dims.nz)?;
            drive(port, descriptor, dims, records)
        })
    }

    fn session<P, F>(&self, port: &mut P, body: F) -> PortResult<Vec<ResultRecord>>
    where
        P: EstimatorPort,
        F: FnOnce(&mut P, &mut P::Descriptor, Dimensions) -> PortResult<Vec<ResultRecord>>,
    {
        let mut descriptor = port.new_descriptor();
        port.initialize(&mut descriptor)?;

        let outcome = port
            .dimensions(&descriptor)
            .and_then(|dims| body(&mut *port, &mut descriptor, dims));

        match outcome {
            Ok(results) => {
                port.terminate(&mut descriptor)?;
                info!(
                    model = port.model_name(),
                    records = results.len(),
                    "Run finished"
                );
                Ok(results)
            }
            Err(err) => {
                if let Err(teardown) = port.terminate(&mut descriptor) {
                    warn!(error = %teardown, "Terminate after a failed run also failed");
                }
                error!(model = port.model_name(), error = %err, "Run aborted");
                Err(err)
            }
        }
    }
}

fn drive<P: EstimatorPort>(
    port: &mut P,
    descriptor: &mut P::Descriptor,
    dims: Dimensions,
    records: &[ObservationRecord],
) -> PortResult<Vec<ResultRecord>> {
    let mut results = Vec::new();
    results
        .try_reserve_exact(records.len())
        .map_err(|_| PortError::Allocation {
            what: "result records".into(),
            len: records.len(),
        })?;

    let mut previous: Option<f64> = None;
    for (index, record) in records.iter().enumerate() {
        if !record.timestamp.is_finite() || previous.is_some_and(|prev| record.timestamp < prev) {
            return Err(PortError::NonMonotonicTimestamp {
                timestamp: record.timestamp,
                previous: previous.unwrap_or(f64::NEG_INFINITY),
            });
        }
        if record.observation.len() != dims.nz {
            return Err(PortError::dimension(
                format!("observation record {}", index + 1),
                dims.nz,
                record.observation.len(),
            ));
        }

        let state = port.step(descriptor, &record.observation, record.timestamp)?;
        if state.len() != dims.nx {
            return Err(PortError::dimension("estimated state", dims.nx, state.len()));
        }
        results.push(ResultRecord {
            timestamp: record.timestamp,
            state: state.iter().copied().collect(),
        });
        previous = Some(record.timestamp);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::constant_velocity::ConstantVelocity2d;
    use crate::port::{NativePort, PortPhase};
    use crate::types::State;

    fn native() -> NativePort {
        NativePort::new(Box::new(ConstantVelocity2d::timestamped()))
    }

    /// Records every lifecycle call so the harness sequencing can be checked.
    #[derive(Debug, Default)]
    struct Recorder {
        calls: Vec<String>,
        fail_at_step: Option<usize>,
    }

    impl EstimatorPort for Recorder {
        type Descriptor = PortPhase;

        fn model_name(&self) -> &str {
            "recorder"
        }

        fn variant(&self) -> crate::port::PortVariant {
            crate::port::PortVariant::Timestamped
        }

        fn new_descriptor(&self) -> PortPhase {
            PortPhase::Uninitialized
        }

        fn initialize(&mut self, phase: &mut PortPhase) -> PortResult<()> {
            self.calls.push("initialize".into());
            *phase = PortPhase::Ready;
            Ok(())
        }

        fn step(
            &mut self,
            _: &mut PortPhase,
            observation: &[f64],
            timestamp: f64,
        ) -> PortResult<State> {
            let index = self.calls.iter().filter(|c| c.starts_with("step")).count();
            self.calls.push(format!("step@{timestamp}"));
            if self.fail_at_step == Some(index) {
                return Err(PortError::invalid_model("recorder", "forced failure"));
            }
            Ok(State::from_vec(vec![observation[0], timestamp]))
        }

        fn terminate(&mut self, phase: &mut PortPhase) -> PortResult<()> {
            self.calls.push("terminate".into());
            *phase = PortPhase::Terminated;
            Ok(())
        }

        fn dimensions(&self, _: &PortPhase) -> PortResult<Dimensions> {
            Ok(Dimensions { nx: 2, nz: 1 })
        }
    }

    fn records(times: &[f64]) -> Vec<ObservationRecord> {
        times.iter().map(|&t| ObservationRecord::new(t, vec![t * 10.0])).collect()
    }

    #[test]
    fn lifecycle_is_called_in_order() {
        let mut port = Recorder::default();
        let results = ExecutionHarness::default()
            .run(&mut port, &records(&[0.0, 0.5, 1.0]))
            .unwrap();
        assert_eq!(
            port.calls,
            ["initialize", "step@0", "step@0.5", "step@1", "terminate"]
        );
        assert_eq!(results.len(), 3);
        assert_eq!(results[1].timestamp, 0.5);
        assert_eq!(results[1].state, vec![5.0, 0.5]);
    }

    #[test]
    fn empty_input_still_initializes_and_terminates() {
        let mut port = Recorder::default();
        let results = ExecutionHarness::default().run(&mut port, &[]).unwrap();
        assert!(results.is_empty());
        assert_eq!(port.calls, ["initialize", "terminate"]);
    }

    #[test]
    fn failing_step_terminates_and_returns_no_results() {
        let mut port = Recorder {
            fail_at_step: Some(1),
            ..Recorder::default()
        };
        let err = ExecutionHarness::default()
            .run(&mut port, &records(&[0.0, 0.5, 1.0]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(port.calls.last().map(String::as_str), Some("terminate"));
        assert_eq!(port.calls.len(), 4);
    }

    #[test]
    fn decreasing_timestamp_aborts_the_run() {
        let mut port = Recorder::default();
        let err = ExecutionHarness::default()
            .run(&mut port, &records(&[0.0, 0.5, 0.25]))
            .unwrap_err();
        assert!(matches!(
            err,
            PortError::NonMonotonicTimestamp { timestamp, previous }
                if timestamp == 0.25 && previous == 0.5
        ));
        assert_eq!(port.calls.last().map(String::as_str), Some("terminate"));
    }

    #[test]
    fn equal_timestamps_are_accepted() {
        let mut port = Recorder::default();
        let results = ExecutionHarness::default()
            .run(&mut port, &records(&[0.5, 0.5]))
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn mapping_width_must_match_nz() {
        let mut port = native();
        let harness = ExecutionHarness::new(ColumnMapping::new(0, 1, 3));
        let err = harness.run_rows(&mut port, &[vec![0.0, 1.0, 1.0, 1.0]]).unwrap_err();
        assert!(matches!(
            err,
            PortError::DimensionMismatch { expected: 2, received: 3, .. }
        ));
    }

    #[test]
    fn rows_are_sliced_with_the_mapping() {
        let mapping = ColumnMapping::new(2, 0, 2);
        let record = mapping.extract(&[1.5, 2.5, 0.25], 2, 1).unwrap();
        assert_eq!(record.timestamp, 0.25);
        assert_eq!(record.observation, vec![1.5, 2.5]);

        let err = mapping.extract(&[1.5, 2.5], 2, 7).unwrap_err();
        assert!(err.to_string().contains("input row 7"));
    }

    #[test]
    fn native_port_runs_over_rows() {
        let rows = vec![
            vec![0.000, 1.000, 1.0],
            vec![0.005, 1.005, 1.0],
            vec![0.010, 1.010, 1.0],
        ];
        let mut port = native();
        let results = ExecutionHarness::default().run_rows(&mut port, &rows).unwrap();
        assert_eq!(results.len(), 3);
        for (result, row) in results.iter().zip(&rows) {
            assert_eq!(result.timestamp, row[0]);
            assert_eq!(result.state.len(), 4);
        }
    }
}
