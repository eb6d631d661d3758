// estport_core/src/io/mod.rs

//! Whitespace-separated text tables: observation input and estimation output.

use std::fmt::Write as _;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::info;

use crate::error::{PortError, PortResult};
use crate::types::{ObservationRecord, ResultRecord};

pub const DEFAULT_PRECISION: usize = 6;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PortError + '_ {
    move |source| PortError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Parses a table of floats. Blank lines and lines starting with `#` are
/// skipped; every data line must have as many columns as the first one.
pub fn parse_table(text: &str, source: &Path) -> PortResult<Vec<Vec<f64>>> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let row = parse_row(trimmed, source, index + 1)?;
        if let Some(first) = rows.first() {
            if row.len() != first.len() {
                return Err(PortError::ColumnCount {
                    path: source.to_path_buf(),
                    line: index + 1,
                    expected: first.len(),
                    found: row.len(),
                });
            }
        }
        rows.push(row);
    }
    Ok(rows)
}

fn parse_row(line: &str, source: &Path, line_number: usize) -> PortResult<Vec<f64>> {
    line.split_whitespace()
        .enumerate()
        .map(|(column, field)| {
            field.parse::<f64>().map_err(|_| PortError::MalformedField {
                path: source.to_path_buf(),
                line: line_number,
                column: column + 1,
                field: field.to_string(),
            })
        })
        .collect()
}

/// Reads an observation table. With `expected_rows` set, a table with any
/// other number of data rows is rejected.
pub fn read_observation_table(
    path: &Path,
    expected_rows: Option<usize>,
) -> PortResult<Vec<Vec<f64>>> {
    let text = fs::read_to_string(path).map_err(io_error(path))?;
    let rows = parse_table(&text, path)?;
    if let Some(expected) = expected_rows {
        if rows.len() != expected {
            return Err(PortError::RowCount {
                path: path.to_path_buf(),
                expected,
                found: rows.len(),
            });
        }
    }
    info!(path = %path.display(), rows = rows.len(), "Loaded observation table");
    Ok(rows)
}

/// One output line: the timestamp followed by the state, space separated.
pub fn format_result_row(record: &ResultRecord, precision: usize) -> String {
    let mut line = format!("{:.precision$}", record.timestamp);
    for value in &record.state {
        // Writing to a String cannot fail.
        let _ = write!(line, " {value:.precision$}");
    }
    line
}

/// Parses a line written by [`format_result_row`].
pub fn parse_result_row(
    line: &str,
    source: &Path,
    line_number: usize,
) -> PortResult<ResultRecord> {
    let mut values = parse_row(line.trim(), source, line_number)?;
    if values.is_empty() {
        return Err(PortError::ColumnCount {
            path: source.to_path_buf(),
            line: line_number,
            expected: 1,
            found: 0,
        });
    }
    let state = values.split_off(1);
    Ok(ResultRecord {
        timestamp: values[0],
        state,
    })
}

/// `EstimationResult_<YYYYmmddHHMMSS>.txt`
pub fn result_file_name(at: DateTime<Local>) -> String {
    format!("EstimationResult_{}.txt", at.format("%Y%m%d%H%M%S"))
}

/// Writes the result table into `directory` (created if missing) under a
/// timestamped name and returns the path written.
pub fn write_result_table(
    directory: &Path,
    records: &[ResultRecord],
    precision: usize,
) -> PortResult<PathBuf> {
    fs::create_dir_all(directory).map_err(io_error(directory))?;
    let path = directory.join(result_file_name(Local::now()));
    let lines = records.iter().map(|record| format_result_row(record, precision));
    write_lines(&path, lines)?;
    info!(path = %path.display(), rows = records.len(), "Wrote estimation results");
    Ok(path)
}

/// Writes observation records in the input table layout (time column first).
pub fn write_observation_table(
    path: &Path,
    records: &[ObservationRecord],
    precision: usize,
) -> PortResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let lines = records.iter().map(|record| {
        let mut line = format!("{:.precision$}", record.timestamp);
        for value in &record.observation {
            let _ = write!(line, " {value:.precision$}");
        }
        line
    });
    write_lines(path, lines)
}

fn write_lines(path: &Path, lines: impl Iterator<Item = String>) -> PortResult<()> {
    let file = fs::File::create(path).map_err(io_error(path))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{line}").map_err(io_error(path))?;
    }
    writer.flush().map_err(io_error(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rows_and_skips_blank_lines() {
        let text = "0.000 1.0 1.0\n\n# comment\n0.005 1.005 1.0\n";
        let rows = parse_table(text, Path::new("trace.txt")).unwrap();
        assert_eq!(rows, vec![vec![0.0, 1.0, 1.0], vec![0.005, 1.005, 1.0]]);
    }

    #[test]
    fn malformed_field_reports_line_and_column() {
        let text = "0.000 1.0 1.0\n0.005 x 1.0\n";
        let err = parse_table(text, Path::new("trace.txt")).unwrap_err();
        match err {
            PortError::MalformedField {
                line, column, field, ..
            } => {
                assert_eq!((line, column), (2, 2));
                assert_eq!(field, "x");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn ragged_table_is_rejected() {
        let err = parse_table("1 2 3\n4 5\n", Path::new("t")).unwrap_err();
        assert!(matches!(
            err,
            PortError::ColumnCount { line: 2, expected: 3, found: 2, .. }
        ));
    }

    #[test]
    fn result_row_uses_fixed_precision() {
        let record = ResultRecord {
            timestamp: 0.005,
            state: vec![1.0, -0.25, 2.0 / 3.0],
        };
        assert_eq!(format_result_row(&record, 6), "0.005000 1.000000 -0.250000 0.666667");
        assert_eq!(format_result_row(&record, 2), "0.01 1.00 -0.25 0.67");
    }

    #[test]
    fn result_row_reads_back_within_precision() {
        let record = ResultRecord {
            timestamp: 0.010,
            state: vec![1.0123456789, 0.5, -3.25, 1e-7],
        };
        let line = format_result_row(&record, 6);
        let parsed = parse_result_row(&line, Path::new("out.txt"), 1).unwrap();
        assert_eq!(parsed.state.len(), 4);
        approx::assert_abs_diff_eq!(parsed.timestamp, record.timestamp, epsilon = 5e-7);
        for (a, b) in parsed.state.iter().zip(&record.state) {
            approx::assert_abs_diff_eq!(*a, *b, epsilon = 5e-7);
        }
    }

    #[test]
    fn result_file_name_embeds_local_time() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(result_file_name(at), "EstimationResult_20240309070501.txt");
    }

    #[test]
    fn row_count_is_checked_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.txt");
        fs::write(&path, "0 1 1\n0.005 1 1\n").unwrap();
        assert_eq!(read_observation_table(&path, Some(2)).unwrap().len(), 2);
        let err = read_observation_table(&path, Some(1000)).unwrap_err();
        assert!(matches!(err, PortError::RowCount { expected: 1000, found: 2, .. }));
    }

    #[test]
    fn missing_input_is_an_io_error() {
        let err = read_observation_table(Path::new("no/such/trace.txt"), None).unwrap_err();
        assert!(matches!(err, PortError::Io { .. }));
    }

    #[test]
    fn writer_creates_directory_and_returns_path() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("EstimationResult");
        let records = vec![
            ResultRecord {
                timestamp: 0.0,
                state: vec![1.0, 0.0],
            },
            ResultRecord {
                timestamp: 0.005,
                state: vec![1.0, 0.1],
            },
        ];
        let path = write_result_table(&out, &records, 6).unwrap();
        assert!(path.starts_with(&out));
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "0.000000 1.000000 0.000000\n0.005000 1.000000 0.100000\n");
    }
}
