//! Plain-text dump of solver iterates.
//!
//! One iterate per line, parameters separated by single spaces and printed with
//! round-trip precision. Lines starting with `#` are comments.

use super::{IoError, IoResult};
use crate::observers::TrajectoryPoint;
use nalgebra::DVector;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

/// Write the parameters of every point in `points` to `path`.
pub fn write_trajectory<P: AsRef<Path>>(path: P, points: &[TrajectoryPoint]) -> IoResult<()> {
    let path_ref = path.as_ref();
    let file = File::create(path_ref).map_err(|e| {
        IoError::FileCreationFailed {
            path: path_ref.display().to_string(),
            reason: e.to_string(),
        }
        .log()
    })?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "# {} iterates", points.len())
        .map_err(|e| IoError::Io(e).log_with_source("Failed to write trajectory header"))?;
    for point in points {
        let line = point
            .parameters
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{line}").map_err(|e| {
            IoError::Io(e).log_with_source(format!("Failed to write iterate {}", point.iteration))
        })?;
    }
    writer
        .flush()
        .map_err(|e| IoError::Io(e).log_with_source("Failed to flush trajectory"))?;
    Ok(())
}

/// Read a file written by [`write_trajectory`].
pub fn read_trajectory<P: AsRef<Path>>(path: P) -> IoResult<Vec<DVector<f64>>> {
    let path_ref = path.as_ref();
    let contents = fs::read_to_string(path_ref)
        .map_err(|e| IoError::Io(e).log_with_source(format!("Failed to read {:?}", path_ref)))?;

    let mut iterates = Vec::new();
    let mut dimension = None;
    for (index, line) in contents.lines().enumerate() {
        let line_num = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let values = line
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    IoError::InvalidNumber {
                        line: line_num,
                        value: token.to_string(),
                    }
                    .log()
                })
            })
            .collect::<IoResult<Vec<f64>>>()?;

        match dimension {
            None => dimension = Some(values.len()),
            Some(n) if n != values.len() => {
                return Err(IoError::Parse {
                    line: line_num,
                    message: format!("expected {} values, found {}", n, values.len()),
                }
                .log());
            }
            Some(_) => {}
        }
        iterates.push(DVector::from_vec(values));
    }
    Ok(iterates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    #[test]
    fn test_trajectory_file_layout() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("trajectory.txt");
        let points = vec![
            TrajectoryPoint {
                iteration: 1,
                parameters: dvector![0.5, -1.25],
                metrics: None,
            },
            TrajectoryPoint {
                iteration: 2,
                parameters: dvector![1.0 / 3.0, 0.0],
                metrics: None,
            },
        ];
        write_trajectory(&path, &points)?;

        let contents = fs::read_to_string(&path)?;
        assert_eq!(contents.lines().nth(1), Some("0.5 -1.25"));

        let iterates = read_trajectory(&path)?;
        assert_eq!(iterates.len(), 2);
        assert_eq!(iterates[1][0], 1.0 / 3.0);
        Ok(())
    }

    #[test]
    fn test_read_rejects_ragged_rows() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("ragged.txt");
        fs::write(&path, "1 2\n3\n")?;
        assert!(matches!(
            read_trajectory(&path),
            Err(IoError::Parse { line: 2, .. })
        ));

        fs::write(&path, "1 x\n")?;
        assert!(matches!(
            read_trajectory(&path),
            Err(IoError::InvalidNumber { line: 1, .. })
        ));
        Ok(())
    }
}
