//! Per-quantity output streams.
//!
//! A [`StreamSet`] is opened once per run, receives one row per stream per
//! sample, and is closed once. Dropping an unclosed set flushes what was
//! written, so rows already produced survive an early exit.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::format::{format_header, format_row};
use crate::{ResultsError, ResultsResult};

/// File name and column labels of one stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSpec {
    pub file_name: String,
    pub columns: Vec<String>,
}

impl StreamSpec {
    pub fn new(file_name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            file_name: file_name.into(),
            columns,
        }
    }
}

#[derive(Debug)]
struct Stream {
    spec: StreamSpec,
    writer: BufWriter<File>,
}

#[derive(Debug)]
pub struct StreamSet {
    dir: PathBuf,
    streams: Vec<Stream>,
    rows: usize,
}

impl StreamSet {
    /// Create every stream in `dir` and write its header.
    pub fn open(dir: &Path, specs: Vec<StreamSpec>) -> ResultsResult<Self> {
        let mut streams = Vec::with_capacity(specs.len());
        for spec in specs {
            let file = File::create(dir.join(&spec.file_name))?;
            let mut writer = BufWriter::new(file);
            writeln!(writer, "{}", format_header(&spec.columns))?;
            writer.flush()?;
            streams.push(Stream { spec, writer });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            streams,
            rows: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn specs(&self) -> impl Iterator<Item = &StreamSpec> {
        self.streams.iter().map(|s| &s.spec)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Number of samples written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Append one row to every stream; `values[i]` belongs to stream `i`.
    ///
    /// All rows are checked before any is written, and every stream is
    /// flushed before returning.
    pub fn write_sample(&mut self, time: f64, values: &[Vec<f64>]) -> ResultsResult<()> {
        if values.len() != self.streams.len() {
            return Err(ResultsError::RowLength {
                file: self.dir.display().to_string(),
                expected: self.streams.len(),
                actual: values.len(),
            });
        }
        for (stream, row) in self.streams.iter().zip(values) {
            if row.len() != stream.spec.columns.len() {
                return Err(ResultsError::RowLength {
                    file: stream.spec.file_name.clone(),
                    expected: stream.spec.columns.len(),
                    actual: row.len(),
                });
            }
        }
        for (stream, row) in self.streams.iter_mut().zip(values) {
            writeln!(stream.writer, "{}", format_row(time, row))?;
            stream.writer.flush()?;
        }
        self.rows += 1;
        Ok(())
    }

    /// Flush and release every stream.
    pub fn close(mut self) -> ResultsResult<()> {
        let mut first_error = None;
        for mut stream in self.streams.drain(..) {
            if let Err(e) = stream.writer.flush() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl Drop for StreamSet {
    fn drop(&mut self) {
        for stream in &mut self.streams {
            let _ = stream.writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::read_table;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rx_results_streams_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn writes_header_and_one_row_per_sample() {
        let dir = temp_dir("rows");
        let mut set = StreamSet::open(&dir, vec![
            StreamSpec::new("a.dat", vec!["x".to_string()]),
            StreamSpec::new("b.dat", vec!["y".to_string(), "z".to_string()]),
        ])
        .unwrap();
        for k in 1..=3 {
            let t = k as f64;
            set.write_sample(t, &[vec![t], vec![2.0 * t, 3.0 * t]]).unwrap();
        }
        assert_eq!(set.rows(), 3);
        set.close().unwrap();

        let b = read_table(&dir.join("b.dat")).unwrap();
        assert_eq!(b.columns, vec!["y", "z"]);
        assert_eq!(b.times(), vec![1.0, 2.0, 3.0]);
        assert_eq!(b.column("z").unwrap(), vec![3.0, 6.0, 9.0]);
        let text = std::fs::read_to_string(dir.join("a.dat")).unwrap();
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn wrong_row_width_writes_nothing() {
        let dir = temp_dir("width");
        let mut set = StreamSet::open(&dir, vec![
            StreamSpec::new("a.dat", vec!["x".to_string()]),
            StreamSpec::new("b.dat", vec!["y".to_string()]),
        ])
        .unwrap();
        let err = set.write_sample(1.0, &[vec![1.0], vec![1.0, 2.0]]).unwrap_err();
        assert!(matches!(err, ResultsError::RowLength { expected: 1, actual: 2, .. }));
        drop(set);
        let a = read_table(&dir.join("a.dat")).unwrap();
        assert!(a.rows.is_empty());
    }

    #[test]
    fn dropped_set_keeps_written_rows() {
        let dir = temp_dir("drop");
        {
            let mut set =
                StreamSet::open(&dir, vec![StreamSpec::new("a.dat", vec!["x".to_string()])]).unwrap();
            set.write_sample(0.5, &[vec![4.0]]).unwrap();
        }
        let a = read_table(&dir.join("a.dat")).unwrap();
        assert_eq!(a.rows, vec![vec![0.5, 4.0]]);
    }
}
