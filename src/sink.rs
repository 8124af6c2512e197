use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use log::{info, warn};

use crate::{
    error::{BenchError, Result},
    strategy::LockVariant,
};

pub const HEADER: &str = "lock_variant,thread_count,mean_time_ms";

/// One aggregated sweep point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultRow {
    pub variant: LockVariant,
    pub thread_count: usize,
    pub mean_time_ms: f64,
}

/// Destination for result rows, written in production order.
pub trait ResultSink {
    fn record(&mut self, row: &ResultRow) -> Result<()>;

    /// Flushes everything recorded so far.
    fn finish(&mut self) -> Result<()>;
}

/// Comma-separated rows behind a header line.
///
/// Every row is flushed as soon as it is written, so a run that aborts part
/// way still leaves its completed rows behind.
pub struct CsvSink<W: Write> {
    writer: W,
}

impl CsvSink<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| BenchError::Resource {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Writing results to {}", path.display());
        CsvSink::new(BufWriter::new(file)).map_err(|source| BenchError::Resource {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl<W: Write> CsvSink<W> {
    /// Writes the header immediately.
    pub fn new(mut writer: W) -> io::Result<Self> {
        writeln!(writer, "{HEADER}")?;
        writer.flush()?;
        Ok(Self { writer })
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }
}

impl<W: Write> ResultSink for CsvSink<W> {
    fn record(&mut self, row: &ResultRow) -> Result<()> {
        writeln!(
            self.writer,
            "{},{},{:.6}",
            row.variant, row.thread_count, row.mean_time_ms
        )?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> Drop for CsvSink<W> {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Failed to flush results on close: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn row(variant: LockVariant, thread_count: usize, mean_time_ms: f64) -> ResultRow {
        ResultRow {
            variant,
            thread_count,
            mean_time_ms,
        }
    }

    fn lines(sink: &CsvSink<Vec<u8>>) -> Vec<String> {
        String::from_utf8(sink.get_ref().clone())
            .unwrap()
            .lines()
            .map(str::to_owned)
            .collect()
    }

    #[test]
    fn test_header_only() {
        let sink = CsvSink::new(Vec::new()).unwrap();
        assert_eq!(lines(&sink), vec![HEADER]);
    }

    #[test]
    fn test_rows_in_write_order() {
        let mut sink = CsvSink::new(Vec::new()).unwrap();
        sink.record(&row(LockVariant::Mcs, 2, 1.5)).unwrap();
        sink.record(&row(LockVariant::Ticket, 16, 12.25)).unwrap();
        sink.record(&row(LockVariant::Ttas, 4, 0.1234567)).unwrap();
        sink.finish().unwrap();
        assert_eq!(
            lines(&sink),
            vec![
                HEADER,
                "MCS,2,1.500000",
                "Ticket,16,12.250000",
                "TTAS,4,0.123457",
            ]
        );
    }

    #[test]
    fn test_create_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("results.csv");
        match CsvSink::create(&path) {
            Err(BenchError::Resource { path: reported, .. }) => assert_eq!(reported, path),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("sink created in a missing directory"),
        }
    }

    #[test]
    fn test_rows_on_disk_before_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let mut sink = CsvSink::create(&path).unwrap();
        sink.record(&row(LockVariant::Cas, 8, 3.0)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, format!("{HEADER}\nCAS,8,3.000000\n"));

        drop(sink);
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }
}
