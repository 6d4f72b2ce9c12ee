//! Optional per-session CSV log: `duration_s,reference_kmh,actual_kmh`.
//!
//! Records are appended without a header, one line per control tick.
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::WrapErr;

use crate::error::Result;
use crate::speed::Speed;

pub struct RunLog {
    path: PathBuf,
    writer: csv::Writer<File>,
    records: u64,
}

impl core::fmt::Debug for RunLog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RunLog")
            .field("path", &self.path)
            .field("records", &self.records)
            .finish()
    }
}

impl RunLog {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .wrap_err_with(|| format!("open run log {}", path.display()))?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(file);
        tracing::debug!(path = %path.display(), "run log opened");
        Ok(Self {
            path,
            writer,
            records: 0,
        })
    }

    pub fn record(&mut self, duration: Duration, speed: Speed) -> Result<()> {
        let secs = duration.as_secs().to_string();
        let reference = format!("{:.2}", speed.reference);
        let actual = format!("{:.2}", speed.actual);
        self.writer
            .write_record([secs.as_str(), reference.as_str(), actual.as_str()])
            .wrap_err("write run log record")?;
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close; returns the number of records written.
    pub fn close(mut self) -> Result<u64> {
        self.writer
            .flush()
            .wrap_err_with(|| format!("flush run log {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), records = self.records, "run log closed");
        Ok(self.records)
    }
}
