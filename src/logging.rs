//! JSON line-delimited logging for experiment records.
//!
//! Each call to [`JsonlLogger::log`] appends one compact JSON object per line,
//! so result files stay grep- and stream-friendly. Stdout progress printing is
//! deliberately not routed through here; it stays next to the training loops.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

/// Line-delimited JSON writer backed by a buffered file.
pub struct JsonlLogger {
    writer: BufWriter<File>,
}

impl JsonlLogger {
    /// Creates (or truncates) the log file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Serializes `record` as one JSON line and flushes it.
    pub fn log<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}
