use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::Path,
};

use anyhow::Context;
use log::{debug, info};

use crate::{
    args::ExportMethodType,
    metrics::{FeatureSnapshot, COLUMNS},
};

/// Append-only CSV sink for feature snapshots.
///
/// Rows are buffered and flushed every `flush_every` rows. The underlying
/// `csv::Writer` flushes once more when dropped, so buffered rows also reach
/// the destination when the writer goes out of scope on an error path.
pub struct OutputWriter<W: Write> {
    writer: csv::Writer<W>,
    write_header: bool,
    flush_every: usize,
    unflushed_rows: usize,
    rows_written: u64,
}

impl OutputWriter<Box<dyn Write + Send>> {
    /// Opens the sink for the selected export method.
    ///
    /// A CSV destination is opened in append mode. The header row is only
    /// written when the file is new or empty.
    pub fn new(
        export_type: &ExportMethodType,
        file_path: &Path,
        flush_every: usize,
    ) -> anyhow::Result<Self> {
        match export_type {
            ExportMethodType::Csv => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(file_path)
                    .with_context(|| format!("Failed to open {}", file_path.display()))?;
                let write_header = file
                    .metadata()
                    .with_context(|| format!("Failed to stat {}", file_path.display()))?
                    .len()
                    == 0;
                info!(
                    "Writing features to {} ({})",
                    file_path.display(),
                    if write_header { "new file" } else { "appending" }
                );
                Ok(Self::from_writer(Box::new(file), write_header, flush_every))
            }
            ExportMethodType::Print => Ok(Self::from_writer(
                Box::new(io::stdout()),
                true,
                flush_every,
            )),
        }
    }
}

impl<W: Write> OutputWriter<W> {
    pub fn from_writer(writer: W, write_header: bool, flush_every: usize) -> Self {
        OutputWriter {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer),
            write_header,
            flush_every: flush_every.max(1),
            unflushed_rows: 0,
            rows_written: 0,
        }
    }

    /// Appends one snapshot row, preceded by the header row on first use.
    pub fn write_snapshot(&mut self, snapshot: &FeatureSnapshot) -> anyhow::Result<()> {
        if self.write_header {
            self.writer
                .write_record(COLUMNS)
                .context("Failed to write header row")?;
            self.write_header = false;
        }
        self.writer
            .serialize(snapshot)
            .context("Failed to write feature row")?;
        self.rows_written += 1;
        self.unflushed_rows += 1;

        if self.unflushed_rows >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> anyhow::Result<()> {
        self.writer.flush().context("Failed to flush feature rows")?;
        self.unflushed_rows = 0;
        Ok(())
    }

    /// Flushes the writer and closes the output file
    /// Explicitly called at shutdown to ensure all data is written
    pub fn flush_and_close(&mut self) -> anyhow::Result<()> {
        debug!("Flushing output writer ({} rows written)", self.rows_written);
        self.flush()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }
}
