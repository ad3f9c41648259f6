use rig_core::Measurement;
use rig_io::{encode_record, header_line};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// CSV log of accepted records, one row per record under a header row.
pub struct CsvLog {
    path: PathBuf,
    writer: BufWriter<File>,
    rows: u64,
}

impl CsvLog {
    /// Create (or truncate) `path` and write the header row.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", header_line())?;
        writer.flush()?;
        info!(path = %path.display(), "CSV log created");
        Ok(Self {
            path: path.to_path_buf(),
            writer,
            rows: 0,
        })
    }

    /// Append one row and flush, so the file is complete up to the last
    /// record if the process is killed.
    pub fn append(&mut self, record: &Measurement) -> io::Result<()> {
        writeln!(self.writer, "{}", encode_record(record))?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn close(mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        info!(path = %self.path.display(), rows = self.rows, "CSV log closed");
        Ok(())
    }
}
